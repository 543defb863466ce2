mod db_quat;
mod db_vec3;
mod interaction_kind;
mod shapes;

pub use db_quat::DbQuat;
pub use db_vec3::DbVec3;
pub use interaction_kind::DbInteractionKind;
pub use shapes::ColliderShape;
