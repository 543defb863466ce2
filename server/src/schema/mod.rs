mod authoritative_score_table;
mod interaction_event_table;
mod participant_table;
mod session_table;
mod stacking_settings_table;
mod stacking_zone_table;
mod tracked_block_table;
mod world_static_table;

pub use authoritative_score_table::*;
pub use interaction_event_table::*;
pub use participant_table::*;
pub use session_table::*;
pub use stacking_settings_table::*;
pub use stacking_zone_table::*;
pub use tracked_block_table::*;
pub use world_static_table::*;
