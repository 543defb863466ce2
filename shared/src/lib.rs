pub mod block;
pub mod constants;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod rapier_world;
pub mod score;
pub mod session_log;
pub mod settings;
pub mod settlement;
pub mod spatial;
pub mod tag;
pub mod topology;
pub mod types;
pub mod zone;

pub use block::{BlockRegistry, GrabState, TrackedBlock};
pub use error::{GrabError, LogStoreError, SettingsError, ZoneError};
pub use host::{Clock, HostSession, SystemClock};
pub use pipeline::{Authority, DeferredRelease, ScorePipeline};
pub use rapier_world::{BlockQueryWorld, ColliderShapeDef, WorldStaticDef};
pub use score::{ScoreChannel, ScoreSubscription};
pub use session_log::{
    InteractionEvent, JsonFileLogStore, MemoryLogStore, SessionInstant, SessionLog,
    SessionLogStore,
};
pub use settings::StackingSettings;
pub use spatial::{Bounds, SpatialQuery, SweepHit};
pub use tag::LayerMask;
pub use topology::{TopologyEngine, TopologyReport};
pub use types::{ActorId, BlockId, BlockNotification, InteractionKind, Quat, Vec3, Vec3Data};
pub use zone::{StackingZone, ZoneEvent};
