//! The scene: object registry, broad phase and the public query API.

pub use self::object::{BoxSetting, ObjectOptions};
pub use self::scene::{
    DistanceResult, ObjectId, PairContacts, Scene, SceneError, SceneSettings,
};

pub use crate::query::BoundaryPolicy;

pub(crate) use self::broad_phase::BroadPhase;
pub(crate) use self::object::Object;
pub(crate) use self::pair::{AxisMask, Pair};

mod broad_phase;
mod object;
mod pair;
mod scene;
