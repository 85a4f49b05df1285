#![forbid(unsafe_code)]

pub mod choreo;
pub mod core;
pub mod ease;
pub mod error;
pub mod load;
pub mod retry;
pub mod timeline;

pub use choreo::{COMPLETION_EPSILON, ChoreoHooks, Choreographer, Phase, StageBoundaries};
pub use core::{CameraRig, Lerp, Vec3, ViewportClass, ViewportProfile};
pub use ease::Ease;
pub use error::{StagecueError, StagecueResult};
pub use load::{
    AssetAttemptState, AssetHandle, AssetKind, AssetLoader, AssetOutcome, AssetRequest,
    LoadCoordinator, LoadStatus, SceneReadiness,
};
pub use retry::{RetryExhausted, RetryPolicy, run_with_retry};
pub use timeline::{Keyframe, Timeline, TimelineBuilder};
