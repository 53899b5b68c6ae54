//! Axis behavior model root.
//!
//! Timing and following-error prediction from per-axis profiles, learning
//! from observed moves, and per-machine profile storage.

pub mod learning;
pub mod profiles;
pub mod timing;

pub use learning::{merge_observation, record_observation};
pub use profiles::{AxisProfiles, JsonProfileStore, MemoryProfileStore, ProfileStore, StoreError};
pub use timing::{predict_following_error, predict_motion_time, try_predict_motion_time};
