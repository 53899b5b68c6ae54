//! EVO Twin Common Library
//!
//! Shared types, constants and configuration loading for the EVO machine-tool
//! digital twin.
//!
//! # Module Structure
//!
//! - [`consts`] - Numeric limits and documented defaults
//! - [`config`] - Configuration loading traits and types
//! - [`kinematics`] - Kinematic model, joints, poses
//! - [`profile`] - Axis behavior profiles and observations
//! - [`contact`] - Collision results, contacts, constraints
//! - [`warning`] - Per-step warnings and their bitflags summary
//! - [`command`] - Move commands, step results, learning events
//! - [`error`] - Construction-time errors
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use evo_twin_common::prelude::*;
//!
//! let pose = Pose::target([0.0, 0.0, 0.0], [0.0, 0.0, -1.0]);
//! assert_eq!(pose.tool_axis.z, -1.0);
//! ```

pub mod command;
pub mod config;
pub mod consts;
pub mod contact;
pub mod error;
pub mod kinematics;
pub mod prelude;
pub mod profile;
pub mod warning;
