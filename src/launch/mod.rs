// src/launch/mod.rs

//! Launch planning, spawning and supervision.
//!
//! - [`metadata`]: the per-command metadata archive.
//! - [`plan`]: turns a request into a [`LaunchPlan`].
//! - [`escape`]: escaping dialects for the argument blob and environment.
//! - [`backend`]: real and dry-run launch backends.
//! - [`process`]: PID files, liveness probing and signals.
//! - [`supervisor`]: start/stop/kill over the PID file.

pub mod backend;
pub mod escape;
pub mod metadata;
pub mod plan;
pub mod process;
pub mod supervisor;

pub use backend::{
    ArgumentPassing, DryRunBackend, LaunchBackend, LaunchOutcome, RealLaunchBackend, render_plan,
};
pub use escape::{escape_arg, escape_env};
pub use metadata::CommandMetadata;
pub use plan::{LaunchPlan, LaunchRequest, Planner};
pub use supervisor::{StopOutcome, Supervisor};
