// Job progress tracking for the Vidova dashboard backend

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod notifier;
pub mod poll;
pub mod registry;
pub mod report;
pub mod steps;
pub mod tracker;
pub mod view;

// Re-export commonly used types
pub use config::TrackerConfig;
pub use error::PollError;
pub use registry::{JobEntry, TrackerRegistry};
pub use report::ProgressReport;
pub use tracker::{ProgressTracker, TrackerDeps, TrackerState};
pub use view::ProgressView;
