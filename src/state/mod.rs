//! State module for tracking job progress
//!
//! # Components
//!
//! - `JobState`: The pipeline stage a job is in (mapping, fetching, classifying, etc.)
//! - `JobTracker`: Enforces the allowed transitions between job states

mod job_state;

pub use job_state::{JobState, JobTracker};
