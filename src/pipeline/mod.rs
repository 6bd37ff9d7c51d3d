//! Pipeline module: the application context and the job coordinator

mod context;
mod coordinator;

pub use context::{AppContext, Services};
pub use coordinator::{run_job, JobError, JobReport};
