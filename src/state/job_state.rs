/// Job state definitions for tracking pipeline progress
///
/// This module defines every state a job can be in and the transitions
/// allowed between them.
use crate::ScrollError;
use std::fmt;

/// Represents the current state of a job in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    // ===== Active States =====
    /// Job created, nothing has run yet
    Pending,

    /// Seeding the primary frontier from the mapping service
    Mapping,

    /// Fetching the primary frontier
    FetchPrimary,

    /// Deriving the secondary frontier
    Expand,

    /// Fetching the secondary frontier
    FetchSecondary,

    /// Classifying fetched pages
    Classify,

    /// Assembling and persisting the output documents
    Assemble,

    // ===== Terminal States =====
    /// Output persisted
    Done,

    /// A fatal error stopped the job
    Failed,

    /// The job was cancelled before finishing
    Cancelled,
}

impl JobState {
    /// The happy path, in order
    pub const STAGES: [JobState; 8] = [
        Self::Pending,
        Self::Mapping,
        Self::FetchPrimary,
        Self::Expand,
        Self::FetchSecondary,
        Self::Classify,
        Self::Assemble,
        Self::Done,
    ];

    /// Returns true if this is a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Returns true if a fatal error may move the job to `Failed` from here
    ///
    /// Only mapping and assembly fail fatally; every other stage degrades
    /// per item.
    pub fn can_fail(&self) -> bool {
        matches!(self, Self::Mapping | Self::Assemble)
    }

    /// The next state on the happy path, if any
    pub fn next(&self) -> Option<Self> {
        let position = Self::STAGES.iter().position(|s| s == self)?;
        Self::STAGES.get(position + 1).copied()
    }

    /// Returns true if moving from this state to `to` is allowed
    pub fn can_transition_to(&self, to: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match to {
            Self::Failed => self.can_fail(),
            Self::Cancelled => true,
            _ => self.next() == Some(to),
        }
    }

    /// Converts the job state to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Mapping => "mapping",
            Self::FetchPrimary => "fetch_primary",
            Self::Expand => "expand",
            Self::FetchSecondary => "fetch_secondary",
            Self::Classify => "classify",
            Self::Assemble => "assemble",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a job state from a database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "mapping" => Some(Self::Mapping),
            "fetch_primary" => Some(Self::FetchPrimary),
            "expand" => Some(Self::Expand),
            "fetch_secondary" => Some(Self::FetchSecondary),
            "classify" => Some(Self::Classify),
            "assemble" => Some(Self::Assemble),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Tracks one job's walk through the state machine
#[derive(Debug, Clone)]
pub struct JobTracker {
    history: Vec<JobState>,
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl JobTracker {
    /// Creates a tracker in the `Pending` state
    pub fn new() -> Self {
        Self {
            history: vec![JobState::Pending],
        }
    }

    /// Returns the current state
    pub fn state(&self) -> JobState {
        self.history
            .last()
            .copied()
            .unwrap_or(JobState::Pending)
    }

    /// Every state visited, oldest first
    pub fn history(&self) -> &[JobState] {
        &self.history
    }

    /// Moves to `to`, rejecting transitions the state machine does not allow
    pub fn transition(&mut self, to: JobState) -> Result<(), ScrollError> {
        let from = self.state();
        if !from.can_transition_to(to) {
            return Err(ScrollError::InvalidTransition { from, to });
        }
        tracing::debug!("Job state {} -> {}", from, to);
        self.history.push(to);
        Ok(())
    }
}
