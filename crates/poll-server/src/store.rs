//! In-memory poll storage.
//!
//! `PollStore` owns every poll created during the process lifetime together
//! with the id sequence. Nothing is persisted; polls are never removed.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Separator used when options arrive as a single delimited string.
pub const OPTION_SEPARATOR: char = ',';

/// Minimum number of options a poll must carry.
pub const MIN_OPTIONS: usize = 2;

/// One selectable answer within a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollOption {
    pub text: String,
    pub votes: u64,
}

/// A question and its ordered options. Options are addressed by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Poll {
    pub question: String,
    pub options: Vec<PollOption>,
}

impl Poll {
    fn new(question: &str, options: Vec<String>) -> Self {
        Self {
            question: question.to_string(),
            options: options
                .into_iter()
                .map(|text| PollOption { text, votes: 0 })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
}

impl PollError {
    pub fn missing_question() -> Self {
        Self::InvalidInput("Missing question or options".to_string())
    }

    pub fn too_few_options() -> Self {
        Self::InvalidInput("At least two options required".to_string())
    }

    pub fn missing_vote_target() -> Self {
        Self::InvalidInput("pollId and optionIndex required".to_string())
    }

    /// Returned for an unknown poll and for an out-of-range option alike.
    pub fn vote_target_not_found() -> Self {
        Self::NotFound("Poll or option not found".to_string())
    }

    pub fn poll_not_found() -> Self {
        Self::NotFound("Poll not found".to_string())
    }
}

/// Operations every transport binding drives.
pub trait PollOps: Send + Sync {
    /// Stores a new poll and returns its freshly minted id.
    fn create(&self, question: &str, options: Vec<String>) -> Result<String, PollError>;

    /// Adds one vote to the option at `option_index` of poll `poll_id`.
    fn vote(&self, poll_id: &str, option_index: i64) -> Result<(), PollError>;

    /// Returns a snapshot of the poll.
    fn read(&self, poll_id: &str) -> Result<Poll, PollError>;

    fn poll_count(&self) -> usize;
}

#[derive(Debug)]
pub struct PollStore {
    polls: DashMap<String, Poll>,
    next_id: AtomicU64,
}

impl Default for PollStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PollStore {
    pub fn new() -> Self {
        Self {
            polls: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl PollOps for PollStore {
    fn create(&self, question: &str, options: Vec<String>) -> Result<String, PollError> {
        if question.is_empty() {
            return Err(PollError::missing_question());
        }

        if options.len() < MIN_OPTIONS {
            return Err(PollError::too_few_options());
        }

        // Ids are allocated only after validation; failed calls never consume one.
        let id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        self.polls.insert(id.clone(), Poll::new(question, options));

        Ok(id)
    }

    fn vote(&self, poll_id: &str, option_index: i64) -> Result<(), PollError> {
        if poll_id.is_empty() {
            return Err(PollError::missing_vote_target());
        }

        let mut poll = self
            .polls
            .get_mut(poll_id)
            .ok_or_else(PollError::vote_target_not_found)?;

        let index = usize::try_from(option_index).map_err(|_| PollError::vote_target_not_found())?;
        let option = poll
            .options
            .get_mut(index)
            .ok_or_else(PollError::vote_target_not_found)?;

        option.votes += 1;
        Ok(())
    }

    fn read(&self, poll_id: &str) -> Result<Poll, PollError> {
        self.polls
            .get(poll_id)
            .map(|poll| poll.value().clone())
            .ok_or_else(PollError::poll_not_found)
    }

    fn poll_count(&self) -> usize {
        self.polls.len()
    }
}

/// Splits a delimited option string, trimming entries and dropping empty ones.
pub fn parse_option_list(raw: &str) -> Vec<String> {
    raw.split(OPTION_SEPARATOR)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Maps a numeric index onto an option position.
///
/// Non-integral and non-finite values address no option and yield `None`.
pub fn option_position(value: f64) -> Option<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    if value < i64::MIN as f64 || value > i64::MAX as f64 {
        return None;
    }
    Some(value as i64)
}
