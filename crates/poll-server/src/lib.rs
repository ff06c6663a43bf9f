//! poll-server: in-memory poll service
//!
//! Create a poll with a question and options, vote for an option by position,
//! and read aggregated results. Polls live only as long as the process.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod store;

#[cfg(test)]
mod store_props;

pub use config::ServerConfig;
pub use server::PollServer;
pub use store::{Poll, PollError, PollOps, PollOption, PollStore};
