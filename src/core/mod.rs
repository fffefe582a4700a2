

pub mod config;
pub mod error;

pub use config::CoachConfig;
pub use error::{CoachError, Result};
