

use thiserror::Error;


#[derive(Error, Debug)]
pub enum CoachError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Admin transport error: {0}")]
    Transport(String),
}

impl From<config::ConfigError> for CoachError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}


pub type Result<T> = std::result::Result<T, CoachError>;
