use thiserror::Error;

#[derive(Error, Debug)]
pub enum TalentRaidError {
    #[error("Configuration error: {0}")]
    Config(String),
}
