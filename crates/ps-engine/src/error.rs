use ps_source::SourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Descriptor error: {0}")]
    Descriptor(#[from] ps_core::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
