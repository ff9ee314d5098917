// Synthe Core Library
// Text-to-speech front-end: one line in, one waveform out

pub mod config;
pub mod engine;
pub mod frontend;
pub mod input;
pub mod speed;
pub mod telemetry;

// Export core types
pub use config::{CommandSettings, EngineKind, LibrarySettings, SyntheConfig};
pub use engine::{synthesize_scoped, EngineError, SynthesisEngine, Waveform};
pub use frontend::{FrontEnd, Outcome};
pub use input::{read_line_bounded, InputText, OverflowPolicy, MAX_INPUT_BYTES};
pub use speed::{Speed, SpeedPolicy};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyntheError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Input line exceeds {limit} bytes")]
    InputTooLong { limit: usize },

    #[error("Invalid speed argument: {0:?}")]
    InvalidSpeed(String),

    #[error("Unknown voice: {0}")]
    UnknownVoice(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
pub type Result<T> = std::result::Result<T, SyntheError>;
