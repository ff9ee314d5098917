//! Synthesis capability contract
//!
//! An engine exposes exactly two operations to the front end:
//! - `synthesize(text, speed)`: produce an engine-owned waveform buffer, or an
//!   opaque integer result code when nothing was produced
//! - `release(buffer)`: hand a buffer back to the engine
//!
//! Buffers never outlive the engine that produced them. [`synthesize_scoped`]
//! wraps the pair into a [`Waveform`] guard so that every successful call is
//! released exactly once and a failed call releases nothing.

use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine produced no buffer; `code` is its own error taxonomy.
    #[error("Synthesis failed with code {code}")]
    Synthesis { code: i32 },

    #[error("Text cannot be passed to the engine: {0}")]
    InvalidText(String),

    #[error("Engine IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Engine library error: {0}")]
    Library(String),
}

impl EngineError {
    /// Result code reported on the `ERR:<code>` line, if this is a synthesis failure.
    pub fn code(&self) -> Option<i32> {
        match self {
            EngineError::Synthesis { code } => Some(*code),
            _ => None,
        }
    }
}

pub trait SynthesisEngine {
    /// Engine-owned waveform bytes.
    type Buffer: AsRef<[u8]>;

    /// Human-readable engine name for logs.
    fn name(&self) -> String {
        "engine".to_string()
    }

    /// Single blocking synthesis call.
    fn synthesize(&self, text: &[u8], speed: i32) -> Result<Self::Buffer, EngineError>;

    /// Return a buffer obtained from `synthesize` to the engine.
    fn release(&self, buffer: Self::Buffer);
}

impl<E: SynthesisEngine + ?Sized> SynthesisEngine for &E {
    type Buffer = E::Buffer;

    fn name(&self) -> String {
        (**self).name()
    }

    fn synthesize(&self, text: &[u8], speed: i32) -> Result<Self::Buffer, EngineError> {
        (**self).synthesize(text, speed)
    }

    fn release(&self, buffer: Self::Buffer) {
        (**self).release(buffer)
    }
}

/// A waveform borrowed from an engine, released when dropped.
pub struct Waveform<'e, E: SynthesisEngine> {
    engine: &'e E,
    buffer: Option<E::Buffer>,
}

impl<'e, E: SynthesisEngine> Waveform<'e, E> {
    pub fn bytes(&self) -> &[u8] {
        match &self.buffer {
            Some(buffer) => buffer.as_ref(),
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'e, E: SynthesisEngine> Drop for Waveform<'e, E> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            debug!(target: "engine", engine = %self.engine.name(), "Releasing waveform");
            self.engine.release(buffer);
        }
    }
}

/// Call the engine and tie the resulting buffer to a release-on-drop guard.
pub fn synthesize_scoped<'e, E: SynthesisEngine>(
    engine: &'e E,
    text: &[u8],
    speed: i32,
) -> Result<Waveform<'e, E>, EngineError> {
    let buffer = engine.synthesize(text, speed)?;
    Ok(Waveform {
        engine,
        buffer: Some(buffer),
    })
}
