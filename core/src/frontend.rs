//! Synthesis front end
//!
//! One invocation walks `AwaitingInput -> Synthesizing -> {Emitted, Failed}`,
//! or stops at `Empty` when the input stream ends or fails before any data. The engine
//! is only connected once there is text to synthesize.
//!
//! Output contract:
//! - Emitted: the waveform bytes, unmodified, on `out`
//! - Failed: exactly `ERR:<code>\n` on `err`
//! - Empty: nothing on either stream

use crate::engine::{synthesize_scoped, EngineError, SynthesisEngine};
use crate::input::{read_line_bounded, OverflowPolicy, MAX_INPUT_BYTES};
use crate::speed::Speed;
use crate::Result;
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

/// Terminal state of one invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Emitted { bytes: usize },
    Failed { code: i32 },
    Empty,
}

impl Outcome {
    /// Exit status for a synthesis failure (`-1` as a process exit byte).
    pub const FAILURE_EXIT: u8 = 255;

    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Emitted { .. } | Outcome::Empty => 0,
            Outcome::Failed { .. } => Self::FAILURE_EXIT,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }
}

#[derive(Clone, Debug)]
pub struct FrontEnd {
    limit: usize,
    overflow: OverflowPolicy,
}

impl Default for FrontEnd {
    fn default() -> Self {
        Self::new(OverflowPolicy::default())
    }
}

impl FrontEnd {
    pub fn new(overflow: OverflowPolicy) -> Self {
        Self {
            limit: MAX_INPUT_BYTES,
            overflow,
        }
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Run one invocation.
    ///
    /// `connect` is called at most once, after a line has been read. Errors
    /// other than a synthesis failure (I/O, engine setup, input policy) are
    /// returned to the caller; a synthesis failure is reported on `err` and
    /// becomes `Outcome::Failed`.
    pub fn run<R, F, E, W, X>(
        &self,
        input: &mut R,
        speed: Speed,
        connect: F,
        out: &mut W,
        err: &mut X,
    ) -> Result<Outcome>
    where
        R: BufRead,
        F: FnOnce() -> Result<E>,
        E: SynthesisEngine,
        W: Write,
        X: Write,
    {
        let text = match read_line_bounded(input, self.limit, self.overflow)? {
            Some(text) => text,
            None => return Ok(Outcome::Empty),
        };

        let engine = connect()?;
        debug!(
            target: "synthe",
            engine = %engine.name(),
            speed = speed.value(),
            bytes = text.len(),
            truncated = text.is_truncated(),
            "Synthesizing"
        );

        let outcome = match synthesize_scoped(&engine, text.as_bytes(), speed.value()) {
            Ok(wave) => {
                out.write_all(wave.bytes())?;
                out.flush()?;
                info!(target: "synthe", bytes = wave.len(), "Waveform emitted");
                Outcome::Emitted { bytes: wave.len() }
            }
            Err(EngineError::Synthesis { code }) => {
                warn!(target: "synthe", code, "Synthesis failed");
                writeln!(err, "ERR:{}", code)?;
                err.flush()?;
                Outcome::Failed { code }
            }
            Err(e) => return Err(e.into()),
        };
        Ok(outcome)
    }
}
