//! External-program engine
//!
//! Runs a local TTS program once per synthesis: the text goes to its stdin,
//! the waveform is whatever it writes to stdout. `{speed}` in any argument is
//! replaced by the speed value. Works with e.g.
//! - `espeak-ng --stdin --stdout -s {speed}` (the default)
//! - `piper -m voice.onnx --output_file /dev/stdout`
//!
//! A non-zero exit status becomes the synthesis result code (`-1` when the
//! program was killed by a signal). The program's stderr is captured and only
//! shows up in logs.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use synthe_core::config::CommandSettings;
use synthe_core::{EngineError, SynthesisEngine};
use tracing::{debug, info};

use crate::utils::find_on_path;

pub struct CommandEngine {
    program: PathBuf,
    settings: CommandSettings,
}

impl CommandEngine {
    /// Resolve the configured program on `PATH`.
    pub fn new(settings: &CommandSettings) -> Result<Self, EngineError> {
        let program = find_on_path(&settings.program).ok_or_else(|| {
            EngineError::Io(std::io::Error::new(
                ErrorKind::NotFound,
                format!("synthesis program not found: {}", settings.program.display()),
            ))
        })?;
        info!(target: "engine", bin = ?program, "Detected synthesis program");

        Ok(Self {
            program,
            settings: settings.clone(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl SynthesisEngine for CommandEngine {
    type Buffer = Vec<u8>;

    fn name(&self) -> String {
        format!("command:{}", self.program.display())
    }

    fn synthesize(&self, text: &[u8], speed: i32) -> Result<Vec<u8>, EngineError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.settings.args_for(speed));
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!(target: "engine", command = ?cmd, "Running synthesis program");
        let mut child = cmd.spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            // A program may exit without reading its input; its status decides.
            match stdin.write_all(text) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    debug!(target: "engine", "Synthesis program closed stdin early");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            debug!(
                target: "engine",
                code,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "Synthesis program failed"
            );
            return Err(EngineError::Synthesis { code });
        }

        Ok(output.stdout)
    }

    fn release(&self, buffer: Vec<u8>) {
        debug!(target: "engine", bytes = buffer.len(), "Dropping command waveform");
    }
}
