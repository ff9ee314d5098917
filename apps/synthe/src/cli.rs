use std::path::PathBuf;

use clap::Parser;
use synthe_core::{EngineKind, OverflowPolicy, SpeedPolicy, SyntheConfig};

/// Read one line of text from stdin and write the synthesized waveform to stdout.
///
/// On synthesis failure prints `ERR:<code>` to stderr and exits with 255.
#[derive(Parser, Debug)]
#[command(name = "synthe", version)]
pub struct Cli {
    /// Speaking speed handed to the engine (e.g. 100)
    #[arg(allow_hyphen_values = true)]
    pub speed: Option<String>,

    /// Engine backend: library | command
    #[arg(long)]
    pub engine: Option<EngineKind>,

    /// Voice name from the config's [voices] table
    #[arg(long)]
    pub voice: Option<String>,

    /// Shared synthesis library to load (overrides any voice)
    #[arg(long)]
    pub library: Option<PathBuf>,

    /// Fail on a speed argument that is not a plain integer
    #[arg(long)]
    pub strict_speed: bool,

    /// Fail instead of truncating input lines longer than 1023 bytes
    #[arg(long)]
    pub reject_long_input: bool,

    /// Write the waveform to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TOML config file (default: $SYNTHE_CONFIG or ./synthe.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Flags win over config file and environment.
    pub fn apply(&self, cfg: &mut SyntheConfig) {
        if let Some(engine) = self.engine {
            cfg.engine = engine;
        }
        if let Some(voice) = &self.voice {
            cfg.voice = Some(voice.clone());
        }
        if let Some(library) = &self.library {
            cfg.library.path = Some(library.clone());
            cfg.voice = None;
        }
        if self.strict_speed {
            cfg.speed_policy = SpeedPolicy::Strict;
        }
        if self.reject_long_input {
            cfg.overflow_policy = OverflowPolicy::Reject;
        }
    }
}
