use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::input::OverflowPolicy;
use crate::speed::{Speed, SpeedPolicy};
use crate::{Result, SyntheError};

/// Env var naming the TOML config file.
pub const CONFIG_ENV: &str = "SYNTHE_CONFIG";
/// Config file looked up in the working directory when `SYNTHE_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "synthe.toml";

pub const DEFAULT_SPEED: i32 = 130;
pub const DEFAULT_SYNTHESIZE_SYMBOL: &str = "AquesTalk_Synthe_Utf8";
pub const DEFAULT_RELEASE_SYMBOL: &str = "AquesTalk_FreeWave";
pub const DEFAULT_COMMAND: &str = "espeak-ng";
/// Replaced by the speed value in command arguments.
pub const SPEED_PLACEHOLDER: &str = "{speed}";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Shared library exposing a synthesize/release symbol pair
    #[default]
    Library,
    /// External program reading text on stdin, writing the waveform on stdout
    Command,
}

impl FromStr for EngineKind {
    type Err = SyntheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "library" | "lib" => Ok(EngineKind::Library),
            "command" | "cmd" => Ok(EngineKind::Command),
            other => Err(SyntheError::Config(format!("unknown engine '{}'", other))),
        }
    }
}

/// Shared library backend settings
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LibrarySettings {
    pub path: Option<PathBuf>,
    pub synthesize_symbol: String,
    pub release_symbol: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            path: None,
            synthesize_symbol: DEFAULT_SYNTHESIZE_SYMBOL.to_string(),
            release_symbol: DEFAULT_RELEASE_SYMBOL.to_string(),
        }
    }
}

/// External program backend settings
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommandSettings {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_COMMAND),
            args: vec![
                "--stdin".to_string(),
                "--stdout".to_string(),
                "-s".to_string(),
                SPEED_PLACEHOLDER.to_string(),
            ],
        }
    }
}

impl CommandSettings {
    /// Arguments with every `{speed}` replaced.
    pub fn args_for(&self, speed: i32) -> Vec<String> {
        let speed = speed.to_string();
        self.args
            .iter()
            .map(|a| a.replace(SPEED_PLACEHOLDER, &speed))
            .collect()
    }
}

/// Resolved front-end configuration
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SyntheConfig {
    pub engine: EngineKind,
    /// Used when no speed argument is given
    pub default_speed: i32,
    pub speed_policy: SpeedPolicy,
    pub overflow_policy: OverflowPolicy,
    /// Selected entry of `voices`; overrides `library.path`
    pub voice: Option<String>,
    pub library: LibrarySettings,
    pub command: CommandSettings,
    /// Voice name -> shared library path
    pub voices: BTreeMap<String, PathBuf>,
}

impl Default for SyntheConfig {
    fn default() -> Self {
        let mut cfg = Self::builtin();
        cfg.apply_env_with(|key| std::env::var(key).ok());
        cfg
    }
}

impl SyntheConfig {
    /// Built-in defaults, no environment.
    pub fn builtin() -> Self {
        Self {
            engine: EngineKind::default(),
            default_speed: DEFAULT_SPEED,
            speed_policy: SpeedPolicy::default(),
            overflow_policy: OverflowPolicy::default(),
            voice: None,
            library: LibrarySettings::default(),
            command: CommandSettings::default(),
            voices: BTreeMap::new(),
        }
    }

    /// Overlay `SYNTHE_*` variables obtained through `lookup`. Unparseable
    /// values are logged and ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|s| !s.is_empty());

        if let Some(v) = get("SYNTHE_ENGINE") {
            match v.parse() {
                Ok(kind) => self.engine = kind,
                Err(e) => tracing::warn!(target: "config", error = %e, "Ignoring SYNTHE_ENGINE"),
            }
        }
        if let Some(v) = get("SYNTHE_LIBRARY") {
            self.library.path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SYNTHE_VOICE") {
            self.voice = Some(v);
        }
        // A new program does not inherit the default program's arguments.
        if let Some(v) = get("SYNTHE_COMMAND") {
            self.command.program = PathBuf::from(v);
            self.command.args.clear();
        }
        if let Some(v) = get("SYNTHE_COMMAND_ARGS") {
            self.command.args = v.split_whitespace().map(str::to_string).collect();
        }
        if let Some(v) = get("SYNTHE_DEFAULT_SPEED") {
            match v.trim().parse::<i32>() {
                Ok(speed) => self.default_speed = speed,
                Err(e) => {
                    tracing::warn!(target: "config", error = %e, "Ignoring SYNTHE_DEFAULT_SPEED")
                }
            }
        }
        if let Some(v) = get("SYNTHE_SPEED_POLICY") {
            match v.parse() {
                Ok(p) => self.speed_policy = p,
                Err(e) => tracing::warn!(target: "config", error = %e, "Ignoring SYNTHE_SPEED_POLICY"),
            }
        }
        if let Some(v) = get("SYNTHE_OVERFLOW_POLICY") {
            match v.parse() {
                Ok(p) => self.overflow_policy = p,
                Err(e) => {
                    tracing::warn!(target: "config", error = %e, "Ignoring SYNTHE_OVERFLOW_POLICY")
                }
            }
        }
    }

    /// Load configuration: defaults, then env, then a TOML file.
    ///
    /// With `path == None` the file comes from `SYNTHE_CONFIG` or
    /// `./synthe.toml`, and a missing file just means defaults. An explicit
    /// path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default = Self::default();
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var(CONFIG_ENV).ok().filter(|s| !s.is_empty()) {
                Some(p) => (PathBuf::from(p), true),
                None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(SyntheError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            tracing::debug!(target: "config", path = %path.display(), "No TOML config found; using defaults/env");
            return Ok(default);
        }

        let raw = fs::read_to_string(&path).map_err(|e| {
            SyntheError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::overlay_toml(default, &raw)
    }

    /// Apply TOML text on top of `base`.
    pub fn overlay_toml(base: Self, raw: &str) -> Result<Self> {
        let t: SyntheToml =
            toml::from_str(raw).map_err(|e| SyntheError::Config(e.to_string()))?;
        Ok(t.overlay(base))
    }

    /// Speed from the optional positional argument.
    pub fn resolve_speed(&self, arg: Option<&str>) -> Result<Speed> {
        match arg {
            Some(a) => self.speed_policy.parse(a),
            None => Ok(Speed(self.default_speed)),
        }
    }

    /// Library to load: the selected voice if any, else `library.path`.
    pub fn library_path(&self) -> Result<PathBuf> {
        if let Some(voice) = &self.voice {
            return self
                .voices
                .get(voice)
                .cloned()
                .ok_or_else(|| SyntheError::UnknownVoice(voice.clone()));
        }
        self.library.path.clone().ok_or_else(|| {
            SyntheError::Config(
                "no synthesis library configured; set SYNTHE_LIBRARY, [library].path or a voice"
                    .to_string(),
            )
        })
    }
}

// =========================
// TOML overlay definitions
// =========================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SyntheToml {
    pub engine: Option<EngineKind>,
    pub default_speed: Option<i32>,
    pub speed_policy: Option<SpeedPolicy>,
    pub overflow_policy: Option<OverflowPolicy>,
    pub voice: Option<String>,
    pub library: Option<LibraryToml>,
    pub command: Option<CommandToml>,
    pub voices: Option<BTreeMap<String, PathBuf>>,
}

impl SyntheToml {
    fn overlay(self, mut base: SyntheConfig) -> SyntheConfig {
        if let Some(x) = self.engine {
            base.engine = x;
        }
        if let Some(x) = self.default_speed {
            base.default_speed = x;
        }
        if let Some(x) = self.speed_policy {
            base.speed_policy = x;
        }
        if let Some(x) = self.overflow_policy {
            base.overflow_policy = x;
        }
        if let Some(x) = self.voice {
            base.voice = Some(x);
        }
        if let Some(l) = self.library {
            l.apply(&mut base.library);
        }
        if let Some(c) = self.command {
            c.apply(&mut base.command);
        }
        if let Some(v) = self.voices {
            base.voices.extend(v);
        }
        base
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LibraryToml {
    pub path: Option<PathBuf>,
    pub synthesize_symbol: Option<String>,
    pub release_symbol: Option<String>,
}
impl LibraryToml {
    fn apply(self, l: &mut LibrarySettings) {
        if let Some(x) = self.path {
            l.path = Some(x);
        }
        if let Some(x) = self.synthesize_symbol {
            l.synthesize_symbol = x;
        }
        if let Some(x) = self.release_symbol {
            l.release_symbol = x;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandToml {
    pub program: Option<PathBuf>,
    pub args: Option<Vec<String>>,
}
impl CommandToml {
    fn apply(self, c: &mut CommandSettings) {
        if let Some(x) = self.program {
            c.program = x;
        }
        if let Some(x) = self.args {
            c.args = x;
        }
    }
}
