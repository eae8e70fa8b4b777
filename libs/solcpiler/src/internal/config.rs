use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use semver::Version;
use serde::Deserialize;
use serde_json::Value;

use super::errors::{Error, Result};
use super::path::{canonicalize_path, canonicalize_with_base, resolve_base_dir};
use super::settings::CompilerSettings;
use super::solc;

pub const DEFAULT_CONFIG_FILE: &str = "solcpiler.json";
pub const DEFAULT_INPUT: &str = "contracts/*.sol";
pub const DEFAULT_OUTPUT_DIR: &str = "build";

/// Finalised configuration for one build. Every directory is absolute.
#[derive(Clone, Debug)]
pub struct SolcpilerConfig {
  pub base_dir: PathBuf,
  pub inputs: Vec<String>,
  pub output_js_dir: PathBuf,
  pub output_sol_dir: PathBuf,
  pub artifacts_dir: PathBuf,
  pub solc_version: Option<Version>,
  pub solc_path: PathBuf,
  pub quiet: bool,
  pub verbose: bool,
  pub create_dirs: bool,
  pub constants: BTreeMap<String, String>,
  pub settings: CompilerSettings,
  pub toolchain_timeout: Option<Duration>,
}

impl SolcpilerConfig {
  /// Defaults rooted at `base_dir`.
  pub fn with_base_dir(base_dir: impl AsRef<Path>) -> Self {
    let base_dir = canonicalize_path(base_dir.as_ref());
    let output_dir = base_dir.join(DEFAULT_OUTPUT_DIR);
    SolcpilerConfig {
      inputs: vec![DEFAULT_INPUT.to_string()],
      output_js_dir: output_dir.clone(),
      output_sol_dir: output_dir.clone(),
      artifacts_dir: output_dir.join("artifacts"),
      solc_version: None,
      solc_path: PathBuf::from("solc"),
      quiet: false,
      verbose: false,
      create_dirs: true,
      constants: BTreeMap::new(),
      settings: CompilerSettings::default(),
      toolchain_timeout: None,
      base_dir,
    }
  }

  /// Build a configuration from layered overrides. The base directory comes from the options, or
  /// from the nearest `package.json` above the working directory.
  pub fn from_options(options: Option<SolcpilerConfigOptions>) -> Result<Self> {
    let options = options.unwrap_or_default();
    let base_dir = match &options.base_dir {
      Some(dir) => canonicalize_path(dir),
      None => {
        let cwd = std::env::current_dir().map_err(|err| Error::io(".", err))?;
        resolve_base_dir(&cwd)
      }
    };
    Self::with_base_dir(base_dir).merge_options(&options)
  }

  pub fn merge_options(&self, options: &SolcpilerConfigOptions) -> Result<Self> {
    let mut config = self.clone();
    let base = config.base_dir.clone();

    if let Some(inputs) = &options.input {
      let patterns = inputs.patterns();
      if patterns.is_empty() {
        return Err(Error::config("No input files"));
      }
      config.inputs = patterns;
    }
    let js_dir_changed = options.output_js_dir.is_some();
    if let Some(dir) = &options.output_js_dir {
      config.output_js_dir = canonicalize_with_base(&base, dir);
    }
    if let Some(dir) = &options.output_sol_dir {
      config.output_sol_dir = canonicalize_with_base(&base, dir);
    }
    match &options.artifacts_dir {
      Some(dir) => config.artifacts_dir = canonicalize_with_base(&base, dir),
      None if js_dir_changed => config.artifacts_dir = config.output_js_dir.join("artifacts"),
      None => {}
    }
    if let Some(version) = &options.solc_version {
      config.solc_version = Some(solc::parse_version(version)?);
    }
    if let Some(path) = &options.solc_path {
      config.solc_path = path.clone();
    }
    if let Some(quiet) = options.quiet {
      config.quiet = quiet;
    }
    if let Some(verbose) = options.verbose {
      config.verbose = verbose;
    }
    if let Some(create) = options.createdir {
      config.create_dirs = create;
    }
    for (name, value) in &options.extra {
      if value.is_object() || value.is_array() {
        tracing::debug!("ignoring unknown config key {name}");
        continue;
      }
      config.constants.insert(name.clone(), constant_text(value));
    }
    if let Some(constants) = &options.constants {
      for (name, value) in constants {
        config.constants.insert(name.clone(), constant_text(value));
      }
    }
    if options.settings.is_some() {
      config.settings = config.settings.overlay(options.settings.as_ref())?;
    }
    if let Some(seconds) = options.timeout_secs {
      config.toolchain_timeout = Some(Duration::from_secs(seconds));
    }

    Ok(config)
  }
}

/// One pattern or several.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum InputPatterns {
  One(String),
  Many(Vec<String>),
}

impl InputPatterns {
  pub fn patterns(&self) -> Vec<String> {
    match self {
      InputPatterns::One(pattern) => vec![pattern.clone()],
      InputPatterns::Many(patterns) => patterns.clone(),
    }
  }
}

/// Partial overrides as found in `solcpiler.json` or on the command line.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolcpilerConfigOptions {
  pub base_dir: Option<PathBuf>,
  pub input: Option<InputPatterns>,
  pub output_js_dir: Option<PathBuf>,
  pub output_sol_dir: Option<PathBuf>,
  pub artifacts_dir: Option<PathBuf>,
  pub solc_version: Option<String>,
  pub solc_path: Option<PathBuf>,
  pub quiet: Option<bool>,
  pub verbose: Option<bool>,
  pub createdir: Option<bool>,
  pub constants: Option<BTreeMap<String, Value>>,
  pub settings: Option<Value>,
  pub timeout_secs: Option<u64>,
  /// Unrecognised top-level keys. Older config files declare constants here.
  #[serde(flatten)]
  pub extra: BTreeMap<String, Value>,
}

impl SolcpilerConfigOptions {
  /// Read a JSON config file. A missing file yields `None`; an unreadable or invalid one is an error.
  pub fn from_file(path: &Path) -> Result<Option<Self>> {
    if !path.exists() {
      return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
    let options = serde_json::from_str(&contents).map_err(|err| {
      Error::config(format!("Invalid config file {}: {err}", path.display()))
    })?;
    Ok(Some(options))
  }

  /// Layer `overrides` on top of `self`; fields set in `overrides` win.
  pub fn merged_with(self, overrides: SolcpilerConfigOptions) -> Self {
    let constants = match (self.constants, overrides.constants) {
      (Some(mut base), Some(extra)) => {
        base.extend(extra);
        Some(base)
      }
      (base, extra) => extra.or(base),
    };
    let settings = match (self.settings, overrides.settings) {
      (Some(mut base), Some(extra)) => {
        super::settings::merge_settings_json(&mut base, extra);
        Some(base)
      }
      (base, extra) => extra.or(base),
    };

    let mut extra = self.extra;
    extra.extend(overrides.extra);

    SolcpilerConfigOptions {
      base_dir: overrides.base_dir.or(self.base_dir),
      input: overrides.input.or(self.input),
      output_js_dir: overrides.output_js_dir.or(self.output_js_dir),
      output_sol_dir: overrides.output_sol_dir.or(self.output_sol_dir),
      artifacts_dir: overrides.artifacts_dir.or(self.artifacts_dir),
      solc_version: overrides.solc_version.or(self.solc_version),
      solc_path: overrides.solc_path.or(self.solc_path),
      quiet: overrides.quiet.or(self.quiet),
      verbose: overrides.verbose.or(self.verbose),
      createdir: overrides.createdir.or(self.createdir),
      constants,
      settings,
      timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
      extra,
    }
  }
}

fn constant_text(value: &Value) -> String {
  match value {
    Value::String(text) => text.clone(),
    other => other.to_string(),
  }
}
