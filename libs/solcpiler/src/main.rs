//! `solcpiler` command line: compiles the Solidity sources of the current project and writes
//! export modules, flattened sources and coverage artifacts.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use solcpiler::{
  InputPatterns, Result, Solcpiler, SolcpilerConfig, SolcpilerConfigOptions, DEFAULT_CONFIG_FILE,
};
use tracing::Level;

/// Incremental Solidity build orchestrator.
#[derive(Parser, Debug)]
#[command(name = "solcpiler", version, about = "Incremental Solidity builds")]
struct Cli {
  /// Config file. Default: ./solcpiler.json
  #[arg(short = 'c', long)]
  config_file: Option<PathBuf>,

  /// Output directory for the generated js modules. Default: ./build
  #[arg(long)]
  output_js_dir: Option<PathBuf>,

  /// Output directory for the flattened solidity files. Default: ./build
  #[arg(long)]
  output_sol_dir: Option<PathBuf>,

  /// Solidity version. Example: v0.4.12+commit.194ff033
  #[arg(long)]
  solc_version: Option<String>,

  /// Input files to compile. Default: ./contracts/*.sol
  #[arg(short, long, num_args = 1..)]
  input: Vec<String>,

  /// Create output directories when missing (the default).
  #[arg(long, overrides_with = "no_createdir")]
  createdir: bool,

  /// Fail instead of creating missing output directories.
  #[arg(long)]
  no_createdir: bool,

  /// Only print warnings and errors.
  #[arg(short, long, conflicts_with = "verbose")]
  quiet: bool,

  /// Print every file loaded and import resolved.
  #[arg(short, long)]
  verbose: bool,
}

impl Cli {
  fn overrides(&self) -> SolcpilerConfigOptions {
    let createdir = match (self.createdir, self.no_createdir) {
      (_, true) => Some(false),
      (true, false) => Some(true),
      (false, false) => None,
    };
    SolcpilerConfigOptions {
      input: (!self.input.is_empty()).then(|| InputPatterns::Many(self.input.clone())),
      output_js_dir: self.output_js_dir.clone(),
      output_sol_dir: self.output_sol_dir.clone(),
      solc_version: self.solc_version.clone(),
      quiet: self.quiet.then_some(true),
      verbose: self.verbose.then_some(true),
      createdir,
      ..Default::default()
    }
  }
}

fn init_tracing(config: &SolcpilerConfig) {
  let level = if config.quiet {
    Level::WARN
  } else if config.verbose {
    Level::DEBUG
  } else {
    Level::INFO
  };
  tracing_subscriber::fmt()
    .with_max_level(level)
    .with_target(false)
    .without_time()
    .with_writer(std::io::stderr)
    .init();
}

async fn run(cli: Cli) -> Result<()> {
  let config_file = cli
    .config_file
    .clone()
    .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
  let file_options = SolcpilerConfigOptions::from_file(&config_file)?.unwrap_or_default();
  let options = file_options.merged_with(cli.overrides());
  let config = SolcpilerConfig::from_options(Some(options))?;
  init_tracing(&config);

  let engine = Solcpiler::from_config(config).await?;
  let report = engine.compile().await?;
  tracing::debug!(
    "compiled {} and skipped {} files",
    report.compiled.len(),
    report.skipped.len()
  );
  Ok(())
}

fn main() {
  let cli = Cli::parse();
  let runtime = match tokio::runtime::Builder::new_multi_thread()
    .enable_all()
    .build()
  {
    Ok(runtime) => runtime,
    Err(err) => {
      eprintln!("ERROR: failed to start runtime: {err}");
      process::exit(1);
    }
  };

  if let Err(err) = runtime.block_on(run(cli)) {
    eprintln!("ERROR: {err}");
    process::exit(1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn no_flags_leave_everything_to_the_config_file() {
    let cli = Cli::parse_from(["solcpiler"]);
    let overrides = cli.overrides();
    assert!(overrides.input.is_none());
    assert!(overrides.createdir.is_none());
    assert!(overrides.quiet.is_none());
  }

  #[test]
  fn flags_become_overrides() {
    let cli = Cli::parse_from([
      "solcpiler",
      "-i",
      "contracts/*.sol",
      "src/**/*.sol",
      "--output-js-dir",
      "dist",
      "--solc-version",
      "v0.8.24",
      "--no-createdir",
      "--quiet",
    ]);
    let overrides = cli.overrides();
    match overrides.input {
      Some(InputPatterns::Many(patterns)) => assert_eq!(patterns.len(), 2),
      other => panic!("unexpected input: {other:?}"),
    }
    assert_eq!(overrides.output_js_dir, Some(PathBuf::from("dist")));
    assert_eq!(overrides.solc_version.as_deref(), Some("v0.8.24"));
    assert_eq!(overrides.createdir, Some(false));
    assert_eq!(overrides.quiet, Some(true));
  }

  #[test]
  fn quiet_and_verbose_conflict() {
    assert!(Cli::try_parse_from(["solcpiler", "--quiet", "--verbose"]).is_err());
  }
}
