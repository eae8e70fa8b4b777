//! Files written for each compiled unit, plus the request/response snapshot of the batch.
//!
//! Per primary `<stem>.sol`:
//!
//! - `<output_js_dir>/<stem>.sol.js` export module, also the next run's manifest
//! - `<output_sol_dir>/<stem>_all.sol` flattened source
//! - `<artifacts_dir>/<Contract>.json` for every contract defined in the primary

pub mod coverage;
pub mod export;
pub mod flatten;

use std::fs;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use indexmap::IndexMap;

use crate::compiler::{CompilationUnit, CompilerRequest, CompilerResult, SourceNames};
use crate::internal::config::SolcpilerConfig;
use crate::internal::errors::{map_err_with_context, Error, Result};
use crate::sources::SourceStore;

pub const STANDARD_INPUT_FILE: &str = "solcStandardInput.json";
pub const STANDARD_OUTPUT_FILE: &str = "solcStandardOutput.json";

/// Name shared by every output of a primary file: its file name without `.sol`.
pub fn unit_stem(primary: &Path) -> String {
  let file_name = primary
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_default();
  match file_name.strip_suffix(".sol") {
    Some(stem) => stem.to_string(),
    None => file_name,
  }
}

/// Location of the export module of `primary`, which doubles as its build manifest.
pub fn export_module_path(config: &SolcpilerConfig, primary: &Path) -> PathBuf {
  config
    .output_js_dir
    .join(format!("{}.sol.js", unit_stem(primary)))
}

/// Make sure `dir` is a usable output directory, creating it when allowed.
pub fn ensure_output_dir(dir: &Path, create: bool) -> Result<()> {
  if dir.is_dir() {
    return Ok(());
  }
  if dir.exists() {
    return Err(Error::config(format!("{} is not a directory", dir.display())));
  }
  if !create {
    return Err(Error::config(format!("{} does not exist", dir.display())));
  }
  tracing::debug!("creating output directory {}", dir.display());
  fs::create_dir_all(dir).map_err(|err| Error::io(dir, err))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFile {
  pub path: PathBuf,
  pub contents: String,
}

/// Everything needed to render the outputs of one compiled batch.
pub struct ArtifactWriter<'a> {
  pub config: &'a SolcpilerConfig,
  pub store: &'a SourceStore,
  pub names: &'a SourceNames,
  pub request: &'a CompilerRequest,
  pub result: &'a CompilerResult,
  pub toolchain_name: &'a str,
  pub toolchain_version: &'a str,
}

impl ArtifactWriter<'_> {
  pub fn unit_outputs(&self, unit: &CompilationUnit) -> Result<Vec<OutputFile>> {
    let stem = unit_stem(&unit.primary);
    let mut files = vec![
      OutputFile {
        path: export_module_path(self.config, &unit.primary),
        contents: export::render_export_module(
          self.store,
          self.names,
          self.result,
          unit,
          self.toolchain_version,
        )?,
      },
      OutputFile {
        path: self.config.output_sol_dir.join(format!("{stem}_all.sol")),
        contents: flatten::flatten_unit(self.store, unit)?,
      },
    ];

    for (contract, artifact) in coverage::contract_artifacts(self, unit)? {
      files.push(OutputFile {
        path: self.config.artifacts_dir.join(format!("{contract}.json")),
        contents: to_pretty_json(&artifact)?,
      });
    }
    Ok(files)
  }

  /// The request as sent and the response without debug-only fields.
  pub fn snapshot_outputs(&self) -> Result<Vec<OutputFile>> {
    Ok(vec![
      OutputFile {
        path: self.config.output_sol_dir.join(STANDARD_INPUT_FILE),
        contents: to_pretty_json(self.request)?,
      },
      OutputFile {
        path: self.config.output_sol_dir.join(STANDARD_OUTPUT_FILE),
        contents: to_pretty_json(&self.result.stripped())?,
      },
    ])
  }

  /// Render and write the outputs of every unit plus the snapshot. Returns the number of files
  /// written.
  ///
  /// Units sharing a file stem or a contract name render the same path; the unit listed last
  /// keeps it, and each path is written once.
  pub async fn write_all(&self, units: &[CompilationUnit]) -> Result<usize> {
    let mut files: IndexMap<PathBuf, (Option<&Path>, String)> = IndexMap::new();
    for file in self.snapshot_outputs()? {
      files.insert(file.path, (None, file.contents));
    }
    for unit in units {
      for file in self.unit_outputs(unit)? {
        let owner = Some(unit.primary.as_path());
        if let Some((Some(previous), _)) = files.insert(file.path.clone(), (owner, file.contents)) {
          tracing::warn!(
            "{} replaces the {} written for {}",
            unit.primary.display(),
            file.path.display(),
            previous.display()
          );
        }
      }
    }

    let files: Vec<OutputFile> = files
      .into_iter()
      .map(|(path, (_, contents))| OutputFile { path, contents })
      .collect();
    let count = files.len();
    write_files(files).await?;
    Ok(count)
  }
}

pub async fn write_files(files: Vec<OutputFile>) -> Result<()> {
  let writes = files.into_iter().map(|file| async move {
    tokio::fs::write(&file.path, file.contents)
      .await
      .map_err(|err| Error::io(&file.path, err))
  });
  try_join_all(writes).await?;
  Ok(())
}

fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
  map_err_with_context(
    serde_json::to_string_pretty(value),
    "Failed to serialise artifact",
  )
}
