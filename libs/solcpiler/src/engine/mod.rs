//! Build orchestration: discover, resolve, skip what is unchanged, compile the rest in one batch.


use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::artifacts::{ensure_output_dir, export_module_path, ArtifactWriter};
use crate::cache;
use crate::compiler::{
  select_toolchain, CompilationUnit, CompilerRequest, CompilerResult, Diagnostic, RequestBuilder,
  Toolchain,
};
use crate::graph::DependencyResolver;
use crate::internal::config::SolcpilerConfig;
use crate::internal::errors::{map_err_with_context, Error, Result};
use crate::internal::path::display_key;
use crate::internal::solc;
use crate::sources::{discover_sources, SourceStore};

/// Outcome of one build.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BuildReport {
  /// Primaries sent to the compiler.
  pub compiled: Vec<PathBuf>,
  /// Primaries whose previous outputs were still valid.
  pub skipped: Vec<PathBuf>,
  pub warnings: Vec<Diagnostic>,
  pub toolchain_invocations: usize,
}

/// Incremental build engine.
///
/// Loaded sources, closures and logical names are scoped to a single [`Solcpiler::compile`] call,
/// so one engine can run repeatedly and several engines can run side by side.
pub struct Solcpiler {
  config: SolcpilerConfig,
  toolchain: Arc<dyn Toolchain>,
}

impl Solcpiler {
  pub fn new(config: SolcpilerConfig, toolchain: Arc<dyn Toolchain>) -> Self {
    Self { config, toolchain }
  }

  /// Select the compiler for `config` (possibly downloading it) and build an engine around it.
  pub async fn from_config(config: SolcpilerConfig) -> Result<Self> {
    let selection = config.clone();
    let toolchain = map_err_with_context(
      tokio::task::spawn_blocking(move || select_toolchain(&selection)).await,
      "Solc selection task failed",
    )??;
    Ok(Self::new(config, toolchain))
  }

  pub fn config(&self) -> &SolcpilerConfig {
    &self.config
  }

  /// Release recorded in manifests; build metadata is ignored.
  pub fn toolchain_version(&self) -> String {
    solc::release(self.toolchain.version()).to_string()
  }

  /// Build every file matched by the configured input patterns.
  pub async fn compile(&self) -> Result<BuildReport> {
    self.ensure_output_dirs()?;
    let files = discover_sources(&self.config.base_dir, &self.config.inputs)?;
    if files.is_empty() {
      tracing::info!("No files to compile");
      return Ok(BuildReport::default());
    }
    self.compile_files(&files).await
  }

  /// Build the given primary files.
  pub async fn compile_files(&self, files: &[PathBuf]) -> Result<BuildReport> {
    self.ensure_output_dirs()?;
    let mut store = SourceStore::new(&self.config.base_dir, self.config.constants.clone());
    let primaries = store.load_primaries(files).await?;

    let mut resolver = DependencyResolver::new();
    let mut units = Vec::with_capacity(primaries.len());
    for primary in primaries {
      let closure = resolver.closure(&mut store, &primary)?;
      units.push(CompilationUnit { primary, closure });
    }

    let version = self.toolchain_version();
    let mut report = BuildReport::default();
    let mut stale = HashSet::new();
    tracing::info!("calculating contract hashes");
    for unit in &units {
      let manifest = cache::read_manifest(&export_module_path(&self.config, &unit.primary));
      let current = cache::current_hashes(&store, &unit.primary, &unit.closure)?;
      if cache::is_stale(manifest.as_ref(), &current, &version) {
        stale.insert(unit.primary.clone());
      } else {
        tracing::info!(
          "skipping {}... contract and dependencies unchanged",
          display_key(&self.config.base_dir, &unit.primary)
        );
        report.skipped.push(unit.primary.clone());
      }
    }

    let mut builder = RequestBuilder::new(&store, &resolver, self.config.settings.clone());
    for unit in units {
      builder.add_unit(unit);
    }
    builder.retain_units(|unit| stale.contains(&unit.primary));
    if builder.is_empty() {
      return Ok(report);
    }

    let (request, names) = builder.build()?;
    let request = Arc::new(request);
    tracing::info!("compiling contracts");
    let result = self.invoke(Arc::clone(&request)).await?;
    report.toolchain_invocations += 1;

    if result.has_errors() {
      let diagnostics = result
        .errors
        .iter()
        .filter(|diagnostic| diagnostic.is_error() || !self.config.quiet)
        .cloned()
        .collect();
      return Err(Error::ToolchainDiagnostics { diagnostics });
    }
    report.warnings = result.warnings().cloned().collect();
    if !self.config.quiet {
      for warning in &report.warnings {
        tracing::warn!("{warning}");
      }
    }

    tracing::info!("saving output");
    let writer = ArtifactWriter {
      config: &self.config,
      store: &store,
      names: &names,
      request: &request,
      result: &result,
      toolchain_name: self.toolchain.name(),
      toolchain_version: &version,
    };
    let written = writer.write_all(builder.units()).await?;
    tracing::debug!("wrote {written} files");

    report.compiled = builder
      .units()
      .iter()
      .map(|unit| unit.primary.clone())
      .collect();
    Ok(report)
  }

  fn ensure_output_dirs(&self) -> Result<()> {
    for dir in [
      &self.config.output_js_dir,
      &self.config.output_sol_dir,
      &self.config.artifacts_dir,
    ] {
      ensure_output_dir(dir, self.config.create_dirs)?;
    }
    Ok(())
  }

  /// Run the compiler on a blocking worker, bounded by the configured timeout.
  async fn invoke(&self, request: Arc<CompilerRequest>) -> Result<CompilerResult> {
    let toolchain = Arc::clone(&self.toolchain);
    let task = tokio::task::spawn_blocking(move || toolchain.compile(&request));
    let joined = match self.config.toolchain_timeout {
      Some(limit) => tokio::time::timeout(limit, task)
        .await
        .map_err(|_| Error::ToolchainTimeout(limit))?,
      None => task.await,
    };
    map_err_with_context(joined, "Solc worker failed")?
  }
}
