use std::sync::Arc;

use foundry_compilers::solc::Solc;
use semver::Version;
use serde_json::Value;

use super::input::CompilerRequest;
use super::output::CompilerResult;
use crate::internal::config::SolcpilerConfig;
use crate::internal::errors::{map_err_with_context, Error, Result};
use crate::internal::solc;

/// Anything that can turn a standard-json request into a [`CompilerResult`].
///
/// `compile` blocks until the compiler finishes; the engine runs it on a blocking worker.
pub trait Toolchain: Send + Sync {
  fn name(&self) -> &str {
    "solc"
  }

  fn version(&self) -> &Version;

  fn compile(&self, request: &CompilerRequest) -> Result<CompilerResult>;
}

/// A solc binary already present on the machine.
#[derive(Clone, Debug)]
pub struct LocalSolc {
  solc: Solc,
}

impl LocalSolc {
  pub fn new(solc: Solc) -> Self {
    Self { solc }
  }
}

impl Toolchain for LocalSolc {
  fn version(&self) -> &Version {
    &self.solc.version
  }

  fn compile(&self, request: &CompilerRequest) -> Result<CompilerResult> {
    run_standard_json(&self.solc, request)
  }
}

/// An exact solc release managed through svm, downloaded on first use.
#[derive(Clone, Debug)]
pub struct FetchedSolc {
  solc: Solc,
}

impl FetchedSolc {
  pub fn install(version: &Version) -> Result<Self> {
    Ok(Self {
      solc: solc::ensure_installed(version)?,
    })
  }
}

impl Toolchain for FetchedSolc {
  fn version(&self) -> &Version {
    &self.solc.version
  }

  fn compile(&self, request: &CompilerRequest) -> Result<CompilerResult> {
    run_standard_json(&self.solc, request)
  }
}

fn run_standard_json(solc: &Solc, request: &CompilerRequest) -> Result<CompilerResult> {
  let output: Value = map_err_with_context(solc.compile_as(request), "Solc compilation failed")?;
  CompilerResult::from_standard_json(output)
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Strategy {
  Local,
  Fetch(Version),
}

fn choose_strategy(requested: Option<&Version>, local: Option<&Version>) -> Result<Strategy> {
  match (requested, local) {
    (None, Some(_)) => Ok(Strategy::Local),
    (Some(requested), Some(found)) if solc::same_release(requested, found) => Ok(Strategy::Local),
    (Some(requested), Some(found)) => {
      let mismatch = Error::ToolchainVersionMismatch {
        requested: requested.clone(),
        found: found.clone(),
      };
      tracing::warn!("{mismatch}, falling back to a managed install");
      Ok(Strategy::Fetch(requested.clone()))
    }
    (Some(requested), None) => Ok(Strategy::Fetch(requested.clone())),
    (None, None) => Ok(Strategy::Fetch(solc::default_version()?)),
  }
}

/// Pick the compiler for this run: the local binary when it matches the requested release (or
/// nothing was requested), otherwise the requested release installed through svm.
///
/// May download a compiler, so call it outside of async contexts.
pub fn select_toolchain(config: &SolcpilerConfig) -> Result<Arc<dyn Toolchain>> {
  let local = solc::find_local(&config.solc_path);
  let strategy = choose_strategy(
    config.solc_version.as_ref(),
    local.as_ref().map(|solc| &solc.version),
  )?;
  match (strategy, local) {
    (Strategy::Local, Some(local)) => {
      tracing::debug!("using local solc {} at {}", local.version, local.solc.display());
      Ok(Arc::new(LocalSolc::new(local)))
    }
    (Strategy::Fetch(version), _) => Ok(Arc::new(FetchedSolc::install(&version)?)),
    (Strategy::Local, None) => Err(Error::toolchain(
      "Failed to select solc",
      "no local binary available",
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn version(text: &str) -> Version {
    solc::parse_version(text).unwrap()
  }

  #[test]
  fn local_binary_is_used_without_a_requested_version() {
    assert_eq!(
      choose_strategy(None, Some(&version("0.8.19"))).unwrap(),
      Strategy::Local
    );
  }

  #[test]
  fn matching_release_ignores_build_metadata() {
    let requested = version("0.8.24");
    let found = version("0.8.24+commit.e11b9ed9.Linux.gcc");
    assert_eq!(
      choose_strategy(Some(&requested), Some(&found)).unwrap(),
      Strategy::Local
    );
  }

  #[test]
  fn mismatch_and_missing_binary_fetch_the_release() {
    let requested = version("v0.4.24");
    assert_eq!(
      choose_strategy(Some(&requested), Some(&version("0.8.24"))).unwrap(),
      Strategy::Fetch(requested.clone())
    );
    assert_eq!(
      choose_strategy(Some(&requested), None).unwrap(),
      Strategy::Fetch(requested)
    );
    assert_eq!(
      choose_strategy(None, None).unwrap(),
      Strategy::Fetch(solc::default_version().unwrap())
    );
  }
}
