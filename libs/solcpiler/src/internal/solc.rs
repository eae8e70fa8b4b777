use std::path::Path;
use std::sync::{Mutex, OnceLock};

use foundry_compilers::solc::Solc;
use semver::{BuildMetadata, Version};

use super::errors::{map_err_with_context, Error, Result};

pub(crate) const DEFAULT_SOLC_VERSION: &str = "0.8.30";

/// Parse a user-facing solc version. Accepts a leading `v` and build metadata such as
/// `v0.4.12+commit.194ff033`.
pub fn parse_version(version: &str) -> Result<Version> {
  let trimmed = version.trim().trim_start_matches('v');
  Version::parse(trimmed)
    .map_err(|err| Error::config(format!("Failed to parse solc version \"{version}\": {err}")))
}

pub fn default_version() -> Result<Version> {
  parse_version(DEFAULT_SOLC_VERSION)
}

/// Release identity of a compiler, ignoring build metadata (commit hashes, platform tags).
pub fn release(version: &Version) -> Version {
  let mut release = version.clone();
  release.build = BuildMetadata::EMPTY;
  release
}

pub fn same_release(left: &Version, right: &Version) -> bool {
  release(left) == release(right)
}

/// Probe a locally installed solc binary. `solc` without a directory is looked up on `PATH`.
pub fn find_local(path: &Path) -> Option<Solc> {
  Solc::new(path).ok()
}

pub fn find_installed_version(version: &Version) -> Result<Option<Solc>> {
  map_err_with_context(
    Solc::find_svm_installed_version(&release(version)),
    "Failed to inspect solc versions",
  )
}

fn install_mutex() -> &'static Mutex<()> {
  static INSTALL_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
  INSTALL_MUTEX.get_or_init(|| Mutex::new(()))
}

/// Return the svm-managed binary for `version`, downloading it first when missing.
pub fn ensure_installed(version: &Version) -> Result<Solc> {
  let _guard = install_mutex()
    .lock()
    .map_err(|err| Error::toolchain("Solc install mutex poisoned", err))?;

  if let Some(solc) = find_installed_version(version)? {
    return Ok(solc);
  }
  tracing::info!("setting solc version {}", release(version));
  map_err_with_context(
    Solc::blocking_install(&release(version)),
    "Failed to install solc version",
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_version_accepts_prefix_and_build_metadata() {
    let version = parse_version("v0.4.12+commit.194ff033").expect("version");
    assert_eq!(version.major, 0);
    assert_eq!(version.minor, 4);
    assert_eq!(version.patch, 12);
    assert_eq!(version.build.as_str(), "commit.194ff033");
  }

  #[test]
  fn parse_version_rejects_garbage() {
    let err = parse_version("latest").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
  }

  #[test]
  fn releases_ignore_build_metadata() {
    let local = parse_version("0.8.30+commit.73712a01.Linux.gcc").expect("local");
    let fetched = parse_version("0.8.30").expect("fetched");
    assert!(same_release(&local, &fetched));
    assert_eq!(release(&local).to_string(), "0.8.30");
    assert!(!same_release(&fetched, &parse_version("0.8.29").unwrap()));
  }

  #[test]
  fn default_version_parses() {
    assert_eq!(default_version().unwrap().to_string(), DEFAULT_SOLC_VERSION);
  }
}
