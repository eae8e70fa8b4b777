//! Staleness decisions backed by the previous build's export module.
//!
//! Every export module ends with one hash export per file in its unit plus the compiler release
//! that produced it. Reading those lines back is the whole manifest; there is no separate cache
//! file to keep in sync.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::internal::errors::{Error, Result};
use crate::internal::path::display_key;
use crate::sources::SourceStore;

pub const VERSION_EXPORT: &str = "_solcVersion";

static HASH_EXPORT: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#"(?m)^exports\[("(?:[^"\\]|\\.)*")\]\s*=\s*("(?:[^"\\]|\\.)*")"#)
    .expect("hash export pattern is valid")
});

static VERSION_LINE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#"(?m)^exports\._solcVersion\s*=\s*("(?:[^"\\]|\\.)*")"#)
    .expect("version export pattern is valid")
});

/// Export name carrying the content hash of the file keyed `key`.
pub fn hash_export_name(key: &str) -> String {
  format!("_{key}_sha256")
}

/// Hashes and compiler release recorded by a previous build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildManifest {
  pub hashes: BTreeMap<String, String>,
  pub toolchain_version: Option<String>,
}

impl BuildManifest {
  pub fn load(path: &Path) -> Result<Self> {
    let unreadable = |reason: String| Error::ManifestUnreadable {
      path: path.to_path_buf(),
      reason,
    };
    let contents = fs::read_to_string(path).map_err(|err| unreadable(err.to_string()))?;
    let manifest = Self::parse(&contents);
    if manifest.hashes.is_empty() && manifest.toolchain_version.is_none() {
      return Err(unreadable("no build metadata found".to_string()));
    }
    Ok(manifest)
  }

  pub fn parse(contents: &str) -> Self {
    let mut hashes = BTreeMap::new();
    for captures in HASH_EXPORT.captures_iter(contents) {
      let (Some(name), Some(value)) = (
        unquote(&captures[1]).and_then(|name| hash_key(&name).map(str::to_string)),
        unquote(&captures[2]),
      ) else {
        continue;
      };
      hashes.insert(name, value);
    }
    let toolchain_version = VERSION_LINE
      .captures(contents)
      .and_then(|captures| unquote(&captures[1]));

    BuildManifest {
      hashes,
      toolchain_version,
    }
  }
}

fn unquote(literal: &str) -> Option<String> {
  serde_json::from_str(literal).ok()
}

fn hash_key(export: &str) -> Option<&str> {
  export.strip_prefix('_')?.strip_suffix("_sha256")
}

/// Manifest for a unit whose export module lives at `path`. Unreadable manifests count as a miss.
pub fn read_manifest(path: &Path) -> Option<BuildManifest> {
  match BuildManifest::load(path) {
    Ok(manifest) => Some(manifest),
    Err(err) => {
      tracing::debug!("{err}");
      None
    }
  }
}

/// Current content hash of the primary and every closure member, keyed like the manifest.
pub fn current_hashes(
  store: &SourceStore,
  primary: &Path,
  closure: &[PathBuf],
) -> Result<BTreeMap<String, String>> {
  let mut hashes = BTreeMap::new();
  for path in closure.iter().map(PathBuf::as_path).chain([primary]) {
    let unit = store.unit(path)?;
    hashes.insert(
      display_key(store.base_dir(), path),
      unit.content_hash().to_string(),
    );
  }
  Ok(hashes)
}

/// A unit is fresh only when the recorded release matches exactly and the recorded hashes cover
/// the same files with the same content.
pub fn is_stale(
  manifest: Option<&BuildManifest>,
  current: &BTreeMap<String, String>,
  toolchain_version: &str,
) -> bool {
  let Some(manifest) = manifest else {
    return true;
  };
  if manifest.toolchain_version.as_deref() != Some(toolchain_version) {
    return true;
  }
  if manifest.hashes.len() != current.len() {
    return true;
  }
  current
    .iter()
    .any(|(key, hash)| manifest.hashes.get(key) != Some(hash))
}
