use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::discover::glob_files;

const PACKAGE_INDEX_FILE: &str = "index.sol";

/// Lookup from a vendored import name to the file that serves it.
///
/// Vendored libraries follow the `lib/<name>/src/*.sol` layout, and a library may vendor its own
/// dependencies the same way, so one package can appear at several depths:
///
/// ```text
/// lib/ds-auth/src/auth.sol               -> "ds-auth/auth.sol"
/// lib/ds-token/lib/ds-auth/src/auth.sol  -> "ds-auth/auth.sol" (deeper, ignored)
/// lib/ds-auth/src/index.sol              -> "ds-auth"
/// ```
///
/// The shallowest copy of each name wins.
#[derive(Clone, Debug, Default)]
pub struct LibIndex {
  entries: BTreeMap<String, PathBuf>,
}

impl LibIndex {
  /// Scan `<base_dir>/lib/**/src/*.sol`.
  pub fn build(base_dir: &Path) -> Self {
    let pattern = base_dir.join("lib").join("**").join("src").join("*.sol");
    tracing::debug!(
      "collecting lib contracts using glob pattern -> {}",
      pattern.display()
    );
    let files = glob_files(&pattern).unwrap_or_else(|err| {
      tracing::warn!("failed to scan vendored libraries: {err}");
      Vec::new()
    });
    let index = Self::from_paths(files);
    for (name, path) in &index.entries {
      tracing::debug!("mapped {name} -> {}", path.display());
    }
    index
  }

  pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
    let mut entries: BTreeMap<String, PathBuf> = BTreeMap::new();
    for path in paths {
      let Some(name) = logical_name(&path) else {
        continue;
      };
      let depth = path.components().count();
      match entries.get(&name) {
        Some(existing) if existing.components().count() <= depth => {}
        _ => {
          entries.insert(name, path);
        }
      }
    }
    Self { entries }
  }

  pub fn get(&self, name: &str) -> Option<&Path> {
    self.entries.get(name).map(PathBuf::as_path)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Logical name from the last three segments `<vendor>/src/<file>`.
fn logical_name(path: &Path) -> Option<String> {
  let segments: Vec<_> = path
    .iter()
    .map(|segment| segment.to_string_lossy())
    .collect();
  let [vendor, _src, file] = segments.get(segments.len().checked_sub(3)?..)? else {
    return None;
  };
  if *file == PACKAGE_INDEX_FILE {
    Some(vendor.to_string())
  } else {
    Some(format!("{vendor}/{file}"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  #[test]
  fn names_follow_vendor_layout() {
    let index = LibIndex::from_paths([
      PathBuf::from("/repo/lib/ds-auth/src/auth.sol"),
      PathBuf::from("/repo/lib/ds-auth/src/index.sol"),
    ]);
    assert_eq!(
      index.get("ds-auth/auth.sol"),
      Some(Path::new("/repo/lib/ds-auth/src/auth.sol"))
    );
    assert_eq!(
      index.get("ds-auth"),
      Some(Path::new("/repo/lib/ds-auth/src/index.sol"))
    );
  }

  #[test]
  fn shallowest_copy_wins_regardless_of_order() {
    let deep = PathBuf::from("/repo/lib/ds-token/lib/ds-auth/src/auth.sol");
    let shallow = PathBuf::from("/repo/lib/ds-auth/src/auth.sol");

    let index = LibIndex::from_paths([deep.clone(), shallow.clone()]);
    assert_eq!(index.get("ds-auth/auth.sol"), Some(shallow.as_path()));

    let index = LibIndex::from_paths([shallow.clone(), deep]);
    assert_eq!(index.get("ds-auth/auth.sol"), Some(shallow.as_path()));
    assert_eq!(index.len(), 1);
  }

  #[test]
  fn build_scans_nested_vendor_trees() {
    let temp = tempfile::tempdir().unwrap();
    let base = temp.path();
    for path in [
      "lib/ds-token/src/token.sol",
      "lib/ds-token/lib/ds-auth/src/auth.sol",
      "lib/ds-token/lib/ds-auth/src/index.sol",
      "lib/ds-auth/src/auth.sol",
      "lib/ds-auth/test/auth.t.sol",
    ] {
      let file = base.join(path);
      fs::create_dir_all(file.parent().unwrap()).unwrap();
      fs::write(&file, "").unwrap();
    }

    let index = LibIndex::build(base);
    assert_eq!(index.len(), 3);
    assert_eq!(
      index.get("ds-auth/auth.sol"),
      Some(base.join("lib/ds-auth/src/auth.sol").as_path())
    );
    assert_eq!(
      index.get("ds-auth"),
      Some(base.join("lib/ds-token/lib/ds-auth/src/index.sol").as_path())
    );
    assert!(index.get("ds-token/token.sol").is_some());
  }
}
