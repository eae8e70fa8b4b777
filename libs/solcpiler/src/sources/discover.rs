use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use globset::GlobBuilder;
use walkdir::WalkDir;

use crate::internal::errors::{Error, Result};
use crate::internal::path::{canonicalize_path, slash_path};

/// Expand glob `patterns` into a sorted, de-duplicated list of files. Relative patterns are taken
/// from `base_dir`.
pub fn discover_sources(base_dir: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
  let mut files = BTreeSet::new();
  for pattern in patterns {
    let trimmed = pattern.trim_start_matches("./");
    let absolute = if Path::new(trimmed).is_absolute() {
      PathBuf::from(trimmed)
    } else {
      base_dir.join(trimmed)
    };
    files.extend(glob_files(&absolute)?);
  }
  Ok(files.into_iter().collect())
}

/// Files matching an absolute glob `pattern`. `*` stays within one path segment, `**` spans
/// directories. Symlinked directories are followed so vendored submodules resolve.
pub fn glob_files(pattern: &Path) -> Result<Vec<PathBuf>> {
  let (root, remainder) = split_literal_prefix(pattern);
  if remainder.as_os_str().is_empty() {
    return Ok(if root.is_file() { vec![root] } else { Vec::new() });
  }
  if !root.is_dir() {
    return Ok(Vec::new());
  }

  let matcher = GlobBuilder::new(&slash_path(&remainder))
    .literal_separator(true)
    .build()
    .map_err(|err| Error::config(format!("Invalid glob {}: {err}", pattern.display())))?
    .compile_matcher();

  let mut matches = Vec::new();
  for entry in WalkDir::new(&root)
    .follow_links(true)
    .sort_by_file_name()
    .into_iter()
    .filter_map(|entry| entry.ok())
  {
    if !entry.file_type().is_file() {
      continue;
    }
    let Ok(relative) = entry.path().strip_prefix(&root) else {
      continue;
    };
    if matcher.is_match(slash_path(relative)) {
      matches.push(entry.path().to_path_buf());
    }
  }
  Ok(matches)
}

/// Split `pattern` into the longest directory prefix free of glob metacharacters and the rest.
fn split_literal_prefix(pattern: &Path) -> (PathBuf, PathBuf) {
  let mut root = PathBuf::new();
  let mut remainder = PathBuf::new();
  let mut in_glob = false;
  for component in pattern.components() {
    let text = component.as_os_str().to_string_lossy();
    let is_glob = matches!(component, Component::Normal(_))
      && text.chars().any(|c| matches!(c, '*' | '?' | '[' | '{'));
    in_glob |= is_glob;
    if in_glob {
      remainder.push(component.as_os_str());
    } else {
      root.push(component.as_os_str());
    }
  }
  if !in_glob {
    return (canonicalize_path(&root), PathBuf::new());
  }
  (root, remainder)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;

  fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "contract X {}").unwrap();
  }

  #[test]
  fn star_does_not_cross_directories() {
    let temp = tempfile::tempdir().unwrap();
    let base = temp.path();
    touch(&base.join("contracts/A.sol"));
    touch(&base.join("contracts/B.sol"));
    touch(&base.join("contracts/nested/C.sol"));
    touch(&base.join("contracts/readme.md"));

    let files = discover_sources(base, &["./contracts/*.sol".to_string()]).unwrap();
    let names: Vec<_> = files
      .iter()
      .map(|path| path.file_name().unwrap().to_string_lossy().to_string())
      .collect();
    assert_eq!(names, vec!["A.sol", "B.sol"]);
  }

  #[test]
  fn double_star_and_duplicate_patterns() {
    let temp = tempfile::tempdir().unwrap();
    let base = temp.path();
    touch(&base.join("src/A.sol"));
    touch(&base.join("src/deep/er/B.sol"));

    let files = discover_sources(
      base,
      &["src/**/*.sol".to_string(), "src/*.sol".to_string()],
    )
    .unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().any(|path| path.ends_with("deep/er/B.sol")));
  }

  #[test]
  fn literal_path_and_missing_root() {
    let temp = tempfile::tempdir().unwrap();
    let base = temp.path();
    touch(&base.join("contracts/A.sol"));

    assert_eq!(
      discover_sources(base, &["contracts/A.sol".to_string()]).unwrap().len(),
      1
    );
    assert!(discover_sources(base, &["missing/*.sol".to_string()])
      .unwrap()
      .is_empty());
  }
}
