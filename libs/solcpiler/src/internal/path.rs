use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Canonicalises a path while falling back to an absolute join if canonicalisation fails.
///
/// Missing paths default to the current working directory so yet-to-be written outputs still get
/// a predictable absolute location.
pub fn canonicalize_path(path: &Path) -> PathBuf {
  match std::fs::canonicalize(path) {
    Ok(canonical) => canonical,
    Err(_) => {
      if path.is_absolute() {
        normalize_lexically(path)
      } else {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        normalize_lexically(&cwd.join(path))
      }
    }
  }
}

/// Canonicalises `path` relative to `base`, returning the best-effort absolute path.
pub fn canonicalize_with_base(base: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() {
    return canonicalize_path(path);
  }
  canonicalize_path(&base.join(path))
}

/// Resolves `.` and `..` components without touching the filesystem. Source unit names handed to
/// solc are normalised the same way, so this must not follow symlinks.
pub fn normalize_lexically(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        if !normalized.pop() {
          normalized.push("..");
        }
      }
      other => normalized.push(other.as_os_str()),
    }
  }
  normalized
}

/// Import references beginning with `./` or `../` are resolved against the importing file.
pub fn is_explicitly_relative(reference: &str) -> bool {
  reference.starts_with("./") || reference.starts_with("../")
}

/// Resolves the project base directory: the first ancestor of `start` that contains a
/// `package.json`, or `start` itself when none does.
pub fn resolve_base_dir(start: &Path) -> PathBuf {
  let start = canonicalize_path(start);
  start
    .ancestors()
    .find(|dir| dir.join("package.json").is_file())
    .map(Path::to_path_buf)
    .unwrap_or(start)
}

/// Forward-slash rendering used for logical names and manifest keys.
pub fn slash_path(path: &Path) -> String {
  let rendered = path.to_string_lossy();
  if MAIN_SEPARATOR == '/' {
    rendered.into_owned()
  } else {
    rendered.replace(MAIN_SEPARATOR, "/")
  }
}

/// Stable display key for `path`: relative to `base` when nested inside it, absolute otherwise.
/// Used for manifest hash keys and flattened-file markers.
pub fn display_key(base: &Path, path: &Path) -> String {
  match path.strip_prefix(base) {
    Ok(relative) if !relative.as_os_str().is_empty() => slash_path(relative),
    _ => slash_path(path),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn canonicalize_relative_paths_with_base() {
    let temp = tempfile::tempdir().expect("tempdir");
    let base = temp.path();
    let nested = base.join("nested");
    std::fs::create_dir_all(&nested).expect("create nested");

    let resolved = canonicalize_with_base(base, Path::new("nested"));
    assert_eq!(resolved, canonicalize_path(&nested));
  }

  #[test]
  fn canonicalize_missing_path_stays_absolute() {
    let resolved = canonicalize_path(Path::new("/definitely/not/../here.sol"));
    assert_eq!(resolved, PathBuf::from("/definitely/here.sol"));
  }

  #[test]
  fn normalize_collapses_dot_segments() {
    assert_eq!(
      normalize_lexically(Path::new("/repo/contracts/./lib/../Token.sol")),
      PathBuf::from("/repo/contracts/Token.sol")
    );
    assert_eq!(
      normalize_lexically(Path::new("../shared/Ownable.sol")),
      PathBuf::from("../shared/Ownable.sol")
    );
  }

  #[test]
  fn only_dot_prefixed_references_are_relative() {
    assert!(is_explicitly_relative("./Token.sol"));
    assert!(is_explicitly_relative("../lib/Math.sol"));
    assert!(!is_explicitly_relative("ds-auth/auth.sol"));
    assert!(!is_explicitly_relative("@openzeppelin/contracts/token/ERC20/ERC20.sol"));
    assert!(!is_explicitly_relative(".hidden/Token.sol"));
  }

  #[test]
  fn base_dir_is_nearest_package_json() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path();
    let nested = root.join("packages").join("token").join("contracts");
    std::fs::create_dir_all(&nested).expect("nested");
    std::fs::write(root.join("packages").join("token").join("package.json"), "{}").expect("pkg");

    let base = resolve_base_dir(&nested);
    assert_eq!(base, canonicalize_path(&root.join("packages").join("token")));
  }

  #[test]
  fn display_key_is_relative_inside_base() {
    let base = Path::new("/repo");
    assert_eq!(
      display_key(base, Path::new("/repo/contracts/A.sol")),
      "contracts/A.sol"
    );
    assert_eq!(
      display_key(base, Path::new("/elsewhere/B.sol")),
      "/elsewhere/B.sol"
    );
  }
}
