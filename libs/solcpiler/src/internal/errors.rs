use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

use semver::Version;

use crate::compiler::output::Diagnostic;

/// Canonical error type used by every stage of a build.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// Path resolution exhausted every search root.
  #[error(
    "Unable to resolve \"{reference}\"{}; looked in: {}",
    importer_suffix(importer.as_deref()),
    join_paths(searched)
  )]
  SourceNotFound {
    reference: String,
    importer: Option<PathBuf>,
    searched: Vec<PathBuf>,
  },

  #[error("Cyclic import detected: {}", join_cycle(cycle))]
  CyclicImport { cycle: Vec<PathBuf> },

  /// The local binary exists but reports another release. Recovered by fetching the requested
  /// version, so callers normally only see it in logs.
  #[error("solc {found} does not satisfy the requested version {requested}")]
  ToolchainVersionMismatch { requested: Version, found: Version },

  #[error("Compiler errors!\n{}", join_diagnostics(diagnostics))]
  ToolchainDiagnostics { diagnostics: Vec<Diagnostic> },

  #[error("solc did not finish within {0:?}")]
  ToolchainTimeout(Duration),

  #[error("{context}: {message}")]
  Toolchain { context: String, message: String },

  /// A previous export module is missing or malformed. Absorbed by the cache as a miss.
  #[error("Unable to read build manifest {}: {reason}", path.display())]
  ManifestUnreadable { path: PathBuf, reason: String },

  #[error("Filesystem error at {}: {source}", path.display())]
  Filesystem {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Invalid configuration: {0}")]
  Config(String),
}

impl Error {
  pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
    Error::Filesystem {
      path: path.as_ref().to_path_buf(),
      source,
    }
  }

  pub fn toolchain(context: impl Into<String>, cause: impl Display) -> Self {
    Error::Toolchain {
      context: context.into(),
      message: cause.to_string(),
    }
  }

  pub fn config(message: impl Into<String>) -> Self {
    Error::Config(message.into())
  }
}

/// Result alias bound to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Annotate a toolchain-side error from `result` with `context`.
pub fn map_err_with_context<T, E>(
  result: std::result::Result<T, E>,
  context: impl AsRef<str>,
) -> Result<T>
where
  E: Display,
{
  result.map_err(|err| Error::toolchain(context.as_ref(), err))
}

fn importer_suffix(importer: Option<&Path>) -> String {
  importer
    .map(|path| format!(" imported from {}", path.display()))
    .unwrap_or_default()
}

fn join_paths(paths: &[PathBuf]) -> String {
  paths
    .iter()
    .map(|path| path.display().to_string())
    .collect::<Vec<_>>()
    .join(", ")
}

fn join_cycle(cycle: &[PathBuf]) -> String {
  cycle
    .iter()
    .map(|path| path.display().to_string())
    .collect::<Vec<_>>()
    .join(" -> ")
}

fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
  diagnostics
    .iter()
    .map(|diagnostic| diagnostic.to_string())
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::compiler::output::SeverityLevel;

  #[test]
  fn source_not_found_lists_every_location() {
    let err = Error::SourceNotFound {
      reference: "ds-auth/auth.sol".to_string(),
      importer: Some(PathBuf::from("/repo/contracts/Token.sol")),
      searched: vec![
        PathBuf::from("/repo/ds-auth/auth.sol"),
        PathBuf::from("/repo/contracts/ds-auth/auth.sol"),
        PathBuf::from("/repo/src/ds-auth/auth.sol"),
      ],
    };
    let message = err.to_string();
    assert!(message.contains("ds-auth/auth.sol"));
    assert!(message.contains("imported from /repo/contracts/Token.sol"));
    assert!(message.contains("/repo/contracts/ds-auth/auth.sol"));
    assert!(message.contains("/repo/src/ds-auth/auth.sol"));
  }

  #[test]
  fn cyclic_import_names_the_cycle() {
    let err = Error::CyclicImport {
      cycle: vec![
        PathBuf::from("A.sol"),
        PathBuf::from("B.sol"),
        PathBuf::from("A.sol"),
      ],
    };
    assert_eq!(err.to_string(), "Cyclic import detected: A.sol -> B.sol -> A.sol");
  }

  #[test]
  fn diagnostics_are_reported_verbatim() {
    let err = Error::ToolchainDiagnostics {
      diagnostics: vec![Diagnostic {
        severity: SeverityLevel::Error,
        message: "Expected ';' but got '}'".to_string(),
        formatted_message: Some("ParserError: Expected ';' but got '}'\n --> A.sol:3:1".to_string()),
        kind: "ParserError".to_string(),
      }],
    };
    let message = err.to_string();
    assert!(message.starts_with("Compiler errors!"));
    assert!(message.contains("--> A.sol:3:1"));
  }

  #[test]
  fn map_err_with_context_prefixes_message() {
    let result: std::result::Result<(), &str> = Err("spawn failed");
    let err = map_err_with_context(result, "Solc compilation failed").unwrap_err();
    assert_eq!(err.to_string(), "Solc compilation failed: spawn failed");
  }
}
