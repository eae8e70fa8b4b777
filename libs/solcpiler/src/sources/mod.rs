//! Source loading and import path resolution.

pub mod discover;
pub mod libs;
pub mod parser;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use futures::future::try_join_all;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::internal::errors::{Error, Result};
use crate::internal::path::{is_explicitly_relative, normalize_lexically, slash_path};
use libs::LibIndex;

pub use discover::discover_sources;

/// Whether a file was selected for compilation or only pulled in through an import.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceRole {
  Primary,
  Dependency,
}

/// One physical file: its canonical path, post-substitution content, and memoised hash.
#[derive(Clone, Debug)]
pub struct SourceUnit {
  path: PathBuf,
  content: String,
  role: SourceRole,
  hash: OnceLock<String>,
}

impl SourceUnit {
  fn new(path: PathBuf, content: String, role: SourceRole) -> Self {
    Self {
      path,
      content,
      role,
      hash: OnceLock::new(),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn content(&self) -> &str {
    &self.content
  }

  pub fn role(&self) -> SourceRole {
    self.role
  }

  pub fn is_primary(&self) -> bool {
    self.role == SourceRole::Primary
  }

  /// Hex sha256 of the content, computed once.
  pub fn content_hash(&self) -> &str {
    self.hash.get_or_init(|| hash_content(&self.content))
  }
}

pub fn hash_content(content: &str) -> String {
  hex::encode(Sha256::digest(content.as_bytes()))
}

/// Loaded sources for one build, keyed by canonical path.
///
/// Import references are resolved against these roots, first match wins:
///
/// 1. the reference itself (relative references against the importing directory, others against
///    the base directory)
/// 2. `<base>/contracts/<reference>`
/// 3. `<base>/src/<reference>`
/// 4. node-style package lookup from the base directory
/// 5. the vendored [`LibIndex`], built on the first lookup that reaches it
///
/// Projects rely on this order for shadowing, so it is fixed.
#[derive(Debug)]
pub struct SourceStore {
  base_dir: PathBuf,
  constants: BTreeMap<String, String>,
  units: IndexMap<PathBuf, SourceUnit>,
  aliases: HashMap<String, PathBuf>,
  libs: Option<LibIndex>,
}

impl SourceStore {
  pub fn new(base_dir: impl Into<PathBuf>, constants: BTreeMap<String, String>) -> Self {
    Self {
      base_dir: base_dir.into(),
      constants,
      units: IndexMap::new(),
      aliases: HashMap::new(),
      libs: None,
    }
  }

  pub fn base_dir(&self) -> &Path {
    &self.base_dir
  }

  pub fn get(&self, path: &Path) -> Option<&SourceUnit> {
    self.units.get(path)
  }

  pub fn unit(&self, path: &Path) -> Result<&SourceUnit> {
    self.units.get(path).ok_or_else(|| Error::SourceNotFound {
      reference: slash_path(path),
      importer: None,
      searched: vec![path.to_path_buf()],
    })
  }

  pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
    self.units.values()
  }

  pub fn len(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  /// Logical request names that were resolved to `path`.
  #[cfg(test)]
  fn aliases_of(&self, path: &Path) -> Vec<&str> {
    let mut names: Vec<&str> = self
      .aliases
      .iter()
      .filter(|(_, target)| target.as_path() == path)
      .map(|(name, _)| name.as_str())
      .collect();
    names.sort_unstable();
    names
  }

  /// Read every primary file concurrently, then register them in input order. Returns the
  /// canonical paths without duplicates.
  pub async fn load_primaries(&mut self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let reads = paths.iter().map(|path| async move {
      let canonical = tokio::fs::canonicalize(path)
        .await
        .map_err(|err| Error::io(path, err))?;
      let content = tokio::fs::read_to_string(&canonical)
        .await
        .map_err(|err| Error::io(&canonical, err))?;
      Ok::<_, Error>((canonical, content))
    });
    let loaded = try_join_all(reads).await?;

    let mut primaries = Vec::with_capacity(loaded.len());
    for (path, content) in loaded {
      tracing::debug!("loading file -> {}", path.display());
      self.insert(path.clone(), &content, SourceRole::Primary);
      if !primaries.contains(&path) {
        primaries.push(path);
      }
    }
    Ok(primaries)
  }

  /// Load a single primary file synchronously.
  pub fn load_primary(&mut self, path: &Path) -> Result<&SourceUnit> {
    let canonical = self.load(path, SourceRole::Primary)?;
    self.unit(&canonical)
  }

  /// Resolve `reference` as written in a file located in `from_dir`, loading it on first sight.
  pub fn resolve(&mut self, reference: &str, from_dir: &Path) -> Result<&SourceUnit> {
    let key = self.request_key(reference, from_dir);
    if let Some(path) = self.aliases.get(&key).cloned() {
      return self.unit(&path);
    }
    tracing::debug!("resolving import -> {reference}");

    let mut searched = Vec::new();
    let Some(found) = self.locate(reference, from_dir, &mut searched) else {
      return Err(Error::SourceNotFound {
        reference: reference.to_string(),
        importer: None,
        searched,
      });
    };
    let canonical = self.load(&found, SourceRole::Dependency)?;
    self.aliases.insert(key, canonical.clone());
    self.unit(&canonical)
  }

  fn request_key(&self, reference: &str, from_dir: &Path) -> String {
    if is_explicitly_relative(reference) {
      slash_path(&normalize_lexically(&from_dir.join(reference)))
    } else {
      reference.to_string()
    }
  }

  fn locate(
    &mut self,
    reference: &str,
    from_dir: &Path,
    searched: &mut Vec<PathBuf>,
  ) -> Option<PathBuf> {
    let direct = if Path::new(reference).is_absolute() {
      PathBuf::from(reference)
    } else if is_explicitly_relative(reference) {
      from_dir.join(reference)
    } else {
      self.base_dir.join(reference)
    };

    let candidates = [
      direct,
      self.base_dir.join("contracts").join(reference),
      self.base_dir.join("src").join(reference),
    ];
    for candidate in candidates {
      let candidate = normalize_lexically(&candidate);
      if candidate.is_file() {
        return Some(candidate);
      }
      searched.push(candidate);
    }

    if is_explicitly_relative(reference) {
      return None;
    }

    match node_resolve::resolve_from(reference, self.base_dir.clone()) {
      Ok(path) if path.is_file() => return Some(path),
      _ => searched.push(self.base_dir.join("node_modules").join(reference)),
    }

    let base_dir = self.base_dir.clone();
    let libs = self.libs.get_or_insert_with(|| LibIndex::build(&base_dir));
    if let Some(path) = libs.get(reference) {
      return Some(path.to_path_buf());
    }
    searched.push(base_dir.join("lib").join("**").join("src"));
    None
  }

  fn load(&mut self, path: &Path, role: SourceRole) -> Result<PathBuf> {
    let canonical = fs::canonicalize(path).map_err(|err| Error::io(path, err))?;
    if let Some(unit) = self.units.get_mut(&canonical) {
      if role == SourceRole::Primary {
        unit.role = SourceRole::Primary;
      }
      return Ok(canonical);
    }

    tracing::debug!("loading file -> {}", canonical.display());
    let content = fs::read_to_string(&canonical).map_err(|err| Error::io(&canonical, err))?;
    self.insert(canonical.clone(), &content, role);
    Ok(canonical)
  }

  /// A primary role always wins over a dependency role for the same path.
  fn insert(&mut self, path: PathBuf, raw: &str, role: SourceRole) {
    if let Some(unit) = self.units.get_mut(&path) {
      if role == SourceRole::Primary {
        unit.role = SourceRole::Primary;
      }
      return;
    }
    let content = parser::substitute_constants(raw, &self.constants);
    self
      .units
      .insert(path.clone(), SourceUnit::new(path, content, role));
  }
}
