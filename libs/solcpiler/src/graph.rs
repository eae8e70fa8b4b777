use std::collections::HashMap;
use std::path::{Path, PathBuf};

use indexmap::IndexSet;

use crate::internal::errors::{Error, Result};
use crate::sources::{parser, SourceStore};

/// One `import` statement: the reference as written and the file it resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportEdge {
  pub reference: String,
  pub target: PathBuf,
}

/// Expands files into their transitive import closures.
///
/// A closure lists every dependency once, after all of its own dependencies, and never contains
/// the file it was computed for. Results are memoised per path for the lifetime of the resolver.
#[derive(Debug, Default)]
pub struct DependencyResolver {
  closures: HashMap<PathBuf, Vec<PathBuf>>,
  edges: HashMap<PathBuf, Vec<ImportEdge>>,
}

impl DependencyResolver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn closure(&mut self, store: &mut SourceStore, path: &Path) -> Result<Vec<PathBuf>> {
    let mut visiting = Vec::new();
    self.visit(store, path, &mut visiting)
  }

  /// Imports of an already expanded file, in textual order.
  pub fn edges(&self, path: &Path) -> &[ImportEdge] {
    self.edges.get(path).map(Vec::as_slice).unwrap_or_default()
  }

  fn visit(
    &mut self,
    store: &mut SourceStore,
    path: &Path,
    visiting: &mut Vec<PathBuf>,
  ) -> Result<Vec<PathBuf>> {
    if let Some(closure) = self.closures.get(path) {
      return Ok(closure.clone());
    }
    if let Some(start) = visiting.iter().position(|entry| entry == path) {
      let mut cycle = visiting[start..].to_vec();
      cycle.push(path.to_path_buf());
      return Err(Error::CyclicImport { cycle });
    }
    visiting.push(path.to_path_buf());

    let content = store.unit(path)?.content().to_string();
    let from_dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| store.base_dir().to_path_buf());

    let mut closure = IndexSet::new();
    let mut edges = Vec::new();
    for reference in parser::extract_imports(&content) {
      let target = match store.resolve(&reference, &from_dir) {
        Ok(unit) => unit.path().to_path_buf(),
        Err(Error::SourceNotFound {
          reference,
          searched,
          ..
        }) => {
          return Err(Error::SourceNotFound {
            reference,
            importer: Some(path.to_path_buf()),
            searched,
          })
        }
        Err(err) => return Err(err),
      };
      let nested = self.visit(store, &target, visiting)?;
      closure.extend(nested);
      closure.insert(target.clone());
      edges.push(ImportEdge { reference, target });
    }

    visiting.pop();
    let closure: Vec<PathBuf> = closure.into_iter().collect();
    self.closures.insert(path.to_path_buf(), closure.clone());
    self.edges.insert(path.to_path_buf(), edges);
    Ok(closure)
  }
}
