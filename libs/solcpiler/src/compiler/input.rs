use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::ops::Bound;
use std::path::{Path, PathBuf};

use alloy_primitives::keccak256;
use serde::Serialize;

use crate::graph::DependencyResolver;
use crate::internal::errors::Result;
use crate::internal::path::{is_explicitly_relative, normalize_lexically, slash_path};
use crate::internal::settings::CompilerSettings;
use crate::sources::SourceStore;

/// One `sources` entry of a standard-json request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceEntry {
  #[serde(rename = "keccak256")]
  pub hash: String,
  pub urls: Vec<String>,
  pub content: String,
}

/// Standard-json request covering every unit of a batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompilerRequest {
  pub language: String,
  pub sources: BTreeMap<String, SourceEntry>,
  pub settings: CompilerSettings,
}

impl CompilerRequest {
  pub fn remappings(&self) -> &[String] {
    &self.settings.remappings
  }
}

/// A primary file together with its import closure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilationUnit {
  pub primary: PathBuf,
  pub closure: Vec<PathBuf>,
}

impl CompilationUnit {
  /// Closure members followed by the primary.
  pub fn files(&self) -> impl Iterator<Item = &Path> {
    self
      .closure
      .iter()
      .map(PathBuf::as_path)
      .chain(std::iter::once(self.primary.as_path()))
  }
}

/// Canonical logical name of every physical file sent in a request, and back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceNames {
  names: HashMap<PathBuf, String>,
  paths: HashMap<String, PathBuf>,
}

impl SourceNames {
  /// `copies` are extra names sent with their own content entry.
  fn new(names: HashMap<PathBuf, String>, copies: Vec<(String, PathBuf)>) -> Self {
    let paths = names
      .iter()
      .map(|(path, name)| (name.clone(), path.clone()))
      .chain(copies)
      .collect();
    Self { names, paths }
  }

  pub fn name_of(&self, path: &Path) -> Option<&str> {
    self.names.get(path).map(String::as_str)
  }

  pub fn path_of(&self, name: &str) -> Option<&Path> {
    self.paths.get(name).map(PathBuf::as_path)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

/// Logical names seen so far and which one owns each physical file's content.
#[derive(Debug, Default)]
struct NameRegistry {
  names: BTreeMap<String, PathBuf>,
  canonical: HashMap<PathBuf, String>,
  primary_names: BTreeSet<String>,
}

impl NameRegistry {
  /// The first name of a file owns its content. A primary name takes ownership from a name that
  /// only ever appeared as an import.
  fn register(&mut self, name: String, path: &Path, is_primary: bool) {
    match self.names.get(&name) {
      Some(existing) if existing != path => {
        tracing::debug!(
          "logical name {name} already maps to {}, ignoring {}",
          existing.display(),
          path.display()
        );
        return;
      }
      Some(_) => {}
      None => {
        self.names.insert(name.clone(), path.to_path_buf());
      }
    }
    if is_primary {
      self.primary_names.insert(name.clone());
    }

    let owns = match self.canonical.get(path) {
      None => true,
      Some(owner) => *owner != name && is_primary && !self.primary_names.contains(owner),
    };
    if owns {
      self.canonical.insert(path.to_path_buf(), name);
    }
  }

  /// solc applies remappings by plain string prefix, so an alias that prefixes another name would
  /// rewrite that import too.
  fn shadows_other_name(&self, alias: &str) -> bool {
    self
      .names
      .range::<str, _>((Bound::Excluded(alias), Bound::Unbounded))
      .next()
      .is_some_and(|(name, _)| name.starts_with(alias))
  }

  fn names_of(&self, path: &Path) -> Vec<String> {
    self
      .names
      .iter()
      .filter(|(_, target)| target.as_path() == path)
      .map(|(name, _)| name.clone())
      .collect()
  }
}

/// Builds a single deduplicated request for a batch of units.
///
/// Every physical file is registered under the names solc will ask for: primaries under their
/// absolute path, non-relative imports under the reference as written, and relative imports
/// against each name of the importer. A file reached under several names is sent once; the other
/// names become `alias=canonical` remappings, except aliases that prefix another name, which get a
/// copy of the content.
pub struct RequestBuilder<'a> {
  store: &'a SourceStore,
  resolver: &'a DependencyResolver,
  settings: CompilerSettings,
  units: Vec<CompilationUnit>,
  registry: NameRegistry,
}

impl<'a> RequestBuilder<'a> {
  pub fn new(
    store: &'a SourceStore,
    resolver: &'a DependencyResolver,
    settings: CompilerSettings,
  ) -> Self {
    Self {
      store,
      resolver,
      settings,
      units: Vec::new(),
      registry: NameRegistry::default(),
    }
  }

  pub fn add_unit(&mut self, unit: CompilationUnit) {
    register_unit(&mut self.registry, self.resolver, &unit.primary);
    self.units.push(unit);
  }

  pub fn units(&self) -> &[CompilationUnit] {
    &self.units
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  /// Drop units rejected by `keep` along with every name only they could reach.
  pub fn retain_units(&mut self, keep: impl FnMut(&CompilationUnit) -> bool) {
    self.units.retain(keep);
    let mut registry = NameRegistry::default();
    for unit in &self.units {
      register_unit(&mut registry, self.resolver, &unit.primary);
    }
    self.registry = registry;
  }

  pub fn build(&self) -> Result<(CompilerRequest, SourceNames)> {
    let mut sources = BTreeMap::new();
    let mut remappings = Vec::new();
    let mut copies = Vec::new();
    for (name, path) in &self.registry.names {
      let Some(canonical) = self.registry.canonical.get(path) else {
        continue;
      };
      if name != canonical {
        if !self.registry.shadows_other_name(name) {
          remappings.push(format!("{name}={canonical}"));
          continue;
        }
        tracing::debug!("sending {name} as a copy of {canonical}");
        copies.push((name.clone(), path.clone()));
      }
      let unit = self.store.unit(path)?;
      sources.insert(
        name.clone(),
        SourceEntry {
          hash: format!("0x{}", hex::encode(keccak256(unit.content().as_bytes()))),
          urls: vec![slash_path(path)],
          content: unit.content().to_string(),
        },
      );
    }

    let request = CompilerRequest {
      language: "Solidity".to_string(),
      sources,
      settings: self.settings.clone().with_remappings(remappings),
    };
    let names = SourceNames::new(self.registry.canonical.clone(), copies);
    Ok((request, names))
  }
}

fn register_unit(registry: &mut NameRegistry, resolver: &DependencyResolver, primary: &Path) {
  registry.register(slash_path(primary), primary, true);

  let mut queue = VecDeque::from([primary.to_path_buf()]);
  let mut seen = HashSet::from([primary.to_path_buf()]);
  while let Some(importer) = queue.pop_front() {
    let importer_names = registry.names_of(&importer);
    for edge in resolver.edges(&importer) {
      if is_explicitly_relative(&edge.reference) {
        for importer_name in &importer_names {
          let name = join_logical(importer_name, &edge.reference);
          registry.register(name, &edge.target, false);
        }
      } else {
        registry.register(edge.reference.clone(), &edge.target, false);
      }
      if seen.insert(edge.target.clone()) {
        queue.push_back(edge.target.clone());
      }
    }
  }
}

/// Logical name solc derives for a relative import inside the unit named `importer`.
fn join_logical(importer: &str, reference: &str) -> String {
  let directory = match importer.rfind('/') {
    Some(index) => &importer[..index],
    None => "",
  };
  if directory.is_empty() && !importer.starts_with('/') {
    return slash_path(&normalize_lexically(Path::new(reference)));
  }
  let directory = if directory.is_empty() { "/" } else { directory };
  slash_path(&normalize_lexically(&Path::new(directory).join(reference)))
}
