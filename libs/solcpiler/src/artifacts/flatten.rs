use crate::compiler::CompilationUnit;
use crate::internal::errors::Result;
use crate::internal::path::display_key;
use crate::sources::{parser, SourceStore};

pub const FILE_MARKER: &str = "///File: ";

/// Concatenate `unit` dependencies first into one source with every import removed. Each segment
/// starts with a `///File: <path>` marker line.
pub fn flatten_unit(store: &SourceStore, unit: &CompilationUnit) -> Result<String> {
  let mut flattened = String::new();
  for path in unit.files() {
    let source = store.unit(path)?;
    flattened.push_str("\n\n");
    flattened.push_str(FILE_MARKER);
    flattened.push_str(&display_key(store.base_dir(), path));
    flattened.push('\n');
    flattened.push_str(&parser::strip_imports(source.content()));
  }
  Ok(flattened)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;
  use std::fs;

  use crate::graph::DependencyResolver;

  #[test]
  fn segments_follow_closure_order_without_imports() {
    let temp = tempfile::tempdir().unwrap();
    let base = fs::canonicalize(temp.path()).unwrap();
    fs::create_dir_all(base.join("contracts")).unwrap();
    let sources = [
      ("A.sol", "pragma solidity ^0.8.0;\nimport \"./B.sol\";\ncontract A is B {}\n"),
      ("B.sol", "pragma solidity ^0.8.0;\nimport {C} from \"./C.sol\";\ncontract B is C {}\n"),
      ("C.sol", "pragma solidity ^0.8.0;\ncontract C {}\n"),
    ];
    for (name, contents) in sources {
      fs::write(base.join("contracts").join(name), contents).unwrap();
    }

    let primary = base.join("contracts/A.sol");
    let mut store = SourceStore::new(&base, BTreeMap::new());
    store.load_primary(&primary).unwrap();
    let closure = DependencyResolver::new()
      .closure(&mut store, &primary)
      .unwrap();
    let unit = CompilationUnit { primary, closure };

    let flattened = flatten_unit(&store, &unit).unwrap();
    assert!(!flattened.contains("import"));
    let markers: Vec<_> = flattened
      .lines()
      .filter_map(|line| line.strip_prefix(FILE_MARKER))
      .collect();
    assert_eq!(markers, vec!["contracts/C.sol", "contracts/B.sol", "contracts/A.sol"]);

    let bodies: String = flattened
      .lines()
      .filter(|line| !line.starts_with(FILE_MARKER) && !line.trim().is_empty())
      .collect::<Vec<_>>()
      .join("\n");
    let expected: String = sources
      .iter()
      .rev()
      .flat_map(|(_, contents)| contents.lines())
      .filter(|line| !line.starts_with("import") && !line.trim().is_empty())
      .collect::<Vec<_>>()
      .join("\n");
    assert_eq!(bodies, expected);
  }
}
