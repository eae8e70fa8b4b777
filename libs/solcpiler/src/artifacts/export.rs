use serde_json::Value;

use crate::cache::{hash_export_name, VERSION_EXPORT};
use crate::compiler::{CompilationUnit, CompilerResult, SourceNames};
use crate::internal::errors::Result;
use crate::internal::path::display_key;
use crate::sources::SourceStore;

pub const EXPORT_HEADER: &str = "/* This is an autogenerated file. DO NOT EDIT MANUALLY */";

/// Render the `<name>.sol.js` module of `unit`.
///
/// Files are visited dependencies first. Each contributes its contracts' ABI and bytecode exports
/// followed by its content hash, and the module closes with the compiler release. The hash and
/// release lines are what [`crate::cache::BuildManifest`] reads back.
pub fn render_export_module(
  store: &SourceStore,
  names: &SourceNames,
  result: &CompilerResult,
  unit: &CompilationUnit,
  toolchain_version: &str,
) -> Result<String> {
  let mut lines = Vec::new();
  for path in unit.files() {
    if let Some(name) = names.name_of(path) {
      for (contract, output) in result.contracts_in(name) {
        lines.push(format!("exports.{contract}Abi = {};", output.abi()));
        lines.push(format!(
          "exports.{contract}ByteCode = {};",
          quoted(&output.bytecode())
        ));
        lines.push(format!(
          "exports.{contract}RuntimeByteCode = {};",
          quoted(&output.deployed_bytecode())
        ));
      }
    }

    let unit_hash = store.unit(path)?.content_hash();
    let key = display_key(store.base_dir(), path);
    lines.push(format!(
      "exports[{}] = {};",
      quoted(&hash_export_name(&key)),
      quoted(unit_hash)
    ));
  }
  lines.push(format!(
    "exports.{VERSION_EXPORT} = {};",
    quoted(toolchain_version)
  ));
  Ok(format!("{EXPORT_HEADER}\n\n{}\n", lines.join("\n")))
}

fn quoted(text: &str) -> String {
  Value::String(text.to_string()).to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;
  use std::fs;

  use serde_json::json;

  use crate::cache::{current_hashes, BuildManifest};
  use crate::compiler::RequestBuilder;
  use crate::graph::DependencyResolver;
  use crate::internal::path::slash_path;
  use crate::internal::settings::CompilerSettings;

  #[test]
  fn module_exports_contracts_hashes_and_version() {
    let temp = tempfile::tempdir().unwrap();
    let base = fs::canonicalize(temp.path()).unwrap();
    fs::create_dir_all(base.join("contracts")).unwrap();
    let a = base.join("contracts/A.sol");
    let b = base.join("contracts/B.sol");
    fs::write(&a, "import \"./B.sol\";\ncontract A {}").unwrap();
    fs::write(&b, "contract B {}").unwrap();

    let mut store = SourceStore::new(&base, BTreeMap::new());
    let mut resolver = DependencyResolver::new();
    store.load_primary(&a).unwrap();
    let closure = resolver.closure(&mut store, &a).unwrap();
    let unit = CompilationUnit {
      primary: a.clone(),
      closure: closure.clone(),
    };
    let mut builder = RequestBuilder::new(&store, &resolver, CompilerSettings::default());
    builder.add_unit(unit.clone());
    let (_, names) = builder.build().unwrap();

    let contract = |object: &str| {
      json!({
        "abi": [],
        "evm": { "bytecode": { "object": object }, "deployedBytecode": { "object": object } }
      })
    };
    let result = CompilerResult::from_standard_json(json!({
      "contracts": {
        slash_path(&a): { "A": contract("aa") },
        slash_path(&b): { "B": contract("bb") }
      }
    }))
    .unwrap();

    let module = render_export_module(&store, &names, &result, &unit, "0.8.30").unwrap();
    assert!(module.starts_with(EXPORT_HEADER));
    assert!(module.contains("exports.AAbi = [];"));
    assert!(module.contains("exports.BByteCode = \"0xbb\";"));
    assert!(module.contains("exports.ARuntimeByteCode = \"0xaa\";"));
    assert!(module.find("exports.BAbi").unwrap() < module.find("exports.AAbi").unwrap());
    assert!(module.trim_end().ends_with("exports._solcVersion = \"0.8.30\";"));

    let manifest = BuildManifest::parse(&module);
    assert_eq!(manifest.hashes, current_hashes(&store, &a, &closure).unwrap());
    assert_eq!(manifest.toolchain_version.as_deref(), Some("0.8.30"));
  }
}
