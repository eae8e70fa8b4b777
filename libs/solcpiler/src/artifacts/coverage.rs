use serde_json::{json, Map, Value};

use super::ArtifactWriter;
use crate::compiler::CompilationUnit;
use crate::internal::errors::Result;
use crate::internal::path::{display_key, slash_path};

/// One JSON document per contract defined in the primary file of `unit`, keyed by contract name.
///
/// `sources` maps every logical name of the batch to its sourcemap index and on-disk file, and
/// `sourceCodes` carries the text that was compiled, so sourcemaps resolve without re-reading
/// files that may have changed since.
pub fn contract_artifacts(
  writer: &ArtifactWriter<'_>,
  unit: &CompilationUnit,
) -> Result<Vec<(String, Value)>> {
  let Some(primary_name) = writer.names.name_of(&unit.primary) else {
    return Ok(Vec::new());
  };

  let mut sources = Map::new();
  let mut source_codes = Map::new();
  for (position, name) in writer.request.sources.keys().enumerate() {
    let id = writer
      .result
      .sources
      .get(name)
      .copied()
      .unwrap_or(position as u32);
    let file = writer.names.path_of(name);
    sources.insert(
      name.clone(),
      json!({
        "id": id,
        "file": file.map(slash_path).unwrap_or_else(|| name.clone()),
      }),
    );
    if let Some(source) = file.and_then(|path| writer.store.get(path)) {
      source_codes.insert(name.clone(), Value::String(source.content().to_string()));
    }
  }

  let compiler = json!({
    "name": writer.toolchain_name,
    "hash": writer.store.unit(&unit.primary)?.content_hash(),
    "version": writer.toolchain_version,
    "settings": writer.request.settings,
  });
  let file_path = display_key(writer.store.base_dir(), &unit.primary);

  Ok(
    writer
      .result
      .contracts_in(primary_name)
      .map(|(contract, output)| {
        let artifact = json!({
          "contractName": contract,
          "filePath": file_path,
          "compilerOutput": output.stripped(),
          "sources": sources,
          "sourceCodes": source_codes,
          "compiler": compiler,
        });
        (contract.to_string(), artifact)
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;
  use std::fs;

  use crate::compiler::{CompilerResult, RequestBuilder};
  use crate::graph::DependencyResolver;
  use crate::internal::config::SolcpilerConfig;
  use crate::sources::SourceStore;

  #[test]
  fn artifacts_carry_sources_for_sourcemaps() {
    let temp = tempfile::tempdir().unwrap();
    let base = fs::canonicalize(temp.path()).unwrap();
    fs::create_dir_all(base.join("contracts")).unwrap();
    let a = base.join("contracts/A.sol");
    fs::write(&a, "import \"Lib.sol\";\ncontract A {}\ncontract AHelper {}").unwrap();
    fs::write(base.join("contracts/Lib.sol"), "library Lib {}").unwrap();

    let config = SolcpilerConfig::with_base_dir(&base);
    let mut store = SourceStore::new(&base, BTreeMap::new());
    let mut resolver = DependencyResolver::new();
    store.load_primary(&a).unwrap();
    let closure = resolver.closure(&mut store, &a).unwrap();
    let unit = CompilationUnit {
      primary: a.clone(),
      closure,
    };
    let mut builder = RequestBuilder::new(&store, &resolver, config.settings.clone());
    builder.add_unit(unit.clone());
    let (request, names) = builder.build().unwrap();

    let a_name = slash_path(&a);
    let result = CompilerResult::from_standard_json(json!({
      "contracts": {
        a_name.clone(): {
          "A": { "abi": [], "evm": { "bytecode": { "object": "00", "sourceMap": "0:1:1" }, "assembly": "x" } },
          "AHelper": { "abi": [], "evm": { "bytecode": { "object": "01" } } }
        },
        "Lib.sol": { "Lib": { "abi": [] } }
      },
      "sources": { "Lib.sol": { "id": 0 }, a_name.clone(): { "id": 1 } }
    }))
    .unwrap();

    let writer = ArtifactWriter {
      config: &config,
      store: &store,
      names: &names,
      request: &request,
      result: &result,
      toolchain_name: "solc",
      toolchain_version: "0.8.30",
    };
    let artifacts = contract_artifacts(&writer, &unit).unwrap();
    let contracts: Vec<_> = artifacts.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(contracts, vec!["A", "AHelper"]);

    let artifact = &artifacts[0].1;
    assert_eq!(artifact["contractName"], "A");
    assert_eq!(artifact["filePath"], "contracts/A.sol");
    assert_eq!(artifact["compilerOutput"]["evm"]["bytecode"]["sourceMap"], "0:1:1");
    assert!(artifact["compilerOutput"]["evm"].get("assembly").is_none());
    assert_eq!(artifact["sources"]["Lib.sol"]["id"], 0);
    assert_eq!(
      artifact["sources"]["Lib.sol"]["file"],
      slash_path(&base.join("contracts/Lib.sol"))
    );
    assert_eq!(artifact["sourceCodes"]["Lib.sol"], "library Lib {}");
    assert_eq!(artifact["compiler"]["name"], "solc");
    assert_eq!(artifact["compiler"]["version"], "0.8.30");
    assert_eq!(
      artifact["compiler"]["hash"],
      store.get(&a).unwrap().content_hash()
    );
    assert_eq!(artifact["compiler"]["settings"]["optimizer"]["enabled"], true);
  }
}
