use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{Error, Result};

/// Outputs requested for every contract. Sourcemaps ride along with the bytecode objects.
pub const CONTRACT_OUTPUTS: &[&str] = &[
  "abi",
  "evm.bytecode.object",
  "evm.bytecode.sourceMap",
  "evm.deployedBytecode.object",
  "evm.deployedBytecode.sourceMap",
  "evm.methodIdentifiers",
  "metadata",
];

pub const DEFAULT_OPTIMIZER_RUNS: u32 = 200;

/// Settings block of the standard-json request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerSettings {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub remappings: Vec<String>,
  pub optimizer: OptimizerSettings,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub evm_version: Option<String>,
  pub output_selection: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerSettings {
  pub enabled: bool,
  pub runs: u32,
}

impl Default for OptimizerSettings {
  fn default() -> Self {
    Self {
      enabled: true,
      runs: DEFAULT_OPTIMIZER_RUNS,
    }
  }
}

impl Default for CompilerSettings {
  fn default() -> Self {
    let outputs = CONTRACT_OUTPUTS
      .iter()
      .map(|output| output.to_string())
      .collect();
    let mut per_contract = BTreeMap::new();
    per_contract.insert("*".to_string(), outputs);
    let mut output_selection = BTreeMap::new();
    output_selection.insert("*".to_string(), per_contract);

    Self {
      remappings: Vec::new(),
      optimizer: OptimizerSettings::default(),
      evm_version: None,
      output_selection,
    }
  }
}

impl CompilerSettings {
  /// Overlay user supplied JSON onto these settings. Objects merge key by key, every other value
  /// replaces its counterpart.
  pub fn overlay(&self, overrides: Option<&Value>) -> Result<Self> {
    let Some(overrides) = overrides else {
      return Ok(self.clone());
    };
    let mut base = serde_json::to_value(self)
      .map_err(|err| Error::config(format!("Failed to serialise compiler settings: {err}")))?;
    merge_settings_json(&mut base, overrides.clone());
    let merged: CompilerSettings = serde_json::from_value(base)
      .map_err(|err| Error::config(format!("Failed to parse compiler settings: {err}")))?;
    Ok(merged.sanitized())
  }

  pub fn with_remappings(mut self, remappings: Vec<String>) -> Self {
    self.remappings = remappings;
    self
  }

  fn sanitized(mut self) -> Self {
    if output_selection_is_effectively_empty(&self.output_selection) {
      self.output_selection = CompilerSettings::default().output_selection;
    }
    self
  }
}

pub(crate) fn merge_settings_json(base: &mut Value, overrides: Value) {
  match (base, overrides) {
    (Value::Object(base_map), Value::Object(overrides_map)) => {
      for (key, value) in overrides_map {
        match base_map.get_mut(&key) {
          Some(existing) => merge_settings_json(existing, value),
          None => {
            base_map.insert(key, value);
          }
        }
      }
    }
    (target, value) => {
      *target = value;
    }
  }
}

pub fn output_selection_is_effectively_empty(
  selection: &BTreeMap<String, BTreeMap<String, Vec<String>>>,
) -> bool {
  if selection.is_empty() {
    return true;
  }

  selection.values().all(|contracts| {
    contracts
      .values()
      .all(|outputs| outputs.iter().all(|output| output.trim().is_empty()))
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn defaults_enable_optimizer_with_200_runs() {
    let settings = CompilerSettings::default();
    assert!(settings.optimizer.enabled);
    assert_eq!(settings.optimizer.runs, 200);
    let outputs = &settings.output_selection["*"]["*"];
    assert!(outputs.contains(&"abi".to_string()));
    assert!(outputs.contains(&"evm.deployedBytecode.sourceMap".to_string()));
  }

  #[test]
  fn overlay_preserves_base_when_no_overrides() {
    let base = CompilerSettings::default();
    assert_eq!(base.overlay(None).expect("overlay"), base);
  }

  #[test]
  fn overlay_applies_nested_overrides() {
    let base = CompilerSettings::default();
    let merged = base
      .overlay(Some(&json!({ "optimizer": { "runs": 1000 }, "evmVersion": "paris" })))
      .expect("overlay");
    assert!(merged.optimizer.enabled);
    assert_eq!(merged.optimizer.runs, 1000);
    assert_eq!(merged.evm_version.as_deref(), Some("paris"));
  }

  #[test]
  fn overlay_restores_default_output_selection() {
    let base = CompilerSettings::default();
    let merged = base
      .overlay(Some(&json!({ "outputSelection": { "*": { "*": [""] } } })))
      .expect("overlay");
    assert!(!output_selection_is_effectively_empty(&merged.output_selection));
  }

  #[test]
  fn serialises_remappings_only_when_present() {
    let plain = serde_json::to_value(CompilerSettings::default()).unwrap();
    assert!(plain.get("remappings").is_none());

    let remapped = CompilerSettings::default().with_remappings(vec!["a.sol=/abs/a.sol".into()]);
    let value = serde_json::to_value(remapped).unwrap();
    assert_eq!(value["remappings"], json!(["a.sol=/abs/a.sol"]));
  }
}
