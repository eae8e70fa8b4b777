use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::internal::errors::{map_err_with_context, Result};

/// Output fields that only matter for debugging and inflate artifacts considerably.
const DEBUG_ONLY_FIELDS: &[&str] = &["assembly", "legacyAssembly"];

// -----------------------------------------------------------------------------
// Diagnostics
// -----------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
  Error,
  Warning,
  Info,
}

impl SeverityLevel {
  fn from_label(label: &str) -> Self {
    match label.to_ascii_lowercase().as_str() {
      "error" => SeverityLevel::Error,
      "warning" => SeverityLevel::Warning,
      _ => SeverityLevel::Info,
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
  pub severity: SeverityLevel,
  pub message: String,
  pub formatted_message: Option<String>,
  #[serde(rename = "type")]
  pub kind: String,
}

impl Diagnostic {
  pub fn is_error(&self) -> bool {
    self.severity == SeverityLevel::Error
  }
}

impl fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.formatted_message {
      Some(formatted) => f.write_str(formatted.trim_end()),
      None => write!(f, "{}: {}", self.kind, self.message),
    }
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDiagnostic {
  #[serde(default)]
  severity: String,
  #[serde(default)]
  message: String,
  formatted_message: Option<String>,
  #[serde(default, rename = "type")]
  kind: String,
}

impl From<RawDiagnostic> for Diagnostic {
  fn from(raw: RawDiagnostic) -> Self {
    Diagnostic {
      severity: SeverityLevel::from_label(&raw.severity),
      message: raw.message,
      formatted_message: raw.formatted_message,
      kind: raw.kind,
    }
  }
}

// -----------------------------------------------------------------------------
// Contracts
// -----------------------------------------------------------------------------

/// Per-contract compiler output as solc returned it.
#[derive(Clone, Debug, PartialEq)]
pub struct ContractOutput {
  raw: Value,
}

impl ContractOutput {
  pub fn new(raw: Value) -> Self {
    Self { raw }
  }

  pub fn raw(&self) -> &Value {
    &self.raw
  }

  pub fn abi(&self) -> Value {
    self
      .raw
      .get("abi")
      .cloned()
      .unwrap_or_else(|| Value::Array(Vec::new()))
  }

  /// Creation bytecode, `0x` prefixed.
  pub fn bytecode(&self) -> String {
    self.hex_object("/evm/bytecode/object")
  }

  pub fn deployed_bytecode(&self) -> String {
    self.hex_object("/evm/deployedBytecode/object")
  }

  /// Raw output without debug-only assembly listings.
  pub fn stripped(&self) -> Value {
    let mut value = self.raw.clone();
    strip_debug_fields(&mut value);
    value
  }

  fn hex_object(&self, pointer: &str) -> String {
    let object = self
      .raw
      .pointer(pointer)
      .and_then(Value::as_str)
      .unwrap_or_default();
    if object.starts_with("0x") {
      object.to_string()
    } else {
      format!("0x{object}")
    }
  }
}

fn strip_debug_fields(contract: &mut Value) {
  if let Some(evm) = contract.get_mut("evm").and_then(Value::as_object_mut) {
    for field in DEBUG_ONLY_FIELDS {
      evm.remove(*field);
    }
  }
}

// -----------------------------------------------------------------------------
// Compiler result
// -----------------------------------------------------------------------------

/// Standard-json output normalised into diagnostics, contracts keyed by source name then contract
/// name, and the source index table.
#[derive(Clone, Debug, Default)]
pub struct CompilerResult {
  pub errors: Vec<Diagnostic>,
  pub contracts: BTreeMap<String, BTreeMap<String, ContractOutput>>,
  pub sources: BTreeMap<String, u32>,
  raw: Value,
}

impl CompilerResult {
  pub fn from_standard_json(raw: Value) -> Result<Self> {
    let errors: Vec<RawDiagnostic> = match raw.get("errors") {
      Some(errors) => map_err_with_context(
        serde_json::from_value(errors.clone()),
        "Failed to parse solc diagnostics",
      )?,
      None => Vec::new(),
    };

    let mut contracts = BTreeMap::new();
    if let Some(files) = raw.get("contracts").and_then(Value::as_object) {
      for (file, entries) in files {
        let Some(entries) = entries.as_object() else {
          continue;
        };
        let per_file: BTreeMap<String, ContractOutput> = entries
          .iter()
          .map(|(name, output)| (name.clone(), ContractOutput::new(output.clone())))
          .collect();
        contracts.insert(file.clone(), per_file);
      }
    }

    let mut sources = BTreeMap::new();
    if let Some(files) = raw.get("sources").and_then(Value::as_object) {
      for (file, entry) in files {
        if let Some(id) = entry.get("id").and_then(Value::as_u64) {
          sources.insert(file.clone(), id as u32);
        }
      }
    }

    Ok(CompilerResult {
      errors: errors.into_iter().map(Diagnostic::from).collect(),
      contracts,
      sources,
      raw,
    })
  }

  pub fn has_errors(&self) -> bool {
    self.errors.iter().any(Diagnostic::is_error)
  }

  pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
    self.errors.iter().filter(|diagnostic| !diagnostic.is_error())
  }

  pub fn contracts_in(&self, source: &str) -> impl Iterator<Item = (&str, &ContractOutput)> {
    self
      .contracts
      .get(source)
      .into_iter()
      .flat_map(|contracts| contracts.iter().map(|(name, output)| (name.as_str(), output)))
  }

  pub fn raw(&self) -> &Value {
    &self.raw
  }

  /// Full output with debug-only fields removed from every contract.
  pub fn stripped(&self) -> Value {
    let mut value = self.raw.clone();
    if let Some(files) = value.get_mut("contracts").and_then(Value::as_object_mut) {
      for entries in files.values_mut() {
        if let Some(entries) = entries.as_object_mut() {
          entries.values_mut().for_each(strip_debug_fields);
        }
      }
    }
    value
  }
}
