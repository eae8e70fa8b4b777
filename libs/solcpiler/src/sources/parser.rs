//! Lightweight text-level parsing of Solidity sources.
//!
//! Imports and constant declarations are recognised with regular expressions rather than a real
//! lexer. Callers only go through these functions, so the matching can be replaced without
//! touching the resolver or the loader.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

/// `import "x";`, `import "x" as X;`, `import * as X from "x";`, `import {A, B as C} from "x";`
static IMPORT_PATTERN: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#"(?m)^[ \t]*import\s*(?:[^;"']*?\s*from\s*)?(?:"([^"]*)"|'([^']*)')[^;]*;"#)
    .expect("import pattern is valid")
});

/// Every import reference in `source`, in textual order.
pub fn extract_imports(source: &str) -> Vec<String> {
  IMPORT_PATTERN
    .captures_iter(source)
    .filter_map(|captures| captures.get(1).or_else(|| captures.get(2)))
    .map(|reference| reference.as_str().to_string())
    .collect()
}

/// `source` with every import statement removed.
pub fn strip_imports(source: &str) -> String {
  IMPORT_PATTERN.replace_all(source, "").into_owned()
}

/// Rewrite `constant <name> = <value>;` declarations for every `name` in `constants`. The value
/// ends at the first `;` on the line.
pub fn substitute_constants(source: &str, constants: &BTreeMap<String, String>) -> String {
  let mut output = source.to_string();
  for (name, value) in constants {
    let pattern = format!(r"constant {} = [^;\n]*;", regex::escape(name));
    let Ok(rule) = Regex::new(&pattern) else {
      continue;
    };
    let replacement = format!("constant {name} = {value};");
    output = rule
      .replace_all(&output, NoExpand(&replacement))
      .into_owned();
  }
  output
}
