pub mod artifacts;
pub mod cache;
pub mod compiler;
mod engine;
pub mod graph;
mod internal;
pub mod sources;

pub use cache::BuildManifest;
pub use compiler::{
  select_toolchain, CompilationUnit, CompilerRequest, CompilerResult, Diagnostic, FetchedSolc,
  LocalSolc, SeverityLevel, Toolchain,
};
pub use engine::{BuildReport, Solcpiler};
pub use graph::DependencyResolver;
pub use internal::config::{
  InputPatterns, SolcpilerConfig, SolcpilerConfigOptions, DEFAULT_CONFIG_FILE,
};
pub use internal::errors::{Error, Result};
pub use internal::settings::CompilerSettings;
pub use sources::{SourceRole, SourceStore, SourceUnit};
