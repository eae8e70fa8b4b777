//! Standard-json requests, the compilers that answer them, and their normalised output.

pub mod input;
pub mod output;
pub mod toolchain;

pub use input::{CompilationUnit, CompilerRequest, RequestBuilder, SourceEntry, SourceNames};
pub use output::{CompilerResult, ContractOutput, Diagnostic, SeverityLevel};
pub use toolchain::{select_toolchain, FetchedSolc, LocalSolc, Toolchain};
