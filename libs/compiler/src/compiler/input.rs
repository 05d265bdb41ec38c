use std::path::PathBuf;

use crate::resolver::SourceUnit;

/// Normalised representation of what a caller asked to compile.
#[derive(Debug, Clone)]
pub enum CompilationInput {
  /// In-memory sources keyed by logical filename.
  SourceMap { sources: SourceUnit },
  /// A single entry file on durable storage; imports are discovered from it.
  FilePath { path: PathBuf },
}
