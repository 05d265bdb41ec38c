mod compiler;
mod internal;
mod resolver;

pub use compiler::{
  backend_for, decode_bytecode, normalize, ArtifactWriter, CompilationInput, CompilationOutput,
  CompileRequest, CompileResponse, Compiler, CompilerBackend, CompilerDiagnostic,
  ContractArtifact, ContractDescriptor, NormalizedResult, PersistedArtifact, ResolcBackend,
  SolcBackend, SourceValue,
};
pub use internal::config::{
  parse_remappings, BackendKind, CompilerConfig, CompilerConfigBuilder, CompilerConfigOptions,
};
pub use internal::errors::{Error, ErrorKind, Result};
pub use internal::path::{canonicalize_path, canonicalize_with_base, PathResolver};
pub use resolver::{
  rewrite_specifiers, scan_imports, FsSourceLoader, ImportGraphResolver, ImportScan,
  ImportStatement, SourceLoader, SourceUnit,
};

pub use foundry_compilers::artifacts::remappings::Remapping;
