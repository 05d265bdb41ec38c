use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::internal::config::{CompilerConfig, CompilerConfigOptions};
use crate::internal::errors::{Error, Result};
use crate::internal::path::{canonicalize_with_base, PathResolver};
use crate::resolver::{FsSourceLoader, ImportGraphResolver, SourceLoader, SourceUnit};
pub use artifacts::{decode_bytecode, ArtifactWriter, PersistedArtifact};
pub use backend::{backend_for, CompilerBackend, ResolcBackend, SolcBackend};
pub use input::CompilationInput;
pub use output::{
  normalize, CompilationOutput, CompilerDiagnostic, ContractArtifact, ContractDescriptor,
  NormalizedResult,
};
pub use request::{CompileRequest, CompileResponse, SourceValue};

mod artifacts;
mod backend;
mod input;
pub mod output;
mod request;

/// Compilation pipeline façade: resolve and flatten sources, hand them to the configured backend,
/// then normalise (and optionally persist) the result. The instance holds no per-request state, so a
/// single value can serve concurrent requests.
#[derive(Clone)]
pub struct Compiler {
  config: CompilerConfig,
  paths: PathResolver,
  loader: Arc<dyn SourceLoader>,
  backend: Arc<dyn CompilerBackend>,
}

impl Compiler {
  /// Create a compiler using the provided options merged on top of the defaults, with the backend
  /// selected by the resulting configuration.
  pub fn new(options: Option<CompilerConfigOptions>) -> Result<Self> {
    let config = CompilerConfig::from_options(options)?;
    Ok(Self::from_config(config))
  }

  pub fn from_config(config: CompilerConfig) -> Self {
    let backend = backend_for(&config);
    Self::with_backend(config, backend)
  }

  /// Use an explicit backend instead of the one the configuration names.
  pub fn with_backend(config: CompilerConfig, backend: Arc<dyn CompilerBackend>) -> Self {
    let paths = PathResolver::new(&config.root, config.remappings.clone());
    Self {
      config,
      paths,
      loader: Arc::new(FsSourceLoader),
      backend,
    }
  }

  pub fn with_loader(mut self, loader: Arc<dyn SourceLoader>) -> Self {
    self.loader = loader;
    self
  }

  pub fn config(&self) -> &CompilerConfig {
    &self.config
  }

  pub fn paths(&self) -> &PathResolver {
    &self.paths
  }

  pub fn backend_name(&self) -> &str {
    self.backend.name()
  }

  /// Flatten an in-memory unit. `origin` is the canonical location the entry keys are relative to.
  pub fn flatten(&self, sources: SourceUnit, origin: Option<&Path>) -> Result<SourceUnit> {
    ImportGraphResolver::new(&self.paths, self.loader.as_ref()).flatten(sources, origin)
  }

  /// Flatten and compile in-memory sources without normalising the output.
  pub fn compile_sources(&self, sources: SourceUnit) -> Result<CompilationOutput> {
    let flattened = self.flatten(sources, None)?;
    self.invoke(&flattened)
  }

  /// Load the file at `path` (relative to the working root unless absolute), flatten its imports
  /// and compile.
  pub fn compile_file(&self, path: &Path) -> Result<CompilationOutput> {
    let (unit, origin) = self.load_entry(path)?;
    let flattened = self.flatten(unit, Some(&origin))?;
    self.invoke(&flattened)
  }

  /// Run the full pipeline. When `persist_dir` is set, every contract with bytecode is written
  /// there before returning.
  pub fn compile(
    &self,
    input: CompilationInput,
    persist_dir: Option<&Path>,
  ) -> Result<NormalizedResult> {
    let output = match input {
      CompilationInput::SourceMap { sources } => self.compile_sources(sources)?,
      CompilationInput::FilePath { path } => self.compile_file(&path)?,
    };

    if self.config.fail_on_compiler_errors && output.has_compiler_errors() {
      let messages = output.error_messages();
      warn!(errors = messages.len(), "compiler rejected sources");
      return Err(Error::CompilerErrors { messages });
    }

    let writer = persist_dir.map(|dir| {
      ArtifactWriter::new(canonicalize_with_base(&self.config.root, dir))
        .with_extension(&self.config.bytecode_extension)
    });
    let result = normalize(&output, writer.as_ref())?;
    info!(
      backend = self.backend.name(),
      contracts = result.contracts.len(),
      warnings = result.warnings.len(),
      persisted_to = writer.as_ref().map(|writer| writer.dir().display().to_string()),
      "compilation finished"
    );
    Ok(result)
  }

  /// Validate a request, run it, and fold any failure into the `{error}` response shape.
  pub fn handle(&self, request: CompileRequest) -> CompileResponse {
    let result = request
      .into_input(self.config.artifacts_dir.as_deref())
      .and_then(|(input, persist_dir)| self.compile(input, persist_dir.as_deref()));
    if let Err(err) = &result {
      warn!(error = %err, kind = ?err.kind(), "compile request failed");
    }
    CompileResponse::from_result(result)
  }

  /// Compile the configured default entry file without persisting anything.
  pub fn handle_default(&self) -> CompileResponse {
    self.handle(CompileRequest::from_file(self.config.default_entry.clone()))
  }

  fn load_entry(&self, path: &Path) -> Result<(SourceUnit, PathBuf)> {
    let canonical = canonicalize_with_base(&self.config.root, path);
    let content = self.loader.load(&canonical)?;
    let name = canonical
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .ok_or_else(|| Error::bad_request(format!("Not a file path: {}", path.display())))?;
    Ok((SourceUnit::from([(name, content)]), canonical))
  }

  fn invoke(&self, sources: &SourceUnit) -> Result<CompilationOutput> {
    info!(
      backend = self.backend.name(),
      files = sources.len(),
      "compiling flattened sources"
    );
    self.backend.compile(sources)
  }
}
