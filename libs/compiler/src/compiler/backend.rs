use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use foundry_compilers::artifacts::{SolcInput, SolcLanguage, Settings, Source, Sources};
use semver::Version;
use serde_json::{json, Value};
use tracing::debug;

use super::output::CompilationOutput;
use crate::internal::config::{BackendKind, CompilerConfig};
use crate::internal::errors::{Error, Result};
use crate::internal::solc;
use crate::resolver::SourceUnit;

/// The external compiler capability. Implementations receive the flattened unit and return the
/// backend's standard-JSON output; source-level problems are diagnostics inside that output, not
/// errors.
pub trait CompilerBackend: Send + Sync {
  fn name(&self) -> &str;

  fn compile(&self, sources: &SourceUnit) -> Result<CompilationOutput>;
}

/// Build the backend selected by `config`.
pub fn backend_for(config: &CompilerConfig) -> Arc<dyn CompilerBackend> {
  match config.backend {
    BackendKind::Solc => Arc::new(SolcBackend::from_config(config)),
    BackendKind::Resolc => Arc::new(ResolcBackend::new(config.resolc_path.clone())),
  }
}

/// svm-managed `solc` driven through foundry-compilers.
#[derive(Debug, Clone)]
pub struct SolcBackend {
  version: Version,
  settings: Settings,
  auto_install: bool,
}

impl SolcBackend {
  pub fn new(version: Version, settings: Settings, auto_install: bool) -> Self {
    Self {
      version,
      settings,
      auto_install,
    }
  }

  pub fn from_config(config: &CompilerConfig) -> Self {
    Self::new(
      config.solc_version.clone(),
      config.solc_settings.clone(),
      config.auto_install_solc,
    )
  }
}

impl CompilerBackend for SolcBackend {
  fn name(&self) -> &str {
    "solc"
  }

  fn compile(&self, sources: &SourceUnit) -> Result<CompilationOutput> {
    let solc = solc::ensure_installed(&self.version, self.auto_install)?;
    let sources: Sources = sources
      .iter()
      .map(|(name, content)| (PathBuf::from(name), Source::new(content.as_str())))
      .collect();
    let mut input = SolcInput::new(SolcLanguage::Solidity, sources, self.settings.clone());
    input.sanitize(&solc.version);

    debug!(version = %solc.version, files = input.sources.len(), "invoking solc");
    solc
      .compile_as(&input)
      .map_err(|err| Error::Backend(format!("solc {} failed: {err}", solc.version)))
  }
}

/// Any binary speaking solc's standard-JSON protocol on stdin/stdout, `resolc` by default.
#[derive(Debug, Clone)]
pub struct ResolcBackend {
  binary: PathBuf,
  args: Vec<String>,
  settings: Value,
}

impl ResolcBackend {
  pub fn new(binary: impl Into<PathBuf>) -> Self {
    Self {
      binary: binary.into(),
      args: Vec::new(),
      settings: default_standard_json_settings(),
    }
  }

  /// Arguments placed before `--standard-json`, e.g. a script path when `binary` is an interpreter.
  pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
    self.args = args.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_settings(mut self, settings: Value) -> Self {
    self.settings = settings;
    self
  }

  pub fn standard_json_input(&self, sources: &SourceUnit) -> Value {
    let sources: serde_json::Map<String, Value> = sources
      .iter()
      .map(|(name, content)| (name.clone(), json!({ "content": content })))
      .collect();
    json!({
      "language": "Solidity",
      "sources": sources,
      "settings": self.settings,
    })
  }
}

fn default_standard_json_settings() -> Value {
  json!({
    "optimizer": { "enabled": true },
    "outputSelection": { "*": { "*": ["abi", "evm.bytecode"] } }
  })
}

impl CompilerBackend for ResolcBackend {
  fn name(&self) -> &str {
    "resolc"
  }

  fn compile(&self, sources: &SourceUnit) -> Result<CompilationOutput> {
    let binary = self.binary.display().to_string();
    let payload = serde_json::to_vec(&self.standard_json_input(sources))
      .map_err(|err| Error::Backend(format!("failed to encode compiler input: {err}")))?;

    let mut child = Command::new(&self.binary)
      .args(&self.args)
      .arg("--standard-json")
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|err| Error::BackendUnavailable(format!("failed to start {binary}: {err}")))?;

    debug!(binary = %binary, files = sources.len(), "invoking standard-json compiler");
    // stdin is written from its own thread; the child is always waited on
    let stdin = child.stdin.take();
    let writer = thread::spawn(move || match stdin {
      Some(mut stdin) => stdin.write_all(&payload),
      None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin was not captured")),
    });

    let output = child
      .wait_with_output()
      .map_err(|err| Error::Backend(format!("failed to wait for {binary}: {err}")))?;
    let written = writer
      .join()
      .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    match serde_json::from_slice::<CompilationOutput>(&output.stdout) {
      Ok(parsed) => Ok(parsed),
      Err(_) if !output.status.success() => Err(Error::Backend(format!(
        "{binary} exited with {}: {stderr}",
        output.status
      ))),
      Err(err) => match written {
        Err(write_err) => Err(Error::Backend(format!(
          "failed to send input to {binary}: {write_err}: {stderr}"
        ))),
        Ok(()) => Err(Error::Backend(format!(
          "{binary} produced unreadable output: {err}: {stderr}"
        ))),
      },
    }
  }
}
