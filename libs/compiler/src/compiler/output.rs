use std::collections::BTreeMap;

use foundry_compilers::artifacts::error::Severity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::artifacts::ArtifactWriter;
use crate::internal::errors::Result;

// -----------------------------------------------------------------------------
// Raw backend output (standard-JSON shape)
// -----------------------------------------------------------------------------

/// Backend output as emitted by a standard-JSON compiler. Only the fields the pipeline reads are
/// typed; everything else is ignored during deserialisation.
///
/// `foundry_compilers::artifacts::CompilerOutput` is not used here because its `BytecodeObject`
/// re-encodes the object on the way through; bytecode must come back exactly as emitted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CompilationOutput {
  /// source file → contract name → descriptor
  #[serde(default)]
  pub contracts: BTreeMap<String, BTreeMap<String, ContractDescriptor>>,
  #[serde(default)]
  pub errors: Vec<CompilerDiagnostic>,
  #[serde(default)]
  pub sources: BTreeMap<String, Value>,
}

impl CompilationOutput {
  pub fn has_compiler_errors(&self) -> bool {
    self
      .errors
      .iter()
      .any(|diagnostic| diagnostic.severity == Severity::Error)
  }

  pub fn error_messages(&self) -> Vec<String> {
    self
      .errors
      .iter()
      .filter(|diagnostic| diagnostic.severity == Severity::Error)
      .map(CompilerDiagnostic::display_message)
      .collect()
  }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContractDescriptor {
  #[serde(default)]
  pub abi: Value,
  #[serde(default)]
  pub evm: Option<EvmOutput>,
}

impl ContractDescriptor {
  /// `evm.bytecode.object`, if present and non-empty.
  pub fn bytecode_object(&self) -> Option<&str> {
    self
      .evm
      .as_ref()
      .and_then(|evm| evm.bytecode.as_ref())
      .and_then(|bytecode| bytecode.object.as_deref())
      .filter(|object| !object.is_empty())
  }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EvmOutput {
  #[serde(default)]
  pub bytecode: Option<BytecodeOutput>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BytecodeOutput {
  #[serde(default)]
  pub object: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerDiagnostic {
  pub severity: Severity,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub formatted_message: Option<String>,
  #[serde(default, rename = "type")]
  pub error_type: Option<String>,
  #[serde(default)]
  pub component: Option<String>,
  #[serde(default)]
  pub source_location: Option<SourceLocation>,
}

impl CompilerDiagnostic {
  /// Prefer the compiler's own formatting; otherwise `<type>: <message>`.
  pub fn display_message(&self) -> String {
    if let Some(formatted) = self
      .formatted_message
      .as_deref()
      .map(str::trim)
      .filter(|formatted| !formatted.is_empty())
    {
      return formatted.to_string();
    }
    match self.error_type.as_deref() {
      Some(kind) => format!("{kind}: {}", self.message),
      None => self.message.clone(),
    }
  }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceLocation {
  pub file: String,
  pub start: i32,
  pub end: i32,
}

// -----------------------------------------------------------------------------
// Normalised result
// -----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractArtifact {
  pub abi: Value,
  /// Bytecode exactly as the backend emitted it; empty when the contract has none.
  pub bytecode: String,
}

/// The only structure returned across the request boundary on success.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedResult {
  pub contracts: BTreeMap<String, ContractArtifact>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub warnings: Vec<String>,
}

/// Reduce backend output to `{contract → abi + bytecode}` plus warnings, persisting artifacts
/// through `writer` when one is given.
///
/// Contract names are global: a name emitted by two source files keeps the later one. Persistence
/// errors abort; files written before the failure stay on disk.
pub fn normalize(
  output: &CompilationOutput,
  writer: Option<&ArtifactWriter>,
) -> Result<NormalizedResult> {
  let mut result = NormalizedResult::default();

  for diagnostic in &output.errors {
    result.warnings.push(diagnostic.display_message());
  }

  for (source_file, contracts) in &output.contracts {
    for (name, descriptor) in contracts {
      let bytecode = match descriptor.bytecode_object() {
        Some(object) => object.to_string(),
        None => {
          warn!(contract = %name, source_file = %source_file, "no bytecode emitted");
          result
            .warnings
            .push(format!("No bytecode found for contract: {name}"));
          String::new()
        }
      };

      let artifact = ContractArtifact {
        abi: descriptor.abi.clone(),
        bytecode,
      };
      if result.contracts.insert(name.clone(), artifact).is_some() {
        warn!(
          contract = %name,
          source_file = %source_file,
          "contract name emitted by more than one source file, keeping the later one"
        );
      }
    }
  }

  if let Some(writer) = writer {
    for (name, artifact) in &result.contracts {
      if artifact.bytecode.is_empty() {
        continue;
      }
      let persisted = writer.write(name, artifact)?;
      debug!(
        contract = %name,
        abi = %persisted.abi_path.display(),
        bytecode = %persisted.bytecode_path.display(),
        "persisted artifact"
      );
    }
  }

  Ok(result)
}
