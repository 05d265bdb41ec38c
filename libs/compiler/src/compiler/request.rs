use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::input::CompilationInput;
use super::output::NormalizedResult;
use crate::internal::errors::{Error, ErrorKind, Result};

/// Body of a compile request: exactly one of `sources` or `solidityFilePath`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileRequest {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sources: Option<BTreeMap<String, SourceValue>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub solidity_file_path: Option<PathBuf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output_dir: Option<PathBuf>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub save_files: Option<bool>,
}

/// A source entry may be plain text or the standard-JSON `{ "content": ... }` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceValue {
  Text(String),
  Object { content: String },
}

impl SourceValue {
  pub fn into_content(self) -> String {
    match self {
      SourceValue::Text(content) | SourceValue::Object { content } => content,
    }
  }
}

impl CompileRequest {
  pub fn from_sources(sources: impl IntoIterator<Item = (String, String)>) -> Self {
    Self {
      sources: Some(
        sources
          .into_iter()
          .map(|(name, content)| (name, SourceValue::Text(content)))
          .collect(),
      ),
      ..Default::default()
    }
  }

  pub fn from_file(path: impl Into<PathBuf>) -> Self {
    Self {
      solidity_file_path: Some(path.into()),
      ..Default::default()
    }
  }

  /// Validate the request and split it into the pipeline input plus the directory artifacts
  /// should be persisted to, if any.
  pub fn into_input(
    self,
    default_output_dir: Option<&Path>,
  ) -> Result<(CompilationInput, Option<PathBuf>)> {
    let persist = self.save_files.unwrap_or(self.output_dir.is_some());
    let output_dir = if persist {
      let dir = self
        .output_dir
        .or_else(|| default_output_dir.map(Path::to_path_buf))
        .ok_or_else(|| {
          Error::bad_request("saveFiles requires an outputDir (no default artifacts directory is configured)")
        })?;
      Some(dir)
    } else {
      None
    };

    let input = match (self.sources, self.solidity_file_path) {
      (Some(_), Some(_)) => {
        return Err(Error::bad_request(
          "Provide either sources or solidityFilePath, not both",
        ))
      }
      (None, None) => {
        return Err(Error::bad_request(
          "Either sources or solidityFilePath must be provided",
        ))
      }
      (Some(sources), None) => {
        if sources.is_empty() {
          return Err(Error::bad_request("sources must contain at least one file"));
        }
        CompilationInput::SourceMap {
          sources: sources
            .into_iter()
            .map(|(name, value)| (name, value.into_content()))
            .collect(),
        }
      }
      (None, Some(path)) => {
        if path.as_os_str().is_empty() {
          return Err(Error::bad_request("solidityFilePath must not be empty"));
        }
        CompilationInput::FilePath { path }
      }
    };

    Ok((input, output_dir))
  }
}

/// Uniform response shape: `{contracts, warnings?}` or `{error}`, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CompileResponse {
  Success(NormalizedResult),
  Failure {
    error: String,
    #[serde(skip)]
    kind: ErrorKind,
  },
}

impl CompileResponse {
  pub fn from_result(result: Result<NormalizedResult>) -> Self {
    match result {
      Ok(normalized) => CompileResponse::Success(normalized),
      Err(err) => CompileResponse::Failure {
        kind: err.kind(),
        error: err.to_string(),
      },
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, CompileResponse::Success(_))
  }

  pub fn error_kind(&self) -> Option<ErrorKind> {
    match self {
      CompileResponse::Success(_) => None,
      CompileResponse::Failure { kind, .. } => Some(*kind),
    }
  }
}
