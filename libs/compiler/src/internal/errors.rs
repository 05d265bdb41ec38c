use std::fmt::Display;
use std::io;
use std::path::PathBuf;

/// Canonical error type used by every pipeline stage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// A canonical path requested from storage does not exist.
  #[error("Source file not found: {}", path.display())]
  NotFound { path: PathBuf },

  #[error("Failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// The compiler backend could not be located or initialised.
  #[error("Compiler backend unavailable: {0}")]
  BackendUnavailable(String),

  /// The backend ran but did not produce a usable output document.
  #[error("Compiler backend failed: {0}")]
  Backend(String),

  /// Source code was rejected by the compiler (error-severity diagnostics).
  #[error("Compilation failed:\n{}", messages.join("\n"))]
  CompilerErrors { messages: Vec<String> },

  #[error("Failed to persist artifact {}: {source}", path.display())]
  Persistence {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("Invalid bytecode for contract {contract}: {source}")]
  InvalidBytecode {
    contract: String,
    #[source]
    source: hex::FromHexError,
  },

  #[error("{0}")]
  BadRequest(String),

  #[error("Invalid configuration: {0}")]
  Config(String),
}

/// Coarse classification of [`Error`], used by the request boundary to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  BadRequest,
  NotFound,
  CompilerErrors,
  BackendUnavailable,
  Internal,
}

impl Error {
  pub fn bad_request(message: impl Into<String>) -> Self {
    Error::BadRequest(message.into())
  }

  pub fn with_context(context: impl AsRef<str>, cause: impl Display) -> Self {
    let mut message = context.as_ref().to_owned();
    if !message.ends_with(':') {
      message.push(':');
    }
    message.push(' ');
    message.push_str(&cause.to_string());
    Error::Config(message)
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::BadRequest(_) => ErrorKind::BadRequest,
      Error::NotFound { .. } => ErrorKind::NotFound,
      Error::CompilerErrors { .. } => ErrorKind::CompilerErrors,
      Error::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
      Error::Io { .. }
      | Error::Backend(_)
      | Error::Persistence { .. }
      | Error::InvalidBytecode { .. }
      | Error::Config(_) => ErrorKind::Internal,
    }
  }
}

/// Result alias bound to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Annotate an error from `result` with `context`, returning the shared [`Result`] type.
pub fn map_err_with_context<T, E>(
  result: std::result::Result<T, E>,
  context: impl AsRef<str>,
) -> Result<T>
where
  E: Display,
{
  result.map_err(|err| Error::with_context(context, err))
}
