use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::internal::config::DEFAULT_BYTECODE_EXTENSION;
use crate::internal::errors::{Error, Result};

use super::output::ContractArtifact;

/// Files written for one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedArtifact {
  pub abi_path: PathBuf,
  pub bytecode_path: PathBuf,
}

/// Writes `<dir>/<Contract>.json` (pretty ABI) and `<dir>/<Contract>.<ext>` (raw bytecode).
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
  dir: PathBuf,
  bytecode_extension: String,
}

impl ArtifactWriter {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self {
      dir: dir.into(),
      bytecode_extension: DEFAULT_BYTECODE_EXTENSION.to_string(),
    }
  }

  pub fn with_extension(mut self, extension: impl AsRef<str>) -> Self {
    self.bytecode_extension = extension.as_ref().trim_start_matches('.').to_string();
    self
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn write(&self, contract: &str, artifact: &ContractArtifact) -> Result<PersistedArtifact> {
    let bytecode = decode_bytecode(contract, &artifact.bytecode)?;
    create_dir_if_missing(&self.dir)?;

    let abi_path = self.dir.join(format!("{contract}.json"));
    let abi = serde_json::to_string_pretty(&artifact.abi)
      .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
      .map_err(|source| Error::Persistence {
        path: abi_path.clone(),
        source,
      })?;
    write_file(&abi_path, abi.as_bytes())?;

    let bytecode_path = self
      .dir
      .join(format!("{contract}.{}", self.bytecode_extension));
    write_file(&bytecode_path, &bytecode)?;

    Ok(PersistedArtifact {
      abi_path,
      bytecode_path,
    })
  }
}

/// Hex text (optionally `0x`-prefixed) to raw bytes.
pub fn decode_bytecode(contract: &str, bytecode: &str) -> Result<Vec<u8>> {
  let trimmed = bytecode.trim();
  let digits = trimmed
    .strip_prefix("0x")
    .or_else(|| trimmed.strip_prefix("0X"))
    .unwrap_or(trimmed);
  hex::decode(digits).map_err(|source| Error::InvalidBytecode {
    contract: contract.to_string(),
    source,
  })
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
  fs::write(path, contents).map_err(|source| Error::Persistence {
    path: path.to_path_buf(),
    source,
  })
}

fn create_dir_if_missing(path: &Path) -> Result<()> {
  fs::create_dir_all(path).map_err(|source| Error::Persistence {
    path: path.to_path_buf(),
    source,
  })
}
