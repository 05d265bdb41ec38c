use std::sync::{Mutex, OnceLock};

use foundry_compilers::solc::Solc;
use semver::Version;
use tracing::info;

use super::errors::{map_err_with_context, Error, Result};

pub(crate) const DEFAULT_SOLC_VERSION: &str = "0.8.30";

pub(crate) fn parse_version(version: &str) -> Result<Version> {
  let trimmed = version.trim().trim_start_matches('v');
  map_err_with_context(Version::parse(trimmed), "Failed to parse solc version")
}

pub(crate) fn default_version() -> Version {
  parse_version(DEFAULT_SOLC_VERSION).unwrap_or_else(|_| Version::new(0, 8, 30))
}

/// Locate an svm-managed solc binary, installing it first when `auto_install` is set.
pub(crate) fn ensure_installed(version: &Version, auto_install: bool) -> Result<Solc> {
  if let Some(solc) = find_installed_version(version)? {
    return Ok(solc);
  }
  if !auto_install {
    return Err(Error::BackendUnavailable(format!(
      "solc {version} is not installed and automatic installation is disabled"
    )));
  }
  install_version(version)
}

pub(crate) fn find_installed_version(version: &Version) -> Result<Option<Solc>> {
  Solc::find_svm_installed_version(version)
    .map_err(|err| Error::BackendUnavailable(format!("failed to inspect solc versions: {err}")))
}

fn install_mutex() -> &'static Mutex<()> {
  static INSTALL_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
  INSTALL_MUTEX.get_or_init(|| Mutex::new(()))
}

fn install_version(version: &Version) -> Result<Solc> {
  let _guard = install_mutex()
    .lock()
    .map_err(|err| Error::BackendUnavailable(format!("solc install mutex poisoned: {err}")))?;

  // another request may have finished the download while we waited
  if let Some(solc) = find_installed_version(version)? {
    return Ok(solc);
  }
  info!(%version, "installing solc");
  Solc::blocking_install(version)
    .map_err(|err| Error::BackendUnavailable(format!("failed to install solc {version}: {err}")))
}
