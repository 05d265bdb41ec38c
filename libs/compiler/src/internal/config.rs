use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use foundry_compilers::artifacts::{remappings::Remapping, Settings};
use semver::Version;

use super::errors::{map_err_with_context, Error, Result};
use super::path::canonicalize_path;
use super::solc;

pub(crate) const DEFAULT_RESOLC_BINARY: &str = "resolc";
pub(crate) const DEFAULT_BYTECODE_EXTENSION: &str = "polkavm";
pub(crate) const DEFAULT_ENTRY: &str = "contracts/Storage.sol";
pub(crate) const REMAPPINGS_FILE: &str = "remappings.txt";

/// Which compiler capability the pipeline hands flattened sources to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
  /// svm-managed `solc`, EVM bytecode.
  Solc,
  /// A `resolc`-compatible standard-JSON binary, PolkaVM bytecode.
  #[default]
  Resolc,
}

impl FromStr for BackendKind {
  type Err = Error;

  fn from_str(value: &str) -> Result<Self> {
    match value.trim().to_ascii_lowercase().as_str() {
      "solc" => Ok(BackendKind::Solc),
      "resolc" => Ok(BackendKind::Resolc),
      other => Err(Error::Config(format!(
        "Unsupported compiler backend '{other}' (expected 'solc' or 'resolc')"
      ))),
    }
  }
}

impl fmt::Display for BackendKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BackendKind::Solc => f.write_str("solc"),
      BackendKind::Resolc => f.write_str("resolc"),
    }
  }
}

/// Finalised pipeline configuration. Constructed once at startup and passed into the
/// [`Compiler`](crate::Compiler); nothing reads configuration from ambient state.
#[derive(Clone, Debug)]
pub struct CompilerConfig {
  pub root: PathBuf,
  pub remappings: Vec<Remapping>,
  pub backend: BackendKind,
  pub solc_version: Version,
  pub solc_settings: Settings,
  pub auto_install_solc: bool,
  pub resolc_path: PathBuf,
  pub artifacts_dir: Option<PathBuf>,
  pub bytecode_extension: String,
  pub default_entry: PathBuf,
  pub fail_on_compiler_errors: bool,
}

impl Default for CompilerConfig {
  fn default() -> Self {
    CompilerConfig {
      root: canonicalize_path(Path::new(".")),
      remappings: Vec::new(),
      backend: BackendKind::default(),
      solc_version: solc::default_version(),
      solc_settings: Settings::default(),
      auto_install_solc: false,
      resolc_path: PathBuf::from(DEFAULT_RESOLC_BINARY),
      artifacts_dir: None,
      bytecode_extension: DEFAULT_BYTECODE_EXTENSION.to_string(),
      default_entry: PathBuf::from(DEFAULT_ENTRY),
      fail_on_compiler_errors: true,
    }
  }
}

impl CompilerConfig {
  pub fn merged(&self, overrides: &CompilerConfigOptions) -> Result<Self> {
    CompilerConfigBuilder::with_base(self.clone())
      .apply_options(overrides.clone())?
      .build()
  }

  pub fn from_options(options: Option<CompilerConfigOptions>) -> Result<Self> {
    let mut builder = CompilerConfigBuilder::from_defaults();
    if let Some(overrides) = options {
      builder = builder.apply_options(overrides)?;
    }
    builder.build()
  }

  /// Read a foundry-style `remappings.txt` from `root`. Blank lines and `#` comments are skipped;
  /// a missing file yields no remappings.
  pub fn load_remappings_file(root: &Path) -> Result<Vec<Remapping>> {
    let path = root.join(REMAPPINGS_FILE);
    if !path.is_file() {
      return Ok(Vec::new());
    }
    let contents = std::fs::read_to_string(&path).map_err(|source| Error::Io {
      path: path.clone(),
      source,
    })?;
    parse_remappings(contents.lines())
  }
}

/// Parse `[context:]prefix=target` entries.
pub fn parse_remappings<'a>(entries: impl IntoIterator<Item = &'a str>) -> Result<Vec<Remapping>> {
  entries
    .into_iter()
    .map(str::trim)
    .filter(|line| !line.is_empty() && !line.starts_with('#'))
    .map(|line| map_err_with_context(Remapping::from_str(line), format!("Invalid remapping '{line}'")))
    .collect()
}

/// Optional overrides merged on top of a base [`CompilerConfig`].
#[derive(Clone, Debug, Default)]
pub struct CompilerConfigOptions {
  pub root: Option<PathBuf>,
  pub remappings: Option<Vec<Remapping>>,
  pub backend: Option<BackendKind>,
  pub solc_version: Option<String>,
  pub solc_settings: Option<Settings>,
  pub auto_install_solc: Option<bool>,
  pub resolc_path: Option<PathBuf>,
  pub artifacts_dir: Option<Option<PathBuf>>,
  pub bytecode_extension: Option<String>,
  pub default_entry: Option<PathBuf>,
  pub fail_on_compiler_errors: Option<bool>,
  /// Merge `remappings.txt` from the resolved root below the explicit remappings.
  pub use_remappings_file: bool,
}

pub struct CompilerConfigBuilder {
  config: CompilerConfig,
  use_remappings_file: bool,
}

impl CompilerConfigBuilder {
  pub fn from_defaults() -> Self {
    Self::with_base(CompilerConfig::default())
  }

  pub fn with_base(config: CompilerConfig) -> Self {
    Self {
      config,
      use_remappings_file: false,
    }
  }

  pub fn apply_options(mut self, options: CompilerConfigOptions) -> Result<Self> {
    let config = &mut self.config;
    if let Some(root) = options.root {
      config.root = canonicalize_path(&root);
    }
    if let Some(remappings) = options.remappings {
      config.remappings = remappings;
    }
    if let Some(backend) = options.backend {
      config.backend = backend;
    }
    if let Some(version) = options.solc_version.as_deref() {
      config.solc_version = solc::parse_version(version)?;
    }
    if let Some(settings) = options.solc_settings {
      config.solc_settings = settings;
    }
    if let Some(auto_install) = options.auto_install_solc {
      config.auto_install_solc = auto_install;
    }
    if let Some(resolc_path) = options.resolc_path {
      config.resolc_path = resolc_path;
    }
    if let Some(artifacts_dir) = options.artifacts_dir {
      config.artifacts_dir = artifacts_dir;
    }
    if let Some(extension) = options.bytecode_extension {
      config.bytecode_extension = extension;
    }
    if let Some(entry) = options.default_entry {
      config.default_entry = entry;
    }
    if let Some(fail) = options.fail_on_compiler_errors {
      config.fail_on_compiler_errors = fail;
    }
    self.use_remappings_file |= options.use_remappings_file;
    Ok(self)
  }

  pub fn build(self) -> Result<CompilerConfig> {
    let mut config = self.config;
    if self.use_remappings_file {
      let from_file = CompilerConfig::load_remappings_file(&config.root)?;
      for remapping in from_file {
        if !config.remappings.iter().any(|existing| existing.name == remapping.name) {
          config.remappings.push(remapping);
        }
      }
    }

    let extension = config.bytecode_extension.trim_start_matches('.');
    if extension.is_empty() || extension.contains(['/', '\\']) {
      return Err(Error::Config(format!(
        "Invalid bytecode extension '{}'",
        config.bytecode_extension
      )));
    }
    config.bytecode_extension = extension.to_string();
    Ok(config)
  }
}
