use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use contract_compiler::{parse_remappings, BackendKind, CompilerConfigOptions};

/// Serve the contract compilation pipeline over HTTP.
#[derive(Debug, Parser)]
#[command(name = "contract-compile-server", version, about)]
pub struct Cli {
  /// Working root; top-level entries and remapping targets resolve against it.
  #[arg(long, default_value = ".")]
  pub root: PathBuf,

  /// Import remapping in `[context:]prefix=target` form. Repeatable.
  #[arg(long = "remapping", value_name = "REMAPPING")]
  pub remappings: Vec<String>,

  /// Ignore `remappings.txt` under the root.
  #[arg(long)]
  pub no_remappings_file: bool,

  #[arg(long, value_name = "solc|resolc")]
  pub backend: Option<BackendKind>,

  #[arg(long)]
  pub solc_version: Option<String>,

  /// Download the requested solc through svm when it is not installed.
  #[arg(long)]
  pub auto_install_solc: bool,

  /// Path to the resolc-compatible standard-JSON binary.
  #[arg(long = "resolc", value_name = "PATH")]
  pub resolc_path: Option<PathBuf>,

  /// Directory used when a request sets `saveFiles` without an `outputDir`.
  #[arg(long)]
  pub artifacts_dir: Option<PathBuf>,

  #[arg(long)]
  pub bytecode_extension: Option<String>,

  /// Entry compiled by `GET /compile`.
  #[arg(long)]
  pub default_entry: Option<PathBuf>,

  /// Report error-severity diagnostics as warnings instead of failing the request.
  #[arg(long)]
  pub allow_compiler_errors: bool,

  #[arg(long, default_value = "127.0.0.1:3000")]
  pub listen: SocketAddr,

  /// Emit logs as JSON lines.
  #[arg(long)]
  pub log_json: bool,
}

impl Cli {
  pub fn compiler_options(&self) -> contract_compiler::Result<CompilerConfigOptions> {
    let remappings = if self.remappings.is_empty() {
      None
    } else {
      Some(parse_remappings(self.remappings.iter().map(String::as_str))?)
    };

    Ok(CompilerConfigOptions {
      root: Some(self.root.clone()),
      remappings,
      backend: self.backend,
      solc_version: self.solc_version.clone(),
      auto_install_solc: self.auto_install_solc.then_some(true),
      resolc_path: self.resolc_path.clone(),
      artifacts_dir: self.artifacts_dir.clone().map(Some),
      bytecode_extension: self.bytecode_extension.clone(),
      default_entry: self.default_entry.clone(),
      fail_on_compiler_errors: self.allow_compiler_errors.then_some(false),
      use_remappings_file: !self.no_remappings_file,
      ..Default::default()
    })
  }
}
