mod cli;
mod router;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use contract_compiler::Compiler;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.log_json)?;

  let compiler = Compiler::new(Some(cli.compiler_options()?)).context("invalid configuration")?;
  let config = compiler.config();
  info!(
    root = %config.root.display(),
    backend = compiler.backend_name(),
    remappings = config.remappings.len(),
    default_entry = %config.default_entry.display(),
    "compiler configured"
  );

  let app = router::build_router(Arc::new(compiler));
  let listener = tokio::net::TcpListener::bind(cli.listen)
    .await
    .with_context(|| format!("failed to bind {}", cli.listen))?;
  info!(addr = %cli.listen, "listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;
  info!("server stopped");
  Ok(())
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
  let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
  let registry = tracing_subscriber::registry().with(filter);
  if json {
    registry
      .with(tracing_subscriber::fmt::layer().json().with_target(true))
      .try_init()?;
  } else {
    registry
      .with(tracing_subscriber::fmt::layer().with_target(true))
      .try_init()?;
  }
  Ok(())
}

async fn shutdown_signal() {
  if let Err(err) = tokio::signal::ctrl_c().await {
    tracing::warn!(error = %err, "failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!("shutdown signal received");
}
