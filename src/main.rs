use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod extractor;
mod model;
mod resolver;
mod routes;
mod stream;

pub use error::{Error, Result};

use config::Config;
use resolver::Resolver;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
  let env_filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt().with_env_filter(env_filter).init();

  let config = Config::from_env()?;
  let addr = config.listen_addr();
  let resolver = Arc::new(Resolver::from_config(&config)?);

  info!(
    extractor = resolver.extractor_name(),
    policy = ?config.stream_policy,
    "starting stream resolver"
  );

  Toplevel::new(move |s| async move {
    s.start(SubsystemBuilder::new("http", move |subsys| {
      serve(subsys, addr, resolver)
    }));
  })
  .catch_signals()
  .handle_shutdown_requests(SHUTDOWN_TIMEOUT)
  .await?;

  Ok(())
}

async fn serve(
  subsys: SubsystemHandle,
  addr: SocketAddr,
  resolver: Arc<Resolver>,
) -> Result<()> {
  let app = routes::router(resolver);

  info!("Listening on {}", addr);

  axum::Server::try_bind(&addr)
    .map_err(|e| Error::Server(format!("failed to bind {addr}: {e}")))?
    .serve(app.into_make_service())
    .with_graceful_shutdown(subsys.on_shutdown_requested())
    .await
    .map_err(|e| Error::Server(e.to_string()))?;

  info!("server stopped");
  Ok(())
}
