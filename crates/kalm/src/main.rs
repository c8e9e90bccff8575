use std::sync::Arc;

use kalm_core::{config::Config, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    kalm_core::logging::init("kalm")?;

    let cfg = Arc::new(Config::load()?);
    tracing::info!(mode = ?cfg.update_mode, bind = %cfg.http_bind, "configuration loaded");

    kalm_telegram::router::run(cfg)
        .await
        .map_err(service_error)?;

    Ok(())
}

/// Keep the kind of a startup failure (config, i/o); anything else is external.
fn service_error(e: anyhow::Error) -> Error {
    let message = format!("kalm service failed: {e:#}");
    if let Some(Error::Config(_)) = e.downcast_ref::<Error>() {
        return Error::Config(message);
    }
    if let Some(Error::Io(io)) = e.downcast_ref::<Error>() {
        return Error::Io(std::io::Error::new(io.kind(), message));
    }
    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        return Error::Io(std::io::Error::new(io.kind(), message));
    }
    Error::External(message)
}
