use maygasse_apply::config::Settings;
use maygasse_apply::tracing::setup_tracing;
use maygasse_apply::web::{build_app, AppState};
use std::error::Error;
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    setup_tracing()?;

    let settings = Settings::from_env()?;
    let state = Arc::new(AppState::from_settings(&settings));

    info!(
        "Delivering applications to {} via {}",
        settings.recipient,
        state.mailer.delivery()
    );
    info!("Serving static files from {}", settings.static_folder.display());

    let http_listener = TcpListener::bind(settings.socket_addr()).await?;
    info!(
        "Maygasse site running on http://{}",
        http_listener.local_addr()?
    );
    let http_app = build_app(state);

    tokio::select! {
        result = axum::serve(http_listener, http_app).into_future() => {
            if let Err(err) = result {
                error!("HTTP service exited prematurely: {}", err);
                return Err(err.into());
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutting down on CTRL-C");
        }
    }

    Ok(())
}
