//! Log output of the server.
//!
//! `RUST_LOG` overrides the default directives, e.g. `RUST_LOG=debug` to
//! see the SMTP conversation (credentials and message bodies stay redacted).

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;

/// rustls reports every handshake step at `debug`; keep it out of the way
const DEFAULT_DIRECTIVES: &str = "info,rustls=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Installs the global subscriber: JSON lines with the `tracing_json`
/// feature, human readable otherwise (without colours under
/// `tracing_noansi`). rustls logs through the `log` crate, so its records
/// are bridged in first.
pub fn setup_tracing() -> Result<(), SetGlobalDefaultError> {
    if let Err(err) = tracing_log::LogTracer::init() {
        eprintln!("log records will not be captured: {}", err);
    }

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(!cfg!(feature = "tracing_noansi"));

    if cfg!(feature = "tracing_json") {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    }
}
