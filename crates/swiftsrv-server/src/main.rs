//! swiftsrv daemon
//!
//! - Config: `swiftsrv.yaml` (or `$SWIFTSRV_CONFIG`), then `SWIFTSRV_HOST` /
//!   `SWIFTSRV_PORT` overrides
//! - Demangles through the external program named in `demangler.program`
//! - Ctrl-C stops accepting and logs final metrics

use std::process::ExitCode;

use tracing_subscriber::{fmt, EnvFilter};

use swiftsrv_server::{config, AppState, Server};

#[tokio::main]
async fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "swiftsrv failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> swiftsrv_core::Result<()> {
    let cfg = config::load_from_env()?;
    tracing::info!(
        endpoint = %cfg.server.endpoint(),
        program = %cfg.demangler.program,
        "swiftsrv starting"
    );

    let state = AppState::new(cfg)?;
    let metrics = state.metrics();
    let server = Server::bind(state).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "ctrl-c handler unavailable");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!(metrics = %metrics.render(), "swiftsrv stopped");
    Ok(())
}
