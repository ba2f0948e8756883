//! A backend satellite with no game server attached.
//!
//! Reads `CONTROLLER_IP`, `SERVER_NAME`, `SERVER_KIND` and `MINIGAME_KIND`
//! like a real backend would, links to the controller, then takes operator
//! commands from stdin:
//!
//! ```text
//! close true
//! request tag-ctf
//! ```
//!
//! `SERVER_PORT` (default 25565) sets the advertised port. Ctrl-C or EOF
//! stops the link.

use fleetlink::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_PORT: u16 = 25565;

#[tokio::main]
async fn main() -> Result<(), FleetlinkError> {
    init_tracing();

    let config = SatelliteConfig::from_env(Role::Node).inspect_err(|e| {
        tracing::error!(error = %e, "invalid configuration, not linking to controller");
    })?;
    let port = std::env::var("SERVER_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let satellite = start_node(&config, "", port).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    let reply = run_command(satellite.listener(), &line, None).await;
                    println!("{reply}");
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read stdin");
                    break;
                }
            },
        }
    }

    tracing::info!(state = %satellite.state(), "shutting down");
    satellite.shutdown().await;
    Ok(())
}
