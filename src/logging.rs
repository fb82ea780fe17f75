use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How the MCP server talks to its client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// stdio transport (default), for local MCP clients
    Stdio,
    /// Streamable HTTP transport
    Stream,
}

/// Default filter when RUST_LOG is unset
const DEFAULT_FILTER: &str = "info";

/// Initialize logging for `mode`
///
/// stdio mode never writes to stderr: any output there during the MCP
/// handshake closes the connection. It logs to `log_file` when one is given
/// and nowhere otherwise. Stream mode always logs to stderr, and to
/// `log_file` as well when one is given.
pub fn init_logging(mode: TransportMode, log_file: Option<&str>) -> anyhow::Result<()> {
    let file = log_file.map(open_log_file).transpose()?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    match mode {
        TransportMode::Stdio => {
            if let Some(file) = file {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().with_writer(file).with_ansi(false))
                    .try_init()?;
            }
        }
        TransportMode::Stream => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(file.map(|file| fmt::layer().with_writer(file).with_ansi(false)))
                .try_init()?;
        }
    }
    Ok(())
}

fn open_log_file(path: &str) -> anyhow::Result<Arc<File>> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(Arc::new(file))
}
