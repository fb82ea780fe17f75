use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;

use crate::client::{ClientConfig, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_SERVICE_URL};
use crate::engine::AnnotateOptions;
use crate::logging::TransportMode;

/// MachineLinking enhancement server
#[derive(Debug, Clone, Parser)]
#[command(name = "mlink-enhancer", version, about)]
pub struct Config {
    /// Application id issued by MachineLinking
    #[arg(long, env = "ML_APP_ID")]
    pub app_id: String,

    /// Application key issued by MachineLinking
    #[arg(long, env = "ML_APP_KEY", hide_env_values = true)]
    pub app_key: String,

    #[arg(long, env = "ML_SERVICE_URL", default_value = DEFAULT_SERVICE_URL)]
    pub service_url: String,

    /// Connection timeout in milliseconds
    #[arg(
        long,
        env = "ML_CONNECTION_TIMEOUT",
        default_value_t = DEFAULT_CONNECTION_TIMEOUT.as_millis() as u64
    )]
    pub connection_timeout_ms: u64,

    /// Also describe linked entities (label, types, abstract, image and thumbnail)
    #[arg(long, env = "ML_ENTITY_DATA")]
    pub include_entity_data: bool,

    /// Ask the service for topic classification
    #[arg(long, env = "ML_TOPIC")]
    pub topic: bool,

    /// Override the service default for category data
    #[arg(long, env = "ML_CATEGORY")]
    pub category: Option<bool>,

    /// Override the service default for class data
    #[arg(long, env = "ML_CLASS")]
    pub class: Option<bool>,

    /// SQLite database file (must end in .db)
    #[arg(long, env = "ML_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Serve streamable HTTP instead of stdio
    #[arg(short = 's', long)]
    pub stream: bool,

    #[arg(short = 'p', long, default_value_t = 8000)]
    pub port: u16,

    #[arg(short = 'b', long, default_value = "127.0.0.1")]
    pub bind: String,

    /// Log file (stdio mode logs nowhere else)
    #[arg(short = 'l', long)]
    pub log: Option<String>,
}

impl Config {
    /// Reject settings clap cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() {
            bail!("Application id must not be empty");
        }
        if self.app_key.trim().is_empty() {
            bail!("Application key must not be empty");
        }
        if self.connection_timeout_ms == 0 {
            bail!("Connection timeout must be positive");
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            app_id: self.app_id.clone(),
            app_key: self.app_key.clone(),
            service_url: self.service_url.clone(),
            connect_timeout: Duration::from_millis(self.connection_timeout_ms),
        }
    }

    pub fn annotate_options(&self) -> AnnotateOptions {
        AnnotateOptions {
            include_entity_data: self.include_entity_data,
            topic: self.topic.then_some(true),
            category: self.category,
            class: self.class,
            min_weight: None,
        }
    }

    /// Configured database path, or the default under the local data dir
    pub fn db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push("mlink-enhancer");
            path.push("enhancements.db");
            path
        })
    }

    pub fn transport_mode(&self) -> TransportMode {
        if self.stream {
            TransportMode::Stream
        } else {
            TransportMode::Stdio
        }
    }
}
