// Runtime configuration: an optional .env file, then environment variables.
//
//   DVF_DATA_PATH  CSV to load              (default: dvf.csv)
//   DVF_BIND       server listen address    (default: 0.0.0.0:3000)
//   RUST_LOG       tracing filter

use crate::error::{DashboardError, DashboardResult};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DATA_PATH: &str = "dvf.csv";
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_path: PathBuf,
    pub bind_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            bind_addr: DEFAULT_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000))),
        }
    }
}

impl Config {
    pub fn from_env() -> DashboardResult<Self> {
        // Optional - a missing .env is not an error
        dotenvy::dotenv().ok();

        Self::from_vars(env::var("DVF_DATA_PATH").ok(), env::var("DVF_BIND").ok())
    }

    fn from_vars(data_path: Option<String>, bind: Option<String>) -> DashboardResult<Self> {
        let mut config = Config::default();

        if let Some(path) = data_path.filter(|p| !p.trim().is_empty()) {
            config.data_path = PathBuf::from(path);
        }

        if let Some(bind) = bind.filter(|b| !b.trim().is_empty()) {
            config.bind_addr = bind.trim().parse().map_err(|_| {
                DashboardError::InvalidConfig(format!(
                    "DVF_BIND must be HOST:PORT, got {:?}",
                    bind
                ))
            })?;
        }

        Ok(config)
    }
}
