// Daemon configuration from VIVID_* environment variables

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use vivid_api_rpc::rate_limiter::{DEFAULT_BURST, DEFAULT_RATE_PER_SEC};
use vivid_api_rpc::server::{DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use vivid_api_rpc::RpcServerConfig;
use vivid_core::application::constants::{
    DEFAULT_PROCESSING_CEILING_MS, DEFAULT_RATE_INTERVAL_MS, DEFAULT_RETRY_HINT_MS,
    DEFAULT_SWEEP_INTERVAL, DEFAULT_WAITING_TTL_MS,
};
use vivid_core::application::AdmissionConfig;

const DEFAULT_DB_PATH: &str = "~/.vivid/queue.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: PathBuf,
    pub rpc: RpcServerConfig,
    pub admission: AdmissionConfig,
    pub sweep_interval: Duration,
    pub rate_limit_burst: u32,
    pub rate_limit_rate: u32,
    pub log_format: LogFormat,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("VIVID_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = PathBuf::from(shellexpand::tilde(&db_path).into_owned());

        let rpc = RpcServerConfig {
            host: lookup("VIVID_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string()),
            port: parse_var(&lookup, "VIVID_RPC_PORT", DEFAULT_RPC_PORT)?,
        };

        let admission = AdmissionConfig {
            interval_ms: positive(&lookup, "VIVID_RATE_INTERVAL_MS", DEFAULT_RATE_INTERVAL_MS)?,
            retry_hint_ms: positive(&lookup, "VIVID_RETRY_HINT_MS", DEFAULT_RETRY_HINT_MS)?,
            processing_ceiling_ms: positive(
                &lookup,
                "VIVID_PROCESSING_CEILING_MS",
                DEFAULT_PROCESSING_CEILING_MS,
            )?,
            waiting_ttl_ms: positive(&lookup, "VIVID_WAITING_TTL_MS", DEFAULT_WAITING_TTL_MS)?,
        };

        let sweep_ms = positive(
            &lookup,
            "VIVID_SWEEP_INTERVAL_MS",
            DEFAULT_SWEEP_INTERVAL.as_millis() as i64,
        )?;

        let rate_limit_burst = parse_var(&lookup, "VIVID_RATE_LIMIT_BURST", DEFAULT_BURST)?;
        let rate_limit_rate = parse_var(&lookup, "VIVID_RATE_LIMIT_RATE", DEFAULT_RATE_PER_SEC)?;
        if rate_limit_burst == 0 {
            bail!("VIVID_RATE_LIMIT_BURST must be at least 1");
        }

        let log_format = match lookup("VIVID_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => bail!(
                "VIVID_LOG_FORMAT must be \"json\" or \"pretty\", got {:?}",
                other
            ),
        };

        Ok(Self {
            db_path,
            rpc,
            admission,
            sweep_interval: Duration::from_millis(sweep_ms as u64),
            rate_limit_burst,
            rate_limit_rate,
            log_format,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid {}={:?}", name, raw)),
        None => Ok(default),
    }
}

fn positive(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: i64) -> Result<i64> {
    let value: i64 = parse_var(lookup, name, default)?;
    if value <= 0 {
        bail!("{} must be positive, got {}", name, value);
    }
    Ok(value)
}
