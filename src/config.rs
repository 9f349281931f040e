// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! All configuration is loaded from the environment once at startup into an
//! [`AppConfig`]. Missing required variables fail startup with a typed error
//! instead of panicking somewhere down the line.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the ledger database and audit logs | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `NODE_BASE_URL` | Wallet daemon base URL | Required |
//! | `NODE_API_KEY` | Static shared secret sent as `X-API-KEY` | Required |
//! | `NODE_TIMEOUT_SECS` | Per-request timeout for daemon calls | `15` |
//! | `MASTER_KEY_HEX` | 64 hex chars; KeyVault master key | Required |
//! | `RECONCILE_INTERVAL_SECS` | Reconciliation sweeper period | `60` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

const DEFAULT_DATA_DIR: &str = "/data";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_NODE_TIMEOUT_SECS: u64 = 15;
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 60;

/// Filename of the ledger database inside `DATA_DIR`.
pub const LEDGER_DB_FILE: &str = "ledger.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
}

/// Process-wide configuration, loaded once in `main`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Root directory for `ledger.redb` and `audit/`.
    pub data_dir: PathBuf,
    /// HTTP bind address.
    pub host: String,
    /// HTTP bind port.
    pub port: u16,
    /// Wallet daemon base URL, e.g. `http://127.0.0.1:8441`.
    pub node_base_url: String,
    /// Shared secret sent to the daemon as `X-API-KEY`.
    pub node_api_key: String,
    /// Timeout applied to every daemon request.
    pub node_timeout: Duration,
    /// KeyVault master key (32 bytes, decoded from hex).
    pub master_key: [u8; 32],
    /// Period of the reconciliation sweeper.
    pub reconcile_interval: Duration,
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = PathBuf::from(env_or_default(DATA_DIR_ENV, DEFAULT_DATA_DIR));
        let host = env_or_default("HOST", DEFAULT_HOST);
        let port = parse_var("PORT", env::var("PORT").ok(), DEFAULT_PORT)?;

        let node_base_url = env_required("NODE_BASE_URL")?;
        let node_api_key = env_required("NODE_API_KEY")?;
        let node_timeout_secs = parse_var(
            "NODE_TIMEOUT_SECS",
            env::var("NODE_TIMEOUT_SECS").ok(),
            DEFAULT_NODE_TIMEOUT_SECS,
        )?;

        let master_key_hex = env_required("MASTER_KEY_HEX")?;
        let master_key = parse_master_key(&master_key_hex)?;

        let reconcile_secs = parse_var(
            "RECONCILE_INTERVAL_SECS",
            env::var("RECONCILE_INTERVAL_SECS").ok(),
            DEFAULT_RECONCILE_INTERVAL_SECS,
        )?;

        Ok(Self {
            data_dir,
            host,
            port,
            node_base_url,
            node_api_key,
            node_timeout: Duration::from_secs(node_timeout_secs),
            master_key,
            reconcile_interval: Duration::from_secs(reconcile_secs),
        })
    }

    /// Path of the ledger database file.
    pub fn ledger_db_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_DB_FILE)
    }

    /// Directory holding daily audit log files.
    pub fn audit_dir(&self) -> PathBuf {
        self.data_dir.join("audit")
    }
}

fn env_or_default(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_required(var: &'static str) -> Result<String, ConfigError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(var)),
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
            var,
            reason: format!("could not parse {raw:?}"),
        }),
        None => Ok(default),
    }
}

/// Decode the hex-encoded 32-byte master key.
fn parse_master_key(hex: &str) -> Result<[u8; 32], ConfigError> {
    let hex = hex.trim();
    if hex.len() != 64 {
        return Err(ConfigError::InvalidVar {
            var: "MASTER_KEY_HEX",
            reason: format!("expected 64 hex chars, got {}", hex.len()),
        });
    }

    let mut key = [0u8; 32];
    for (i, byte) in key.iter_mut().enumerate() {
        let pair = &hex[i * 2..i * 2 + 2];
        *byte = u8::from_str_radix(pair, 16).map_err(|_| ConfigError::InvalidVar {
            var: "MASTER_KEY_HEX",
            reason: format!("non-hex characters at offset {}", i * 2),
        })?;
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_master_key_roundtrip() {
        let hex = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
        let key = parse_master_key(hex).unwrap();
        assert_eq!(key[0], 0x00);
        assert_eq!(key[1], 0x01);
        assert_eq!(key[31], 0x1f);
    }

    #[test]
    fn parse_master_key_rejects_wrong_length() {
        let err = parse_master_key("abcd").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { var, .. } if var == "MASTER_KEY_HEX"));
    }

    #[test]
    fn parse_master_key_rejects_non_hex() {
        let bad = "zz0102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
        assert!(parse_master_key(bad).is_err());
    }

    #[test]
    fn parse_var_uses_default_when_absent() {
        let port: u16 = parse_var("PORT", None, 8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn parse_var_rejects_garbage() {
        let result: Result<u16, _> = parse_var("PORT", Some("not-a-port".to_string()), 8080);
        assert!(result.is_err());
    }
}
