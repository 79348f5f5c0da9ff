//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Optional plain-HTTP listener (typically port 80) that 301-redirects
    /// every request to `public_url`, preserving path and query. Only useful
    /// when the main listener sits behind TLS.
    #[serde(default)]
    pub redirect_bind: Option<String>,
    /// Public base URL of this server (scheme + host, no trailing slash).
    /// Required when `redirect_bind` is set.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Maximum enrolled workers per client IP before enrollment is refused.
    #[serde(default = "default_max_workers_per_ip")]
    pub max_workers_per_ip: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_workers_per_ip() -> u64 {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            redirect_bind: None,
            public_url: None,
            max_workers_per_ip: default_max_workers_per_ip(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.redirect_bind.is_some() && self.public_url.is_none() {
            return Err("server.redirect_bind requires server.public_url".to_string());
        }
        Ok(())
    }
}

/// Verification policy configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Tolerance for relative size discrepancy below which a worker's claim
    /// is considered honest. Must be in (0, 1); 0.05 means ±5%.
    #[serde(default = "default_content_threshold")]
    pub content_threshold: f64,
    /// Reputation above which a mismatching worker is allowed a versioned
    /// overwrite instead of a penalty.
    #[serde(default = "default_trusted_reputation")]
    pub trusted_reputation: i64,
    /// Reputation deducted on a size mismatch from an untrusted worker.
    #[serde(default = "default_mismatch_penalty")]
    pub mismatch_penalty: i64,
}

fn default_content_threshold() -> f64 {
    0.05
}

fn default_trusted_reputation() -> i64 {
    100
}

fn default_mismatch_penalty() -> i64 {
    10
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            content_threshold: default_content_threshold(),
            trusted_reputation: default_trusted_reputation(),
            mismatch_penalty: default_mismatch_penalty(),
        }
    }
}

impl VerifyConfig {
    /// Validate verifier configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.content_threshold > 0.0 && self.content_threshold < 1.0) {
            return Err(format!(
                "verify.content_threshold must be in (0, 1), got {}",
                self.content_threshold
            ));
        }
        if self.mismatch_penalty <= 0 {
            return Err("verify.mismatch_penalty must be positive".to_string());
        }
        if self.trusted_reputation <= 0 {
            return Err("verify.trusted_reputation must be positive".to_string());
        }
        Ok(())
    }
}

/// Object storage configuration (S3-compatible).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket name.
    pub bucket: String,
    /// Endpoint host (e.g., "s3.eu-central-1.wasabisys.com" or
    /// "minio:9000"). Scheme defaults to https when omitted.
    pub endpoint: Option<String>,
    /// Region.
    pub region: Option<String>,
    /// Access key ID. Falls back to the ambient AWS credential chain if
    /// neither key is set.
    pub access_key: Option<String>,
    /// Secret access key.
    pub secret_key: Option<String>,
    /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO and
    /// some S3-compatible services.
    #[serde(default)]
    pub force_path_style: bool,
    /// Validity window for presigned upload URLs, in seconds.
    #[serde(default = "default_presign_expiry_secs")]
    pub presign_expiry_secs: u64,
}

fn default_presign_expiry_secs() -> u64 {
    3600 // a batch upload is a single PUT
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.is_empty() {
            return Err("storage.bucket must not be empty".to_string());
        }
        if self.presign_expiry_secs == 0 {
            return Err("storage.presign_expiry_secs must be non-zero".to_string());
        }
        match (self.access_key.as_ref(), self.secret_key.as_ref()) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            _ => Err(
                "storage config requires both access_key and secret_key when either is set"
                    .to_string(),
            ),
        }
    }
}

/// PostgreSQL SSL mode configuration.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PgSslMode {
    /// Disable SSL/TLS entirely.
    Disable,
    /// Prefer SSL/TLS but allow unencrypted connections (default).
    #[default]
    Prefer,
    /// Require SSL/TLS for all connections.
    Require,
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetadataConfig {
    /// SQLite database (development and tests).
    Sqlite {
        /// Database file path.
        path: PathBuf,
    },
    /// PostgreSQL database.
    Postgres {
        /// Connection URL (optional if using individual fields).
        /// Takes precedence over individual fields if both are provided.
        url: Option<String>,
        /// Database host.
        host: Option<String>,
        /// Database port (default: 5432).
        #[serde(default = "default_pg_port")]
        port: Option<u16>,
        /// Database username.
        username: Option<String>,
        /// Database password.
        /// WARNING: Prefer the DROVER_METADATA__PASSWORD env var over
        /// storing this in a config file.
        password: Option<String>,
        /// Database name.
        database: Option<String>,
        /// SSL mode for connections.
        ssl_mode: Option<PgSslMode>,
        /// Maximum connections in the pool.
        #[serde(default = "default_max_connections")]
        max_connections: u32,
        /// Statement timeout in milliseconds (prevents hung queries).
        #[serde(default = "default_statement_timeout_ms")]
        statement_timeout_ms: Option<u64>,
    },
}

fn default_pg_port() -> Option<u16> {
    Some(5432)
}

fn default_max_connections() -> u32 {
    10
}

fn default_statement_timeout_ms() -> Option<u64> {
    Some(30_000)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self::Sqlite {
            path: PathBuf::from("./data/metadata.db"),
        }
    }
}

impl MetadataConfig {
    /// Validate metadata configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            MetadataConfig::Sqlite { .. } => Ok(()),
            MetadataConfig::Postgres {
                url,
                host,
                database,
                ..
            } => match (url.as_ref(), host.as_ref(), database.as_ref()) {
                (Some(_), _, _) => Ok(()),
                (None, Some(_), Some(_)) => Ok(()),
                (None, None, _) => {
                    Err("postgres config requires either 'url' or 'host' + 'database'".to_string())
                }
                (None, Some(_), None) => Err(
                    "postgres config requires 'database' when using individual fields".to_string(),
                ),
            },
        }
    }
}

/// Top-level application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub verify: VerifyConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Validate the whole configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.verify.validate()?;
        self.storage.validate()?;
        self.metadata.validate()?;
        Ok(())
    }

    /// Create a test configuration with throwaway storage coordinates.
    ///
    /// **For testing only.** The storage section points at a bucket that is
    /// never contacted; tests substitute an in-memory blob store.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            verify: VerifyConfig::default(),
            storage: StorageConfig {
                bucket: "drover-test".to_string(),
                endpoint: Some("s3.test".to_string()),
                region: Some("us-east-1".to_string()),
                access_key: Some("access".to_string()),
                secret_key: Some("secret".to_string()),
                force_path_style: true,
                presign_expiry_secs: default_presign_expiry_secs(),
            },
            metadata: MetadataConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AppConfig::for_testing().validate().unwrap();
    }

    #[test]
    fn content_threshold_bounds() {
        let mut config = AppConfig::for_testing();
        config.verify.content_threshold = 0.0;
        assert!(config.validate().is_err());
        config.verify.content_threshold = 1.0;
        assert!(config.validate().is_err());
        config.verify.content_threshold = 0.05;
        config.validate().unwrap();
    }

    #[test]
    fn redirect_requires_public_url() {
        let mut config = AppConfig::for_testing();
        config.server.redirect_bind = Some("0.0.0.0:80".to_string());
        assert!(config.validate().is_err());
        config.server.public_url = Some("https://archive.example.org".to_string());
        config.validate().unwrap();
    }

    #[test]
    fn storage_requires_complete_credentials() {
        let mut config = AppConfig::for_testing();
        config.storage.secret_key = None;
        assert!(config.validate().is_err());
    }

    #[test]
    fn postgres_config_requires_url_or_host_database() {
        let config = MetadataConfig::Postgres {
            url: None,
            host: None,
            port: default_pg_port(),
            username: None,
            password: None,
            database: None,
            ssl_mode: None,
            max_connections: default_max_connections(),
            statement_timeout_ms: None,
        };
        assert!(config.validate().is_err());

        let config = MetadataConfig::Postgres {
            url: Some("postgres://localhost/drover".to_string()),
            host: None,
            port: default_pg_port(),
            username: None,
            password: None,
            database: None,
            ssl_mode: None,
            max_connections: default_max_connections(),
            statement_timeout_ms: None,
        };
        config.validate().unwrap();
    }
}
