use linkgarden_utils::version_info::RuntimeEnv;
use serde::Deserialize;
use std::env::vars;
use std::fmt::Display;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub enum Env {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "prod")]
    Prod,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "pr")]
    Pr,
    #[serde(rename = "nightly")]
    Nightly,
}

impl From<&Env> for RuntimeEnv {
    fn from(env: &Env) -> Self {
        match env {
            Env::Local => RuntimeEnv::Local,
            Env::Prod => RuntimeEnv::Prod,
            Env::Test => RuntimeEnv::Test,
            Env::Pr => RuntimeEnv::Pr,
            Env::Nightly => RuntimeEnv::Nightly,
        }
    }
}

impl Display for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Env::Local => write!(f, "local"),
            Env::Prod => write!(f, "prod"),
            Env::Test => write!(f, "test"),
            Env::Pr => write!(f, "pr"),
            Env::Nightly => write!(f, "nightly"),
        }
    }
}

// The final, validated configuration struct.
#[derive(Debug, Clone)]
pub struct Config {
    env: Env,
    database_url: String,
    server_addr: String,
    port: u16,
    // R2 storage for re-hosted link preview images (optional for local/test)
    r2_account_id: Option<String>,
    r2_access_key_id: Option<String>,
    r2_secret_access_key: Option<String>,
    r2_bucket: Option<String>,
    r2_public_base_url: Option<String>,
    // Page-metadata extraction service used by preview enrichment
    metadata_service_url: Option<String>,
    // JWT token secret for session tokens
    jwt_secret: String,
}

// An intermediate struct for deserializing environment variables
// where most fields are optional until validated per environment.
#[derive(Deserialize)]
struct RawConfig {
    env: Env,
    database_url: String,
    server_addr: Option<String>,
    port: Option<u16>,
    r2_account_id: Option<String>,
    r2_access_key_id: Option<String>,
    r2_secret_access_key: Option<String>,
    r2_bucket: Option<String>,
    r2_public_base_url: Option<String>,
    metadata_service_url: Option<String>,
    jwt_secret: Option<String>,
}

impl Config {
    /// Create a test configuration with default values.
    ///
    /// Available to both unit tests and integration tests. Not for
    /// production code.
    pub fn new_for_test() -> Self {
        Self {
            env: Env::Local,
            database_url: "postgres://localhost:5432/test".to_owned(),
            server_addr: "127.0.0.1".to_owned(),
            port: 8080,
            r2_account_id: None,
            r2_access_key_id: None,
            r2_secret_access_key: None,
            r2_bucket: None,
            r2_public_base_url: None,
            metadata_service_url: None,
            jwt_secret: "test-jwt-secret-key-for-local-development".to_owned(),
        }
    }

    pub fn environment(&self) -> &Env {
        &self.env
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_local(&self) -> bool {
        matches!(self.env, Env::Local)
    }

    pub fn r2_account_id(&self) -> Option<&str> {
        self.r2_account_id.as_deref()
    }

    pub fn r2_access_key_id(&self) -> Option<&str> {
        self.r2_access_key_id.as_deref()
    }

    pub fn r2_secret_access_key(&self) -> Option<&str> {
        self.r2_secret_access_key.as_deref()
    }

    pub fn r2_bucket(&self) -> Option<&str> {
        self.r2_bucket.as_deref()
    }

    pub fn r2_public_base_url(&self) -> Option<&str> {
        self.r2_public_base_url.as_deref()
    }

    pub fn metadata_service_url(&self) -> Option<&str> {
        self.metadata_service_url.as_deref()
    }

    /// Get the JWT secret for verifying session tokens.
    pub fn jwt_secret(&self) -> &str {
        &self.jwt_secret
    }

    /// Initializes configuration by reading from environment variables
    /// and applying environment-aware defaults.
    pub fn init() -> anyhow::Result<Self> {
        info!("Loading configuration from environment variables");

        let raw_config: RawConfig = serde_env::from_iter(vars())?;
        Self::from_raw(raw_config)
    }

    fn from_raw(raw_config: RawConfig) -> anyhow::Result<Self> {
        let RawConfig {
            env,
            database_url,
            server_addr,
            port,
            r2_account_id,
            r2_access_key_id,
            r2_secret_access_key,
            r2_bucket,
            r2_public_base_url,
            metadata_service_url,
            jwt_secret,
        } = raw_config;

        let server_addr = match server_addr {
            Some(addr) => {
                info!("Using provided SERVER_ADDR: {addr}");
                addr
            }
            None => {
                let default_addr = match env {
                    Env::Local => "127.0.0.1",
                    _ => "0.0.0.0",
                };
                info!("SERVER_ADDR not set, defaulting to {default_addr} for {env} environment");
                default_addr.to_owned()
            }
        };

        let port = match port {
            Some(port) => port,
            None if matches!(env, Env::Local) => {
                info!("PORT not set, defaulting to 8080 for local environment");
                8080
            }
            None => anyhow::bail!("PORT must be set for {} environment", env),
        };

        // JWT secret is required outside local/test
        let jwt_secret = match jwt_secret {
            Some(secret) => secret,
            None if matches!(env, Env::Local | Env::Test) => {
                info!("JWT_SECRET not set, using default for {env} environment");
                "default-jwt-secret-for-local-development-only".to_owned()
            }
            None => anyhow::bail!("JWT_SECRET must be set for {} environment", env),
        };

        // R2 credentials back preview-image hosting and are required
        // everywhere the service actually serves traffic.
        if !matches!(env, Env::Local | Env::Test) {
            if r2_account_id.is_none() {
                anyhow::bail!("R2_ACCOUNT_ID must be set for {} environment", env);
            }
            if r2_access_key_id.is_none() {
                anyhow::bail!("R2_ACCESS_KEY_ID must be set for {} environment", env);
            }
            if r2_secret_access_key.is_none() {
                anyhow::bail!("R2_SECRET_ACCESS_KEY must be set for {} environment", env);
            }
            if r2_bucket.is_none() {
                anyhow::bail!("R2_BUCKET must be set for {} environment", env);
            }
            if r2_public_base_url.is_none() {
                anyhow::bail!("R2_PUBLIC_BASE_URL must be set for {} environment", env);
            }
            info!("R2 storage credentials validated for {env} environment");
        }

        Ok(Config {
            env,
            database_url,
            server_addr,
            port,
            r2_account_id,
            r2_access_key_id,
            r2_secret_access_key,
            r2_bucket,
            r2_public_base_url,
            metadata_service_url,
            jwt_secret,
        })
    }
}
