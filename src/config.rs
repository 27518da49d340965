use std::path::PathBuf;
use std::str::FromStr;

/// Upper bound for `CARLOT_MAX_CONNECTIONS`. Drain acquires every permit at once as a `u32`.
pub const MAX_CONNECTIONS_LIMIT: usize = 65_536;

/// Server settings, read once from `CARLOT_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub bind: String,
    pub data_dir: PathBuf,
    pub password: String,
    pub max_connections: usize,
    pub metrics_port: Option<u16>,
    pub tls_cert: Option<String>,
    pub tls_key: Option<String>,
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Invalid { var: &'static str, value: String },
    /// Exactly one of the TLS cert/key variables was set.
    PartialTls,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { var, value } => write!(f, "invalid value for {var}: {value:?}"),
            ConfigError::PartialTls => {
                write!(f, "both CARLOT_TLS_CERT and CARLOT_TLS_KEY must be set, or neither")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5433,
            bind: "0.0.0.0".into(),
            data_dir: PathBuf::from("./data"),
            password: "carlot".into(),
            max_connections: 256,
            metrics_port: None,
            tls_cert: None,
            tls_key: None,
            seed_file: None,
        }
    }
}

fn parse<T: FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { var, value })
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(v) = get("CARLOT_PORT") {
            config.port = parse("CARLOT_PORT", v)?;
        }
        if let Some(v) = get("CARLOT_BIND") {
            config.bind = v;
        }
        if let Some(v) = get("CARLOT_DATA_DIR") {
            config.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("CARLOT_PASSWORD") {
            config.password = v;
        }
        if let Some(v) = get("CARLOT_MAX_CONNECTIONS") {
            config.max_connections = parse("CARLOT_MAX_CONNECTIONS", v.clone())?;
            if config.max_connections == 0 || config.max_connections > MAX_CONNECTIONS_LIMIT {
                return Err(ConfigError::Invalid {
                    var: "CARLOT_MAX_CONNECTIONS",
                    value: v,
                });
            }
        }
        if let Some(v) = get("CARLOT_METRICS_PORT") {
            config.metrics_port = Some(parse("CARLOT_METRICS_PORT", v)?);
        }
        config.tls_cert = get("CARLOT_TLS_CERT");
        config.tls_key = get("CARLOT_TLS_KEY");
        if config.tls_cert.is_some() != config.tls_key.is_some() {
            return Err(ConfigError::PartialTls);
        }
        config.seed_file = get("CARLOT_SEED_FILE").map(PathBuf::from);

        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join("carlot.wal")
    }
}
