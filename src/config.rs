use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::{
    env, fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = "./config.json";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DATABASE_URL: &str = "sqlite://./data/sensor_metadata.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_PG_PORT: u16 = 5432;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file `{path}`: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("parsing config file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value `{value}` for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("unsupported database url `{0}` (expected sqlite: or postgres:)")]
    UnsupportedDatabase(String),
    #[error("db_config.db_name is required when db_config.host is set")]
    MissingDbName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable multi-field lines.
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    Disable,
    Prefer,
    Require,
}

/// Discrete PostgreSQL connection parameters, as found under `db_config`.
#[derive(Clone, PartialEq)]
pub struct PostgresParams {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub db_name: String,
    pub schema_name: Option<String>,
    pub ssl_mode: Option<SslMode>,
}

impl fmt::Debug for PostgresParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("db_name", &self.db_name)
            .field("schema_name", &self.schema_name)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Which backend to open, and how.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseConfig {
    Sqlite {
        url: String,
    },
    PostgresUrl {
        url: String,
        schema: Option<String>,
    },
    Postgres(PostgresParams),
}

impl DatabaseConfig {
    /// Pick a backend from the URL scheme.
    fn from_url(url: String, schema: Option<String>) -> Result<Self, ConfigError> {
        if url.starts_with("sqlite:") {
            Ok(Self::Sqlite { url })
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::PostgresUrl { url, schema })
        } else {
            Err(ConfigError::UnsupportedDatabase(url))
        }
    }
}

/// Centralized application configuration.
/// Combines CLI arguments, environment variables, an optional JSON file and
/// built-in defaults, in that order of precedence.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout: Duration,
    pub database: DatabaseConfig,
    pub max_connections: u32,
    pub seed: bool,
    pub log_format: LogFormat,
    /// The config file that was actually read, if any.
    pub config_file: Option<PathBuf>,
}

/// Command-line configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Sensor metadata HTTP API")]
pub struct Args {
    /// JSON config file (overrides SENSOR_API_CONFIG, default ./config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Host to bind to (overrides SENSOR_API_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides SENSOR_API_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Per-request deadline in seconds (overrides SENSOR_API_REQUEST_TIMEOUT_SECS)
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Database URL, sqlite: or postgres: (overrides SENSOR_API_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Connection pool size (overrides SENSOR_API_MAX_CONNECTIONS)
    #[arg(long)]
    pub max_connections: Option<u32>,

    /// Insert the demo sensors at startup
    #[arg(long)]
    pub seed: bool,

    /// Log output format (overrides SENSOR_API_LOG_FORMAT)
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,
}

/// Shape of the optional JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server_config: FileServerConfig,
    pub db_config: FileDbConfig,
    pub seed: Option<bool>,
    pub log_format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub request_timeout_sec: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileDbConfig {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub db_name: Option<String>,
    pub schema_name: Option<String>,
    pub ssl_mode: Option<SslMode>,
    pub max_connections: Option<u32>,
}

impl AppConfig {
    /// Parse CLI args and the process environment into an AppConfig.
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(Args::parse(), |key| env::var(key).ok())
    }

    /// Merge `args`, environment (through `env`), the config file and defaults.
    pub fn resolve<E>(args: Args, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        // --- Config file ---
        let explicit_path = args
            .config
            .clone()
            .or_else(|| env("SENSOR_API_CONFIG").map(PathBuf::from));
        let (file, config_file) = match explicit_path {
            Some(path) => (read_file_config(&path)?, Some(path)),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                match read_file_config(&path) {
                    Ok(file) => (file, Some(path)),
                    Err(ConfigError::Read { source, .. })
                        if source.kind() == io::ErrorKind::NotFound =>
                    {
                        (FileConfig::default(), None)
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        // --- Environment fallback ---
        let env_port = env_parse::<u16, _>(&env, "SENSOR_API_PORT")?;
        let env_timeout = env_parse::<u64, _>(&env, "SENSOR_API_REQUEST_TIMEOUT_SECS")?;
        let env_max_conn = env_parse::<u32, _>(&env, "SENSOR_API_MAX_CONNECTIONS")?;
        let env_seed = env_parse::<bool, _>(&env, "SENSOR_API_SEED")?;
        let env_log_format = match env("SENSOR_API_LOG_FORMAT") {
            Some(value) => Some(<LogFormat as ValueEnum>::from_str(&value, true).map_err(|_| {
                ConfigError::InvalidValue {
                    key: "SENSOR_API_LOG_FORMAT",
                    value,
                }
            })?),
            None => None,
        };

        // --- Merge ---
        let timeout_secs = args
            .request_timeout_secs
            .or(env_timeout)
            .or(file.server_config.request_timeout_sec)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request timeout",
                value: "0".into(),
            });
        }

        let file_max_conn = file.db_config.max_connections;
        let database = match args
            .database_url
            .or_else(|| env("SENSOR_API_DATABASE_URL"))
        {
            Some(url) => DatabaseConfig::from_url(url, file.db_config.schema_name)?,
            None => database_from_file(file.db_config)?,
        };

        Ok(Self {
            host: args
                .host
                .or_else(|| env("SENSOR_API_HOST"))
                .or(file.server_config.host)
                .unwrap_or_else(|| DEFAULT_HOST.into()),
            port: args
                .port
                .or(env_port)
                .or(file.server_config.port)
                .unwrap_or(DEFAULT_PORT),
            request_timeout: Duration::from_secs(timeout_secs),
            database,
            max_connections: args
                .max_connections
                .or(env_max_conn)
                .or(file_max_conn)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            seed: args.seed || env_seed.or(file.seed).unwrap_or(false),
            log_format: args
                .log_format
                .or(env_log_format)
                .or(file.log_format)
                .unwrap_or_default(),
            config_file,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Discrete postgres parameters win over a file URL, which wins over the default.
fn database_from_file(db: FileDbConfig) -> Result<DatabaseConfig, ConfigError> {
    if let Some(host) = db.host {
        let db_name = db.db_name.ok_or(ConfigError::MissingDbName)?;
        return Ok(DatabaseConfig::Postgres(PostgresParams {
            host,
            port: db.port.unwrap_or(DEFAULT_PG_PORT),
            user: db.user,
            password: db.password,
            db_name,
            schema_name: db.schema_name,
            ssl_mode: db.ssl_mode,
        }));
    }
    let url = db.url.unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
    DatabaseConfig::from_url(url, db.schema_name)
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_parse<T, E>(env: &E, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    E: Fn(&str) -> Option<String>,
{
    match env(key) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(None),
    }
}
