use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Durable result directory, created at startup.
    pub files_dir: PathBuf,
    /// Dataset handed to the extraction tool.
    pub dataset: PathBuf,
    /// Extraction tool executable (default: `osmx`).
    pub osmx_exec: PathBuf,
    /// Working directory for transient files (default: `/tmp`).
    pub tmp_dir: PathBuf,
    /// Submissions estimated above this many nodes are rejected.
    pub nodes_limit: u64,
    /// Density raster PNG (default: `z12_red_green.png`).
    pub density_raster: PathBuf,
    pub worker_count: usize,
    pub queue_capacity: usize,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long in-flight extractions get to finish on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `8080`                  |
    /// | `FILES_DIR`             | required                |
    /// | `DATASET`               | required                |
    /// | `OSMX_EXEC`             | `osmx`                  |
    /// | `TMPDIR`                | `/tmp`                  |
    /// | `NODES_LIMIT`           | `100000000`             |
    /// | `DENSITY_RASTER`        | `z12_red_green.png`     |
    /// | `WORKER_COUNT`          | available parallelism   |
    /// | `QUEUE_CAPACITY`        | `512`                   |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let default_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&var, "PORT", 8080)?,
            files_dir: required("FILES_DIR")?.into(),
            dataset: required("DATASET")?.into(),
            osmx_exec: var("OSMX_EXEC").unwrap_or_else(|| "osmx".into()).into(),
            tmp_dir: var("TMPDIR").unwrap_or_else(|| "/tmp".into()).into(),
            nodes_limit: parse(&var, "NODES_LIMIT", 100_000_000)?,
            density_raster: var("DENSITY_RASTER")
                .unwrap_or_else(|| "z12_red_green.png".into())
                .into(),
            worker_count: parse_nonzero(&var, "WORKER_COUNT", default_workers)?,
            queue_capacity: parse_nonzero(&var, "QUEUE_CAPACITY", 512)?,
            request_timeout_secs: parse(&var, "REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: parse(&var, "SHUTDOWN_TIMEOUT_SECS", 30)?,
        })
    }
}

fn parse<T, F>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var: key, value }),
    }
}

fn parse_nonzero<F>(var: &F, key: &'static str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse(var, key, default)? {
        0 => Err(ConfigError::Invalid {
            var: key,
            value: "0".into(),
        }),
        n => Ok(n),
    }
}
