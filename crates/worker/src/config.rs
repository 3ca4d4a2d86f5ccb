use std::path::PathBuf;

/// Errors raised while reading [`PipelineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} must be {expected}, got {value:?}")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Backend named by `STORAGE_BACKEND`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    S3,
    Local,
}

/// Where tiles and final images are stored, resolved by
/// [`PipelineConfig::storage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    S3 { bucket: String },
    Local { root: PathBuf },
}

/// Pipeline configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Default log level is `debug` instead of `info`.
    pub debug: bool,
    /// Delete tiles once the final image is written.
    pub delete_tiles: bool,
    pub storage_kind: StorageKind,
    /// Only required once an S3 store is opened.
    pub output_bucket: Option<String>,
    pub local_storage_root: PathBuf,
    /// Prefix for every object key.
    pub output_prefix: String,
    /// Forwarded to the dispatcher as the worker entry point.
    pub worker_function_name: String,
    /// Forwarded to the dispatcher as the combiner entry point.
    pub combiner_function_name: String,
    /// Launcher POSTs dispatch requests here when set.
    pub dispatch_url: Option<String>,
    /// Dispatcher fan-out cap.
    pub max_parallelism: u32,
    /// Required by the `worker` command.
    pub database_url: Option<String>,
    /// Lifetime of batch completion records.
    pub batch_record_ttl_secs: u64,
    /// Tiles rendered and uploaded concurrently per batch.
    pub tile_concurrency: usize,
    /// Tiles fetched concurrently by the combiner.
    pub fetch_concurrency: usize,
}

impl PipelineConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                  | Default    |
    /// |--------------------------|------------|
    /// | `DEBUG`                  | `false`    |
    /// | `DELETE_TILES`           | `false`    |
    /// | `STORAGE_BACKEND`        | `s3`       |
    /// | `OUTPUT_BUCKET`          | (required for `s3`) |
    /// | `LOCAL_STORAGE_ROOT`     | `./output` |
    /// | `OUTPUT_PREFIX`          | `""`       |
    /// | `WORKER_FUNCTION_NAME`   | `""`       |
    /// | `COMBINER_FUNCTION_NAME` | `""`       |
    /// | `DISPATCH_URL`           | unset      |
    /// | `MAX_PARALLELISM`        | `3000`     |
    /// | `DATABASE_URL`           | unset      |
    /// | `BATCH_RECORD_TTL_SECS`  | `86400`    |
    /// | `TILE_CONCURRENCY`       | `8`        |
    /// | `FETCH_CONCURRENCY`      | `32`       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let storage_kind = match get("STORAGE_BACKEND")
            .unwrap_or_else(|| "s3".into())
            .to_ascii_lowercase()
            .as_str()
        {
            "s3" => StorageKind::S3,
            "local" => StorageKind::Local,
            other => {
                return Err(ConfigError::Invalid {
                    var: "STORAGE_BACKEND",
                    expected: "`s3` or `local`",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            debug: parse_bool("DEBUG", get("DEBUG"))?,
            delete_tiles: parse_bool("DELETE_TILES", get("DELETE_TILES"))?,
            storage_kind,
            output_bucket: get("OUTPUT_BUCKET"),
            local_storage_root: get("LOCAL_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./output")),
            output_prefix: lookup("OUTPUT_PREFIX").unwrap_or_default(),
            worker_function_name: lookup("WORKER_FUNCTION_NAME").unwrap_or_default(),
            combiner_function_name: lookup("COMBINER_FUNCTION_NAME").unwrap_or_default(),
            dispatch_url: get("DISPATCH_URL"),
            max_parallelism: parse_positive("MAX_PARALLELISM", get("MAX_PARALLELISM"), 3000)?,
            database_url: get("DATABASE_URL"),
            batch_record_ttl_secs: parse_positive(
                "BATCH_RECORD_TTL_SECS",
                get("BATCH_RECORD_TTL_SECS"),
                86_400,
            )?,
            tile_concurrency: parse_positive("TILE_CONCURRENCY", get("TILE_CONCURRENCY"), 8)?,
            fetch_concurrency: parse_positive("FETCH_CONCURRENCY", get("FETCH_CONCURRENCY"), 32)?,
        })
    }

    /// Resolve the object store location. Commands that never touch
    /// storage skip this, so `OUTPUT_BUCKET` is only checked here.
    pub fn storage(&self) -> Result<StorageBackend, ConfigError> {
        match self.storage_kind {
            StorageKind::S3 => Ok(StorageBackend::S3 {
                bucket: self
                    .output_bucket
                    .clone()
                    .ok_or(ConfigError::Missing("OUTPUT_BUCKET"))?,
            }),
            StorageKind::Local => Ok(StorageBackend::Local {
                root: self.local_storage_root.clone(),
            }),
        }
    }

    /// Batch record lifetime as a chrono duration, saturating at the
    /// largest representable value.
    pub fn batch_record_ttl(&self) -> chrono::Duration {
        i64::try_from(self.batch_record_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

fn parse_bool(var: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            expected: "a boolean",
            value,
        }),
    }
}

fn parse_positive<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::Invalid {
            var,
            expected: "a positive integer",
            value,
        }),
    }
}
