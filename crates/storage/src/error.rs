#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid object key {0:?}")]
    InvalidKey(String),

    #[error("I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} failed for {key}: {message}")]
    Backend {
        op: &'static str,
        key: String,
        message: String,
    },
}

impl StorageError {
    pub fn backend(op: &'static str, key: &str, message: impl Into<String>) -> Self {
        Self::Backend {
            op,
            key: key.to_string(),
            message: message.into(),
        }
    }
}
