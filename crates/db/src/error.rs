#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Invalid table name {0:?}")]
    InvalidTableName(String),

    #[error("Batch id {0} does not fit in a BIGINT column")]
    BatchIdOutOfRange(u64),

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}
