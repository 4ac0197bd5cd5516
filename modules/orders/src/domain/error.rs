/// Errors produced by order domain rules and the order service
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Order not found: {0}")]
    NotFound(i64),

    #[error("Order {0} does not belong to user {1}")]
    NotOwnedByUser(i64, i64),

    #[error("Order already completed: {0}")]
    AlreadyCompleted(i64),

    #[error("Order is not completed: {0}")]
    NotCompleted(i64),

    #[error("Order cannot be refunded: {0}")]
    RefundWindowClosed(i64),

    #[error("Expiration date is in the past")]
    ExpirationInPast,

    #[error("Expiration date is in the future")]
    ExpirationInFuture,

    #[error("Order weight exceeds the packaging limit")]
    WeightExceedsPackaging,

    #[error("Unknown packaging type: {0}")]
    UnknownPackaging(String),

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Order fields are incorrect")]
    InvalidFields,
}
