use std::time::Duration;

/// Errors surfaced by the durable job ledger.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Row for {entity} {id} is malformed: {reason}")]
    MalformedRow {
        entity: &'static str,
        id: String,
        reason: String,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the chain gateway (JSON-RPC wrapper).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("RPC error: {0}")]
    Rpc(String),
    #[error("Execution reverted: {0}")]
    Reverted(String),
    #[error("Signer error: {0}")]
    Signer(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the market-maker quote server client. An explicit
/// decline is not an error; clients report it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum QuoteServerError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Market maker did not respond within {0:?}")]
    Timeout(Duration),
    #[error("Malformed market maker response: {0}")]
    MalformedResponse(String),
}
