use rfqm_core::{GatewayError, QuoteServerError, StoreError};

/// Failure taxonomy of the worker pipeline.
///
/// Every variant describing a job outcome is raised only after the matching
/// terminal status has been persisted, so the job record never disagrees
/// with the error a caller sees.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Job failed validation")]
    JobValidationFailed,
    #[error("Order failed pre-sign validation")]
    PresignValidationFailed,
    #[error("Order failed pre-submit validation")]
    PresubmitValidationFailed,
    #[error("Market Maker declined to sign")]
    MakerDeclined,
    #[error("Job failed during market maker sign attempt")]
    SignAttemptFailed,
    #[error("Invalid order signer address")]
    InvalidOrderSigner,
    #[error("Eth call validation failed")]
    EthCallFailed,
    #[error("Eth call approval validation failed")]
    EthCallApprovalFailed,
    #[error("Exceed expiry")]
    ExceedExpiry,
    #[error("Transaction hash have been submitted not exactly once")]
    SubmissionHashNotUnique,
    #[error("Non-approval job should not be processed by this method")]
    NonApprovalJob,
    #[error("Encountered a job with submissions but no maker signature")]
    MissingMakerSignature,
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Chain gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Quote server error: {0}")]
    QuoteServer(#[from] QuoteServerError),
}
