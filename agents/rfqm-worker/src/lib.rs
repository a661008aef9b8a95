//! Worker-side execution engine of the RFQ-M settlement service: takes
//! persisted jobs through validation, maker last look, transaction
//! submission and confirmation, resubmitting with higher gas when the
//! market moves.

#![deny(clippy::unwrap_used, clippy::panic)]

pub use error::WorkerError;
pub use metrics::WorkerMetrics;
pub use settings::WorkerSettings;
pub use submission::{SubmissionContext, SubmissionContextStatus, SubmissionGroup, SubmitArgs};
pub use validation::{
    pad_signature, should_resubmit_transaction, validate_job, validate_meta_transaction_job,
    validate_rfq_v2_job,
};
pub use worker::RfqmWorker;

mod error;
mod metrics;
mod settings;
mod submission;
#[cfg(test)]
mod test_utils;
mod validation;
mod worker;
