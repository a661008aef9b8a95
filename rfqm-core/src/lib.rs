//! Domain model and collaborator contracts for the RFQ-M settlement worker.
//!
//! The worker agent consumes everything here through trait objects, so the
//! job lifecycle machine stays testable without a live chain or database.

#![deny(clippy::unwrap_used, clippy::panic)]

pub use error::{GatewayError, GatewayResult, QuoteServerError, StoreError, StoreResult};
pub use traits::{
    BalanceCache, ChainGateway, GasAttendant, JobStore, MakerRegistry, QuoteServerClient,
    SignedTransaction,
};
pub use types::{
    Approval, FeeTerms, GasFees, Job, JobId, JobKind, JobKindData, JobStatus, MetaTransactionData,
    MetaTransactionV2Data, OrderSignature, RawOrderSignature, RfqOrderData, SignatureType,
    SubmissionStatus, SubmissionType, SubmissionUuid, TransactionSubmission, Workflow,
};

mod error;
mod traits;
mod types;
