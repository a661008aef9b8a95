pub use job::{
    Approval, FeeTerms, Job, JobId, JobKind, JobKindData, JobStatus, MetaTransactionData,
    MetaTransactionV2Data, RfqOrderData, Workflow,
};
pub use signature::{OrderSignature, RawOrderSignature, SignatureType};
pub use submission::{
    GasFees, SubmissionStatus, SubmissionType, SubmissionUuid, TransactionSubmission,
};

mod job;
mod signature;
mod submission;
