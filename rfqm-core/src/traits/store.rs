use async_trait::async_trait;
use ethers::types::{Address, H256};

use crate::error::StoreResult;
use crate::types::{Job, JobKind, SubmissionType, TransactionSubmission};

/// Durable CRUD over jobs and transaction submissions. The worker never
/// infers state from memory across steps; this ledger is the source of
/// truth for crash recovery.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// All jobs of `kind` owned by `worker_address` that have not reached a
    /// terminal status.
    async fn find_unresolved_jobs(
        &self,
        kind: JobKind,
        worker_address: Address,
    ) -> StoreResult<Vec<Job>>;

    /// Look up one job by identifier (order hash or generated id).
    async fn find_job(&self, kind: JobKind, id: &str) -> StoreResult<Option<Job>>;

    /// Persist the current state of a job.
    async fn update_job(&self, job: &Job) -> StoreResult<()>;

    /// All broadcast attempts for a job, optionally narrowed to one
    /// submission type, oldest first.
    async fn find_transaction_submissions(
        &self,
        job_id: &str,
        submission_type: Option<SubmissionType>,
    ) -> StoreResult<Vec<TransactionSubmission>>;

    /// Insert a new broadcast attempt and return the stored row.
    async fn write_transaction_submission(
        &self,
        submission: &TransactionSubmission,
    ) -> StoreResult<TransactionSubmission>;

    /// Persist updated statuses for a batch of attempts.
    async fn update_transaction_submissions(
        &self,
        submissions: &[TransactionSubmission],
    ) -> StoreResult<()>;

    /// Look up a broadcast attempt by its transaction hash.
    async fn find_transaction_submission_by_hash(
        &self,
        hash: H256,
    ) -> StoreResult<Option<TransactionSubmission>>;

    /// Record a maker's last-look rejection for cooldown bookkeeping and
    /// analytics.
    async fn write_rejection_cooldown(
        &self,
        maker_id: &str,
        chain_id: u64,
        maker_token: Address,
        taker_token: Address,
        order_hash: &str,
    ) -> StoreResult<()>;
}
