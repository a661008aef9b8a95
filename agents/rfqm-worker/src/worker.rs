use std::sync::Arc;

use ethers::types::{Address, Bytes};
use tracing::{error, info, instrument, warn};

use rfqm_core::{
    BalanceCache, ChainGateway, GasAttendant, Job, JobKind, JobStatus, JobStore, MakerRegistry,
    QuoteServerClient, SubmissionType, Workflow,
};

use crate::error::WorkerError;
use crate::metrics::WorkerMetrics;
use crate::settings::WorkerSettings;
use crate::submission::{SubmissionContext, SubmissionContextStatus, SubmissionGroup, SubmitArgs};

mod prepare;


/// Per-job orchestration: intake, ownership checks, validation, maker last
/// look, and the approval/trade submission pipeline. All collaborators are
/// injected as trait objects; nothing here talks to a chain or database
/// directly.
pub struct RfqmWorker {
    store: Arc<dyn JobStore>,
    gateway: Arc<dyn ChainGateway>,
    quote_server: Arc<dyn QuoteServerClient>,
    balance_cache: Arc<dyn BalanceCache>,
    maker_registry: Arc<dyn MakerRegistry>,
    submission_context: SubmissionContext,
    settings: WorkerSettings,
    metrics: WorkerMetrics,
}

impl RfqmWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn JobStore>,
        gateway: Arc<dyn ChainGateway>,
        gas_attendant: Arc<dyn GasAttendant>,
        quote_server: Arc<dyn QuoteServerClient>,
        balance_cache: Arc<dyn BalanceCache>,
        maker_registry: Arc<dyn MakerRegistry>,
        settings: WorkerSettings,
        metrics: WorkerMetrics,
    ) -> Self {
        let submission_context = SubmissionContext::new(
            store.clone(),
            gateway.clone(),
            gas_attendant,
            metrics.clone(),
            settings.transaction_watch_interval(),
        );
        Self {
            store,
            gateway,
            quote_server,
            balance_cache,
            maker_registry,
            submission_context,
            settings,
            metrics,
        }
    }

    /// One intake sweep for a worker slot: fetch the unresolved jobs of
    /// every kind owned by `worker_address` and drive each to its next
    /// stable point. Jobs are independent; a failing job never aborts the
    /// sweep.
    #[instrument(skip(self), name = "RfqmWorker::process_jobs_for_worker")]
    pub async fn process_jobs_for_worker(
        &self,
        worker_index: u32,
        worker_address: Address,
    ) -> Result<(), WorkerError> {
        self.metrics.update_liveness_metric(worker_index);
        for kind in JobKind::ALL {
            let jobs = self
                .store
                .find_unresolved_jobs(kind, worker_address)
                .await?;
            info!(%kind, count = jobs.len(), "Fetched unresolved jobs");
            for job in jobs {
                if let Err(err) = self.process_job(&job.id, kind, worker_address).await {
                    error!(?err, job_id = %job.id, %kind, "Job processing failed");
                }
            }
        }
        Ok(())
    }

    /// Fetch one job, verify ownership and dispatch it. A vanished job or
    /// an ownership mismatch is logged and skipped: neither is this
    /// worker's to act on, and neither should take the loop down.
    #[instrument(skip(self), name = "RfqmWorker::process_job")]
    pub async fn process_job(
        &self,
        id: &str,
        kind: JobKind,
        worker_address: Address,
    ) -> Result<(), WorkerError> {
        let Some(job) = self.store.find_job(kind, id).await? else {
            error!(job_id = %id, %kind, "No job found for identifier");
            return Ok(());
        };
        if job.worker_address != worker_address {
            error!(
                job_id = %id,
                claimed_by = %job.worker_address,
                caller = %worker_address,
                "Worker was sent a job claimed by a different worker"
            );
            return Ok(());
        }
        if job.approval().is_some() {
            self.process_approval_and_trade(job).await
        } else {
            self.process_trade(job).await
        }
    }

    /// Settle a job that needs an allowance step first. The approval
    /// submission must confirm before any trade transaction exists; an
    /// approval that resolves any other way finalizes the job instead.
    #[instrument(skip_all, name = "RfqmWorker::process_approval_and_trade", fields(job_id = %job.id))]
    pub async fn process_approval_and_trade(&self, mut job: Job) -> Result<(), WorkerError> {
        let Some(approval) = job.approval().cloned() else {
            return Err(WorkerError::NonApprovalJob);
        };
        let rows = self
            .store
            .find_transaction_submissions(&job.id, Some(SubmissionType::Approval))
            .await?;
        let history_outcome =
            SubmissionGroup::from_rows(rows)?.and_then(|group| group.terminal_context_status());
        match history_outcome {
            Some(SubmissionContextStatus::SucceededConfirmed) => {
                info!(job_id = %job.id, "Approval already confirmed, proceeding to trade");
            }
            Some(outcome) => {
                warn!(job_id = %job.id, ?outcome, "Approval did not confirm, finalizing job");
                self.finalize_job(&mut job, JobStatus::FailedRevertedConfirmed)
                    .await?;
                return Ok(());
            }
            None => {
                let calldata = self.prepare_approval(&mut job).await?;
                let outcome = self
                    .submit_for_job(&job, SubmissionType::Approval, approval.token, calldata)
                    .await?;
                if outcome != SubmissionContextStatus::SucceededConfirmed {
                    // the status mapping already finalized the job
                    warn!(job_id = %job.id, ?outcome, "Approval did not confirm, stopping");
                    return Ok(());
                }
            }
        }
        self.process_trade(job).await
    }

    /// Trade-only continuation, used directly when no approval step exists
    /// and as the second leg once an approval has confirmed.
    #[instrument(skip_all, name = "RfqmWorker::process_trade", fields(job_id = %job.id, kind = %job.kind()))]
    pub async fn process_trade(&self, mut job: Job) -> Result<(), WorkerError> {
        let calldata = match job.kind() {
            JobKind::RfqOrder => {
                let should_check_last_look = job.workflow == Workflow::Rfqm;
                self.prepare_rfq_trade(&mut job, should_check_last_look)
                    .await?
            }
            JobKind::MetaTransaction | JobKind::MetaTransactionV2 => {
                self.prepare_meta_transaction_trade(&mut job).await?
            }
        };
        let to = self.gateway.exchange_proxy();
        let outcome = self
            .submit_for_job(&job, SubmissionType::Trade, to, calldata)
            .await?;
        info!(job_id = %job.id, ?outcome, "Trade submission resolved");
        Ok(())
    }

    /// Run a submission through the watch engine, translating its status
    /// transitions into job statuses. This mapping is the only job-level
    /// policy the watch engine ever sees.
    async fn submit_for_job(
        &self,
        job: &Job,
        submission_type: SubmissionType,
        to: Address,
        calldata: Bytes,
    ) -> Result<SubmissionContextStatus, WorkerError> {
        let args = SubmitArgs {
            job_id: job.id.clone(),
            kind: job.kind(),
            submission_type,
            chain_id: job.chain_id,
            from: job.worker_address,
            to,
            calldata,
            expiry: job.expiry,
        };
        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let base = job.clone();
        self.submission_context
            .submit_to_chain(&args, move |new_status, _old_status| {
                let store = store.clone();
                let metrics = metrics.clone();
                let mut job = base.clone();
                async move {
                    if let Some(status) = map_submission_status(submission_type, new_status) {
                        job.status = status;
                        store.update_job(&job).await?;
                        if status.is_terminal() {
                            metrics.record_job_outcome(job.kind(), status);
                        }
                    }
                    Ok(())
                }
            })
            .await
    }

    /// Persist a terminal status, guarding monotonicity: a job that already
    /// reached a terminal status is never overwritten.
    async fn finalize_job(&self, job: &mut Job, status: JobStatus) -> Result<(), WorkerError> {
        if job.status.is_terminal() {
            warn!(
                job_id = %job.id,
                current = %job.status,
                requested = %status,
                "Job already terminal, not overwriting"
            );
            return Ok(());
        }
        job.status = status;
        self.store.update_job(job).await?;
        self.metrics.record_job_outcome(job.kind(), status);
        Ok(())
    }
}

/// Translate a chain-submission status into the job status it implies for
/// the given submission type. Approval progress keeps the job in
/// `PendingProcessing`; only the trade leg drives the pipeline statuses
/// downstream pollers key on.
fn map_submission_status(
    submission_type: SubmissionType,
    status: SubmissionContextStatus,
) -> Option<JobStatus> {
    match (submission_type, status) {
        (SubmissionType::Trade, SubmissionContextStatus::PendingSubmitted) => {
            Some(JobStatus::PendingSubmitted)
        }
        (SubmissionType::Trade, SubmissionContextStatus::SucceededConfirmed) => {
            Some(JobStatus::SucceededConfirmed)
        }
        (SubmissionType::Trade, SubmissionContextStatus::FailedRevertedConfirmed) => {
            Some(JobStatus::FailedRevertedConfirmed)
        }
        (SubmissionType::Trade, SubmissionContextStatus::FailedExpired) => {
            Some(JobStatus::FailedExpired)
        }
        (SubmissionType::Approval, SubmissionContextStatus::FailedRevertedConfirmed) => {
            Some(JobStatus::FailedRevertedConfirmed)
        }
        (SubmissionType::Approval, SubmissionContextStatus::FailedExpired) => {
            Some(JobStatus::FailedExpired)
        }
        (SubmissionType::Approval, _) => None,
    }
}
