use chrono::Utc;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest};
use tracing::{info, instrument, warn};

use rfqm_core::{Job, JobKind, JobKindData, JobStatus, SubmissionType, Workflow};

use crate::error::WorkerError;
use crate::validation::{pad_signature, validate_job, validate_rfq_v2_job};

use super::RfqmWorker;

/// Whether this job's pipeline includes a maker last look.
fn requires_last_look(job: &Job) -> bool {
    job.kind() == JobKind::RfqOrder && job.workflow == Workflow::Rfqm
}

impl RfqmWorker {
    /// Apply the kind-specific validator and move the job into processing.
    /// A failing job has its terminal status persisted before this errors,
    /// so the record never disagrees with the failure.
    pub async fn check_job_preprocessing(&self, job: &mut Job) -> Result<(), WorkerError> {
        let now = Utc::now().timestamp() as u64;
        if let Some(failure) = validate_job(job, now) {
            self.finalize_job(job, failure).await?;
            return Err(WorkerError::JobValidationFailed);
        }
        if job.status == JobStatus::PendingEnqueued {
            job.status = JobStatus::PendingProcessing;
            self.store.update_job(job).await?;
        }
        Ok(())
    }

    /// Build trade calldata for an RFQ v2 job. Once any trade submission
    /// exists this goes straight to calldata: a maker is never asked twice
    /// and balances are never re-checked after chain submission has begun.
    #[instrument(skip_all, name = "RfqmWorker::prepare_rfq_trade", fields(job_id = %job.id))]
    pub async fn prepare_rfq_trade(
        &self,
        job: &mut Job,
        should_check_last_look: bool,
    ) -> Result<Bytes, WorkerError> {
        let existing = self
            .store
            .find_transaction_submissions(&job.id, Some(SubmissionType::Trade))
            .await?;
        if !existing.is_empty() {
            info!(job_id = %job.id, "Trade submissions exist, resuming with stored order data");
            return Ok(self.gateway.generate_taker_signed_otc_order_calldata(job)?);
        }

        self.check_job_preprocessing(job).await?;
        if should_check_last_look {
            self.check_last_look(job).await?;
        } else {
            // gasless VIP: no maker round-trip, but funds are still checked
            self.check_maker_funds(job, JobStatus::FailedPresubmitValidationFailed)
                .await?;
        }
        let calldata = self.gateway.generate_taker_signed_otc_order_calldata(job)?;
        self.dry_run(
            job,
            self.gateway.exchange_proxy(),
            &calldata,
            WorkerError::EthCallFailed,
        )
        .await?;
        Ok(calldata)
    }

    /// Build trade calldata for a meta-transaction job. Meta-transactions
    /// have no last look; the taker's funds are still validated before
    /// paying for a broadcast.
    #[instrument(skip_all, name = "RfqmWorker::prepare_meta_transaction_trade", fields(job_id = %job.id))]
    pub async fn prepare_meta_transaction_trade(&self, job: &mut Job) -> Result<Bytes, WorkerError> {
        let existing = self
            .store
            .find_transaction_submissions(&job.id, Some(SubmissionType::Trade))
            .await?;
        if !existing.is_empty() {
            info!(job_id = %job.id, "Trade submissions exist, resuming with stored transaction data");
            return Ok(self.gateway.generate_meta_transaction_calldata(job)?);
        }

        self.check_job_preprocessing(job).await?;
        self.check_taker_funds(job).await?;
        let calldata = self.gateway.generate_meta_transaction_calldata(job)?;
        self.dry_run(
            job,
            self.gateway.exchange_proxy(),
            &calldata,
            WorkerError::EthCallFailed,
        )
        .await?;
        Ok(calldata)
    }

    /// Build approval calldata. The first attempt runs the full validation
    /// pipeline (including last look for RFQ jobs) and the approval dry
    /// run; re-entry after a crash only regenerates calldata, and requires
    /// the maker signature obtained the first time around.
    #[instrument(skip_all, name = "RfqmWorker::prepare_approval", fields(job_id = %job.id))]
    pub async fn prepare_approval(&self, job: &mut Job) -> Result<Bytes, WorkerError> {
        let approval = job.approval().cloned().ok_or(WorkerError::NonApprovalJob)?;
        let existing = self
            .store
            .find_transaction_submissions(&job.id, Some(SubmissionType::Approval))
            .await?;
        if !existing.is_empty() {
            if requires_last_look(job) && job.maker_signature.is_none() {
                return Err(WorkerError::MissingMakerSignature);
            }
            return Ok(self.gateway.generate_approval_calldata(job, &approval)?);
        }

        self.check_job_preprocessing(job).await?;
        match job.kind() {
            JobKind::RfqOrder if requires_last_look(job) => self.check_last_look(job).await?,
            JobKind::RfqOrder => {
                self.check_maker_funds(job, JobStatus::FailedPresubmitValidationFailed)
                    .await?
            }
            JobKind::MetaTransaction | JobKind::MetaTransactionV2 => {
                self.check_taker_funds(job).await?
            }
        }
        let calldata = self.gateway.generate_approval_calldata(job, &approval)?;
        // the dry run only makes sense on the very first attempt
        self.dry_run(
            job,
            approval.token,
            &calldata,
            WorkerError::EthCallApprovalFailed,
        )
        .await?;
        Ok(calldata)
    }

    /// Re-validate the job, check the maker's funds and solicit (or reuse)
    /// the maker's last-look signature. The expiry guard mirrors
    /// preprocessing because time advances between steps.
    #[instrument(skip_all, name = "RfqmWorker::check_last_look", fields(job_id = %job.id))]
    pub async fn check_last_look(&self, job: &mut Job) -> Result<(), WorkerError> {
        let now = Utc::now().timestamp() as u64;
        if let Some(failure) = validate_rfq_v2_job(job, now) {
            self.finalize_job(job, failure).await?;
            return Err(WorkerError::JobValidationFailed);
        }
        self.check_maker_funds(job, JobStatus::FailedPresignValidationFailed)
            .await?;

        if job.maker_signature.is_some() {
            // idempotent re-entry; the maker already signed
            return Ok(());
        }
        self.request_maker_signature(job).await
    }

    async fn request_maker_signature(&self, job: &mut Job) -> Result<(), WorkerError> {
        let Some(data) = job.rfq_data().cloned() else {
            warn!(job_id = %job.id, "Last look requested for a non-RFQ job");
            return Err(WorkerError::JobValidationFailed);
        };
        let timeout = self.settings.quote_server_timeout();
        match self.quote_server.sign_v2(job, &data.maker_uri, timeout).await {
            Ok(Some(raw)) => {
                let signature = match pad_signature(&raw) {
                    Ok(signature) => signature,
                    Err(_) => {
                        warn!(job_id = %job.id, "Maker returned a malformed signature");
                        self.finalize_job(job, JobStatus::FailedSignFailed).await?;
                        return Err(WorkerError::SignAttemptFailed);
                    }
                };
                let valid =
                    self.gateway
                        .is_valid_order_signer(data.maker, &signature, data.order_hash)?;
                if !valid {
                    warn!(
                        job_id = %job.id,
                        maker = %data.maker,
                        "Recovered signer does not match the order maker"
                    );
                    self.finalize_job(job, JobStatus::FailedSignFailed).await?;
                    return Err(WorkerError::InvalidOrderSigner);
                }
                job.last_look_result = Some(true);
                job.maker_signature = Some(signature);
                job.status = JobStatus::PendingLastLookAccepted;
                self.store.update_job(job).await?;
                info!(job_id = %job.id, "Maker accepted last look");
                Ok(())
            }
            Ok(None) => {
                info!(job_id = %job.id, maker_uri = %data.maker_uri, "Maker declined last look");
                job.last_look_result = Some(false);
                job.status = JobStatus::FailedLastLookDeclined;
                self.store.update_job(job).await?;
                self.metrics
                    .record_job_outcome(job.kind(), JobStatus::FailedLastLookDeclined);
                self.metrics.record_maker_decline(job.chain_id);
                self.record_maker_decline_bookkeeping(job, &data.maker_uri)
                    .await;
                Err(WorkerError::MakerDeclined)
            }
            Err(err) => {
                warn!(?err, job_id = %job.id, "Maker sign attempt failed");
                self.finalize_job(job, JobStatus::FailedSignFailed).await?;
                Err(WorkerError::SignAttemptFailed)
            }
        }
    }

    /// Cooldown and rejection-analytics writes after a decline. Best
    /// effort: the decline itself is already persisted on the job.
    async fn record_maker_decline_bookkeeping(&self, job: &Job, maker_uri: &str) {
        let Some(maker_id) = self.maker_registry.find_maker_id_with_rfqm_uri(maker_uri) else {
            warn!(%maker_uri, "No maker registered for quote server URI");
            return;
        };
        let until = Utc::now() + self.settings.maker_cooldown();
        if let Err(err) = self
            .maker_registry
            .add_maker_to_cooldown(&maker_id, until, job.chain_id, job.maker_token, job.taker_token)
            .await
        {
            warn!(?err, %maker_id, "Failed to add maker to cooldown");
        }
        if let Err(err) = self
            .store
            .write_rejection_cooldown(
                &maker_id,
                job.chain_id,
                job.maker_token,
                job.taker_token,
                &job.id,
            )
            .await
        {
            warn!(?err, %maker_id, "Failed to record last-look rejection");
        }
    }

    /// Verify the maker can fill: min(balance, allowance) when the job
    /// carries its own allowance transfer, the cached plain balance
    /// otherwise. Persists `failure_status` before erroring when short.
    async fn check_maker_funds(
        &self,
        job: &mut Job,
        failure_status: JobStatus,
    ) -> Result<(), WorkerError> {
        let maker = match job.rfq_data() {
            Some(data) => data.maker,
            None => return Ok(()),
        };
        let balances = if job.requires_allowance() {
            self.gateway
                .get_min_of_balances_and_allowances(
                    maker,
                    &[job.maker_token],
                    self.gateway.exchange_proxy(),
                )
                .await?
        } else {
            self.balance_cache
                .get_erc20_owner_balances(job.chain_id, maker, &[job.maker_token])
                .await?
        };
        let available = balances.first().copied().unwrap_or_default();
        if available < job.maker_amount {
            warn!(
                job_id = %job.id,
                %available,
                required = %job.maker_amount,
                "Maker funds insufficient"
            );
            self.finalize_job(job, failure_status).await?;
            return Err(match failure_status {
                JobStatus::FailedPresignValidationFailed => WorkerError::PresignValidationFailed,
                _ => WorkerError::PresubmitValidationFailed,
            });
        }
        Ok(())
    }

    /// Verify the signer of a meta-transaction holds the input token amount
    /// it is selling.
    async fn check_taker_funds(&self, job: &mut Job) -> Result<(), WorkerError> {
        let signer = match &job.data {
            JobKindData::MetaTransaction(data) => data.signer,
            JobKindData::MetaTransactionV2(data) => data.signer,
            JobKindData::RfqOrder(_) => return Ok(()),
        };
        let balances = self
            .balance_cache
            .get_erc20_owner_balances(job.chain_id, signer, &[job.taker_token])
            .await?;
        let available = balances.first().copied().unwrap_or_default();
        if available < job.taker_amount {
            warn!(
                job_id = %job.id,
                %available,
                required = %job.taker_amount,
                "Taker funds insufficient"
            );
            self.finalize_job(job, JobStatus::FailedPresubmitValidationFailed)
                .await?;
            return Err(WorkerError::PresubmitValidationFailed);
        }
        Ok(())
    }

    /// Gas-estimation dry run of `calldata` against `to`: the last chance
    /// to catch a revert before paying for a real broadcast.
    async fn dry_run(
        &self,
        job: &mut Job,
        to: Address,
        calldata: &Bytes,
        failure: WorkerError,
    ) -> Result<(), WorkerError> {
        let tx = TypedTransaction::Eip1559(
            Eip1559TransactionRequest::new()
                .from(job.worker_address)
                .to(to)
                .data(calldata.clone())
                .chain_id(job.chain_id),
        );
        if let Err(err) = self.gateway.estimate_gas(&tx).await {
            warn!(?err, job_id = %job.id, "Dry run failed");
            self.finalize_job(job, JobStatus::FailedEthCallFailed).await?;
            return Err(failure);
        }
        Ok(())
    }
}
