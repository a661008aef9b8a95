use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use derive_new::new;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, Eip1559TransactionRequest, U256};
use tokio::time::sleep;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use rfqm_core::{
    ChainGateway, GasAttendant, GasFees, JobId, JobKind, JobStore, SubmissionStatus,
    SubmissionType, TransactionSubmission,
};

use crate::error::WorkerError;
use crate::metrics::WorkerMetrics;
use crate::validation::should_resubmit_transaction;

use super::group::SubmissionGroup;

/// Everything the watch engine needs to know about one submission, with no
/// job-kind specifics: those stay behind the status callback.
#[derive(Debug, Clone)]
pub struct SubmitArgs {
    pub job_id: JobId,
    pub kind: JobKind,
    pub submission_type: SubmissionType,
    pub chain_id: u64,
    pub from: Address,
    pub to: Address,
    pub calldata: Bytes,
    /// Seconds since epoch; the watch loop's only cancellation mechanism.
    pub expiry: u64,
}

/// Job-visible status of a submission group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionContextStatus {
    PendingSubmitted,
    SucceededConfirmed,
    FailedRevertedConfirmed,
    FailedExpired,
}

/// Drives a submission group from none/partial persisted state through to a
/// terminal chain outcome: broadcast, receipt polling, fee escalation,
/// crash recovery. Job-status translation is injected by the caller; the
/// context touches the store only for TransactionSubmission rows.
#[derive(new)]
pub struct SubmissionContext {
    store: Arc<dyn JobStore>,
    gateway: Arc<dyn ChainGateway>,
    gas_attendant: Arc<dyn GasAttendant>,
    metrics: WorkerMetrics,
    watch_interval: Duration,
}

impl SubmissionContext {
    /// Submit (or resume) a transaction and watch it to a terminal outcome.
    ///
    /// `on_status_update(new, old)` fires on every job-visible transition;
    /// it is responsible for translating context status into job status and
    /// persisting it. Expiry without a receipt finalizes the group and
    /// fails with [`WorkerError::ExceedExpiry`].
    #[instrument(
        skip_all,
        name = "SubmissionContext::submit_to_chain",
        fields(job_id = %args.job_id, kind = %args.kind, submission_type = %args.submission_type)
    )]
    pub async fn submit_to_chain<F, Fut>(
        &self,
        args: &SubmitArgs,
        on_status_update: F,
    ) -> Result<SubmissionContextStatus, WorkerError>
    where
        F: Fn(SubmissionContextStatus, Option<SubmissionContextStatus>) -> Fut,
        Fut: Future<Output = Result<(), WorkerError>>,
    {
        let rows = self
            .store
            .find_transaction_submissions(&args.job_id, Some(args.submission_type))
            .await?;
        let existing = SubmissionGroup::from_rows(rows)?;

        if let Some(group) = &existing {
            // a restarted worker may pick up a group the chain already decided
            if let Some(outcome) = group.terminal_context_status() {
                info!(?outcome, "Submission group already terminal");
                on_status_update(outcome, None).await?;
                return Ok(outcome);
            }
        }

        let mut current = None;
        let mut group = match existing {
            None => {
                let attempt = self.broadcast_attempt(args, None).await?;
                SubmissionGroup::single(attempt)
            }
            Some(group) => self.recover_group(group, args, &on_status_update).await?,
        };
        self.update_status(
            &on_status_update,
            &mut current,
            SubmissionContextStatus::PendingSubmitted,
        )
        .await?;
        self.watch(&mut group, args, &on_status_update, &mut current)
            .await
    }

    /// Resume a non-terminal group found in the store.
    ///
    /// A `Presubmit` head means the worker died between signing and
    /// confirming the broadcast: if the transaction made it to the network
    /// it is promoted to `Submitted` without re-estimating anything; if it
    /// never left and the job is still live, it is retired and rebroadcast
    /// with the same nonce and fees.
    async fn recover_group<F, Fut>(
        &self,
        mut group: SubmissionGroup,
        args: &SubmitArgs,
        on_status_update: &F,
    ) -> Result<SubmissionGroup, WorkerError>
    where
        F: Fn(SubmissionContextStatus, Option<SubmissionContextStatus>) -> Fut,
        Fut: Future<Output = Result<(), WorkerError>>,
    {
        let latest = group.latest().clone();
        if latest.status != SubmissionStatus::Presubmit {
            return Ok(group);
        }

        let on_network = match latest.transaction_hash {
            Some(hash) => self.gateway.get_transaction(hash).await?.is_some(),
            None => false,
        };
        if on_network {
            info!(
                tx_hash = ?latest.transaction_hash,
                "Presubmit transaction found on network, resuming watch"
            );
            self.set_latest_status(&mut group, SubmissionStatus::Submitted)
                .await?;
            return Ok(group);
        }

        let now = Utc::now().timestamp() as u64;
        if now >= args.expiry {
            self.set_latest_status(&mut group, SubmissionStatus::FailedExpired)
                .await?;
            on_status_update(SubmissionContextStatus::FailedExpired, None).await?;
            return Err(WorkerError::ExceedExpiry);
        }

        info!(
            tx_hash = ?latest.transaction_hash,
            "Presubmit transaction never reached the network, rebroadcasting"
        );
        self.set_latest_status(&mut group, SubmissionStatus::FailedUnsubmitted)
            .await?;
        let attempt = self
            .broadcast_attempt(args, Some((latest.nonce, latest.fees())))
            .await?;
        if attempt.uuid == latest.uuid {
            // the re-sign hashed identically and reused the retired row
            if let Some(last) = group.attempts_mut().last_mut() {
                *last = attempt;
            }
        } else {
            group.push(attempt);
        }
        Ok(group)
    }

    /// Poll for receipts until the group resolves, escalating fees when the
    /// recommended gas rate outruns the last broadcast.
    async fn watch<F, Fut>(
        &self,
        group: &mut SubmissionGroup,
        args: &SubmitArgs,
        on_status_update: &F,
        current: &mut Option<SubmissionContextStatus>,
    ) -> Result<SubmissionContextStatus, WorkerError>
    where
        F: Fn(SubmissionContextStatus, Option<SubmissionContextStatus>) -> Fut,
        Fut: Future<Output = Result<(), WorkerError>>,
    {
        loop {
            let hashes = group.watched_hashes();
            let receipts = self.gateway.get_receipts(&hashes).await?;
            if let Some(receipt) = receipts.into_iter().next() {
                let succeeded = receipt.status == Some(1u64.into());
                let mined_status = if succeeded {
                    SubmissionStatus::SucceededConfirmed
                } else {
                    SubmissionStatus::FailedRevertedConfirmed
                };
                for attempt in group.attempts_mut() {
                    attempt.status = if attempt.transaction_hash == Some(receipt.transaction_hash)
                    {
                        mined_status
                    } else {
                        SubmissionStatus::FailedUnsubmitted
                    };
                }
                self.store
                    .update_transaction_submissions(group.attempts())
                    .await?;
                let outcome = if succeeded {
                    SubmissionContextStatus::SucceededConfirmed
                } else {
                    SubmissionContextStatus::FailedRevertedConfirmed
                };
                info!(tx_hash = ?receipt.transaction_hash, ?outcome, "Transaction mined");
                self.update_status(on_status_update, current, outcome).await?;
                return Ok(outcome);
            }

            let now = Utc::now().timestamp() as u64;
            if now >= args.expiry {
                warn!("No receipt before expiry, abandoning submission group");
                for attempt in group.attempts_mut() {
                    if !attempt.status.is_terminal() {
                        attempt.status = SubmissionStatus::FailedExpired;
                    }
                }
                self.store
                    .update_transaction_submissions(group.attempts())
                    .await?;
                self.update_status(
                    on_status_update,
                    current,
                    SubmissionContextStatus::FailedExpired,
                )
                .await?;
                return Err(WorkerError::ExceedExpiry);
            }

            let recommended = self
                .gas_attendant
                .get_expected_transaction_gas_rate()
                .await?;
            let last_fees = group.latest().fees();
            if should_resubmit_transaction(&last_fees, recommended.max_fee_per_gas) {
                info!(
                    previous_max_fee = %last_fees.max_fee_per_gas,
                    recommended_max_fee = %recommended.max_fee_per_gas,
                    nonce = %group.nonce(),
                    "Recommended gas rate rose at least 10%, escalating fees"
                );
                let attempt = self
                    .broadcast_attempt(args, Some((group.nonce(), recommended)))
                    .await?;
                self.metrics.record_gas_escalation(args.submission_type);
                group.push(attempt);
            }

            sleep(self.watch_interval).await;
        }
    }

    /// Sign and broadcast one attempt. `replacement` carries the nonce and
    /// fees to reuse; a fresh submission fetches both and is the only path
    /// that asks for an access list.
    async fn broadcast_attempt(
        &self,
        args: &SubmitArgs,
        replacement: Option<(U256, GasFees)>,
    ) -> Result<TransactionSubmission, WorkerError> {
        let is_first = replacement.is_none();
        let (nonce, fees) = match replacement {
            Some(reused) => reused,
            None => {
                let fees = self
                    .gas_attendant
                    .get_expected_transaction_gas_rate()
                    .await?;
                let nonce = self.gateway.get_nonce(args.from).await?;
                (nonce, fees)
            }
        };

        let request = Eip1559TransactionRequest::new()
            .from(args.from)
            .to(args.to)
            .data(args.calldata.clone())
            .nonce(nonce)
            .chain_id(args.chain_id)
            .max_fee_per_gas(fees.max_fee_per_gas)
            .max_priority_fee_per_gas(fees.max_priority_fee_per_gas);
        let mut tx = TypedTransaction::Eip1559(request);
        let gas = self.gateway.estimate_gas(&tx).await?;
        tx.set_gas(gas);

        if is_first {
            match self.gateway.create_access_list(&tx).await {
                Ok(result) => {
                    tx.set_access_list(result.access_list);
                }
                Err(err) => {
                    warn!(?err, "Access list creation failed, submitting without one");
                }
            }
        }

        let signed = self.gateway.sign_transaction(&tx).await?;
        if let Some(mut existing) = self
            .store
            .find_transaction_submission_by_hash(signed.hash)
            .await?
        {
            // an identical re-sign of a retired attempt hashes to the same
            // transaction; reuse its row, a hash maps to exactly one row
            info!(tx_hash = ?signed.hash, "Re-signed transaction matches an existing attempt");
            self.gateway.submit_signed_transaction(signed.raw).await?;
            existing.status = SubmissionStatus::Submitted;
            self.store
                .update_transaction_submissions(std::slice::from_ref(&existing))
                .await?;
            self.metrics
                .record_transaction_submission(args.submission_type);
            return Ok(existing);
        }
        let row = TransactionSubmission {
            uuid: Uuid::new_v4(),
            job_id: args.job_id.clone(),
            submission_type: args.submission_type,
            nonce,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            from: args.from,
            to: args.to,
            transaction_hash: Some(signed.hash),
            status: SubmissionStatus::Presubmit,
            created_at: Utc::now(),
        };
        // the Presubmit row lands before the broadcast so a crash in
        // between stays recoverable by hash lookup
        let mut row = self.store.write_transaction_submission(&row).await?;
        self.gateway.submit_signed_transaction(signed.raw).await?;
        row.status = SubmissionStatus::Submitted;
        self.store
            .update_transaction_submissions(std::slice::from_ref(&row))
            .await?;
        self.metrics
            .record_transaction_submission(args.submission_type);
        info!(tx_hash = ?signed.hash, nonce = %nonce, "Transaction submitted to node");
        Ok(row)
    }

    async fn set_latest_status(
        &self,
        group: &mut SubmissionGroup,
        status: SubmissionStatus,
    ) -> Result<(), WorkerError> {
        if let Some(latest) = group.attempts_mut().last_mut() {
            latest.status = status;
            self.store
                .update_transaction_submissions(std::slice::from_ref(latest))
                .await?;
        }
        Ok(())
    }

    async fn update_status<F, Fut>(
        &self,
        on_status_update: &F,
        current: &mut Option<SubmissionContextStatus>,
        next: SubmissionContextStatus,
    ) -> Result<(), WorkerError>
    where
        F: Fn(SubmissionContextStatus, Option<SubmissionContextStatus>) -> Fut,
        Fut: Future<Output = Result<(), WorkerError>>,
    {
        on_status_update(next, *current).await?;
        *current = Some(next);
        Ok(())
    }
}
