use ethers::types::{H256, U256};

use rfqm_core::{GasFees, Job, JobKind, JobStatus, OrderSignature, RawOrderSignature};

use crate::error::WorkerError;

const RESUBMIT_MULTIPLIER_NUMERATOR: u32 = 110;
const RESUBMIT_MULTIPLIER_DENOMINATOR: u32 = 100;

/// Whether a stuck transaction should be replaced at the freshly observed
/// gas rate. Resubmits only when the new price is at least 10% above the
/// last broadcast's max fee; smaller moves are churn, not a stuck
/// transaction.
pub fn should_resubmit_transaction(current: &GasFees, new_max_fee_per_gas: U256) -> bool {
    let threshold = current
        .max_fee_per_gas
        .saturating_mul(U256::from(RESUBMIT_MULTIPLIER_NUMERATOR))
        / U256::from(RESUBMIT_MULTIPLIER_DENOMINATOR);
    new_max_fee_per_gas >= threshold
}

/// Validate an RFQ v2 job at `now` (seconds since epoch). Returns the
/// failure status to apply, or `None` when the job is processable.
pub fn validate_rfq_v2_job(job: &Job, now: u64) -> Option<JobStatus> {
    if job.is_expired(now) {
        return Some(JobStatus::FailedExpired);
    }
    if job.taker_signature.is_none() {
        return Some(JobStatus::FailedValidationNoTakerSignature);
    }
    None
}

/// Validate a meta-transaction job (v1 or v2) at `now`.
pub fn validate_meta_transaction_job(job: &Job, now: u64) -> Option<JobStatus> {
    if job.is_expired(now) {
        return Some(JobStatus::FailedExpired);
    }
    None
}

/// Kind dispatch over the pure validators.
pub fn validate_job(job: &Job, now: u64) -> Option<JobStatus> {
    match job.kind() {
        JobKind::RfqOrder => validate_rfq_v2_job(job, now),
        JobKind::MetaTransaction | JobKind::MetaTransactionV2 => {
            validate_meta_transaction_job(job, now)
        }
    }
}

/// Normalize a wire signature into full 32-byte `r`/`s` words.
///
/// Some maker implementations hex-encode `r`/`s` without the leading zero
/// byte, so a component can arrive one byte short. The component is
/// restored by left-padding rather than rejected; whether these should be
/// rejected outright instead is tracked upstream with the offending makers.
/// Components longer than 32 bytes are never valid.
pub fn pad_signature(raw: &RawOrderSignature) -> Result<OrderSignature, WorkerError> {
    Ok(OrderSignature {
        signature_type: raw.signature_type,
        v: raw.v,
        r: pad_component(&raw.r)?,
        s: pad_component(&raw.s)?,
    })
}

fn pad_component(component: &[u8]) -> Result<H256, WorkerError> {
    if component.len() > 32 {
        return Err(WorkerError::SignAttemptFailed);
    }
    let mut word = [0u8; 32];
    word[32 - component.len()..].copy_from_slice(component);
    Ok(H256::from(word))
}
