use std::fmt::Debug;

use chrono::{DateTime, Utc};
use ethers::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

use super::signature::OrderSignature;

/// Order hash for RFQ jobs, generated id for meta-transaction jobs.
pub type JobId = String;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum JobKind {
    RfqOrder,
    MetaTransaction,
    MetaTransactionV2,
}

impl JobKind {
    /// Every kind the worker sweeps, in processing order.
    pub const ALL: [JobKind; 3] = [
        JobKind::RfqOrder,
        JobKind::MetaTransaction,
        JobKind::MetaTransactionV2,
    ];
}

/// Persisted job status. Transitions are monotonic: once a terminal status
/// is written no further mutation occurs for that job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
pub enum JobStatus {
    #[default]
    PendingEnqueued,
    PendingProcessing,
    PendingLastLookAccepted,
    PendingSubmitted,
    SucceededConfirmed,
    FailedExpired,
    FailedRevertedConfirmed,
    FailedValidationNoTakerSignature,
    FailedPresignValidationFailed,
    FailedPresubmitValidationFailed,
    FailedSignFailed,
    FailedEthCallFailed,
    FailedLastLookDeclined,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            JobStatus::PendingEnqueued
                | JobStatus::PendingProcessing
                | JobStatus::PendingLastLookAccepted
                | JobStatus::PendingSubmitted
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum Workflow {
    /// Classic RFQ-M: the maker is granted a last look before settlement.
    Rfqm,
    /// Gasless VIP: no maker round-trip, the worker settles directly.
    Gasless,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTerms {
    pub token: Address,
    pub amount: U256,
}

/// A taker-signed gasless allowance step (permit or equivalent) executed
/// against the token contract before the trade itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub token: Address,
    /// EIP-712 payload signed by the taker; the gateway turns this into
    /// on-chain calldata.
    pub payload: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqOrderData {
    pub order_hash: H256,
    pub maker: Address,
    pub taker: Address,
    /// Quote server base URI of the maker that produced this order.
    pub maker_uri: String,
    /// OTC order packed field: expiry, nonce bucket and nonce in one word.
    pub expiry_and_nonce: U256,
    pub approval: Option<Approval>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTransactionData {
    pub mtx_hash: H256,
    pub signer: Address,
    pub calldata: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTransactionV2Data {
    pub mtx_hash: H256,
    pub signer: Address,
    pub calldata: Bytes,
    pub approval: Option<Approval>,
}

/// Kind-specific payload. The worker dispatches on this tag instead of
/// subtype method overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKindData {
    RfqOrder(RfqOrderData),
    MetaTransaction(MetaTransactionData),
    MetaTransactionV2(MetaTransactionV2Data),
}

/// One persisted unit of work: a single trade to validate, sign and settle
/// on behalf of a taker.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub chain_id: u64,
    pub created_at: DateTime<Utc>,
    /// Seconds since epoch. Immutable after creation.
    pub expiry: u64,
    pub integrator_id: Option<String>,
    /// Exclusive owner; a job surfacing under a different worker address is
    /// an inconsistency, never something to force.
    pub worker_address: Address,
    pub taker_signature: Option<OrderSignature>,
    pub maker_signature: Option<OrderSignature>,
    /// Tri-state: `None` = not yet asked, `Some(true)` = accepted,
    /// `Some(false)` = declined.
    pub last_look_result: Option<bool>,
    pub fee: FeeTerms,
    pub maker_token: Address,
    pub taker_token: Address,
    pub maker_amount: U256,
    pub taker_amount: U256,
    pub status: JobStatus,
    pub workflow: Workflow,
    pub data: JobKindData,
}

impl Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("chain_id", &self.chain_id)
            .field("status", &self.status)
            .field("expiry", &self.expiry)
            .field("worker_address", &self.worker_address)
            .finish()
    }
}

impl Job {
    pub fn kind(&self) -> JobKind {
        match self.data {
            JobKindData::RfqOrder(_) => JobKind::RfqOrder,
            JobKindData::MetaTransaction(_) => JobKind::MetaTransaction,
            JobKindData::MetaTransactionV2(_) => JobKind::MetaTransactionV2,
        }
    }

    pub fn rfq_data(&self) -> Option<&RfqOrderData> {
        match &self.data {
            JobKindData::RfqOrder(data) => Some(data),
            _ => None,
        }
    }

    pub fn approval(&self) -> Option<&Approval> {
        match &self.data {
            JobKindData::RfqOrder(data) => data.approval.as_ref(),
            JobKindData::MetaTransaction(_) => None,
            JobKindData::MetaTransactionV2(data) => data.approval.as_ref(),
        }
    }

    /// Whether settling this job consumes an allowance granted within the
    /// job itself rather than a pre-existing one.
    pub fn requires_allowance(&self) -> bool {
        self.approval().is_some()
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiry
    }
}
