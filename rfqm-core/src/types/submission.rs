use std::fmt::Debug;

use chrono::{DateTime, Utc};
use ethers::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type SubmissionUuid = Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
pub enum SubmissionType {
    Approval,
    Trade,
}

/// Status of one broadcast attempt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
pub enum SubmissionStatus {
    /// Row written, broadcast not yet confirmed to have reached the network.
    #[default]
    Presubmit,
    /// Accepted by a node, pending inclusion.
    Submitted,
    SucceededConfirmed,
    FailedRevertedConfirmed,
    FailedExpired,
    /// Superseded attempt; its nonce was consumed by a sibling, or its
    /// broadcast never reached the network.
    FailedUnsubmitted,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            SubmissionStatus::Presubmit | SubmissionStatus::Submitted
        )
    }
}

/// Recommended EIP-1559 fee pair from the gas attendant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasFees {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// One on-chain broadcast attempt. A job accumulates several rows per
/// submission type only through fee escalation; all escalations share the
/// nonce and at most one of them can ever be mined.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSubmission {
    pub uuid: SubmissionUuid,
    pub job_id: super::JobId,
    pub submission_type: SubmissionType,
    pub nonce: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub from: Address,
    pub to: Address,
    /// Set as soon as the transaction is signed, before broadcast, so a
    /// crash between broadcast and the local write stays recoverable by
    /// hash lookup.
    pub transaction_hash: Option<H256>,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

impl Debug for TransactionSubmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSubmission")
            .field("uuid", &self.uuid)
            .field("job_id", &self.job_id)
            .field("submission_type", &self.submission_type)
            .field("nonce", &self.nonce)
            .field("transaction_hash", &self.transaction_hash)
            .field("status", &self.status)
            .finish()
    }
}

impl TransactionSubmission {
    pub fn fees(&self) -> GasFees {
        GasFees {
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
        }
    }
}
