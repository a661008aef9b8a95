use ethers::types::{H256, U256};
use itertools::Itertools;

use rfqm_core::{SubmissionStatus, TransactionSubmission};

use crate::error::WorkerError;

use super::context::SubmissionContextStatus;

/// The logical submission for one (job, submission type) pair: a single
/// nonce and the ordered broadcast attempts that escalated it. At most one
/// attempt can ever be mined.
#[derive(Debug, Clone)]
pub struct SubmissionGroup {
    nonce: U256,
    attempts: Vec<TransactionSubmission>,
}

impl SubmissionGroup {
    /// Rebuild the group from persisted rows, oldest first.
    ///
    /// A transaction hash appearing on more than one row is a
    /// data-integrity violation and fails loudly rather than deduping.
    pub fn from_rows(rows: Vec<TransactionSubmission>) -> Result<Option<Self>, WorkerError> {
        let mut rows = rows;
        rows.sort_by_key(|row| row.created_at);
        let duplicate = rows
            .iter()
            .filter_map(|row| row.transaction_hash)
            .duplicates()
            .next();
        if duplicate.is_some() {
            return Err(WorkerError::SubmissionHashNotUnique);
        }
        let nonce = match rows.first() {
            Some(first) => first.nonce,
            None => return Ok(None),
        };
        Ok(Some(Self {
            nonce,
            attempts: rows,
        }))
    }

    pub fn single(attempt: TransactionSubmission) -> Self {
        Self {
            nonce: attempt.nonce,
            attempts: vec![attempt],
        }
    }

    pub fn nonce(&self) -> U256 {
        self.nonce
    }

    pub fn attempts(&self) -> &[TransactionSubmission] {
        &self.attempts
    }

    pub fn attempts_mut(&mut self) -> &mut [TransactionSubmission] {
        &mut self.attempts
    }

    /// The most recent broadcast attempt.
    pub fn latest(&self) -> &TransactionSubmission {
        self.attempts
            .last()
            .expect("a submission group always holds at least one attempt")
    }

    pub fn push(&mut self, attempt: TransactionSubmission) {
        self.attempts.push(attempt);
    }

    /// Hashes of every attempt still worth watching.
    pub fn watched_hashes(&self) -> Vec<H256> {
        self.attempts
            .iter()
            .filter(|attempt| !attempt.status.is_terminal())
            .filter_map(|attempt| attempt.transaction_hash)
            .collect()
    }

    /// The group's terminal outcome, if the persisted rows already decide
    /// one: a mined attempt wins outright, otherwise the group is terminal
    /// only once every attempt is.
    pub fn terminal_context_status(&self) -> Option<SubmissionContextStatus> {
        for attempt in &self.attempts {
            match attempt.status {
                SubmissionStatus::SucceededConfirmed => {
                    return Some(SubmissionContextStatus::SucceededConfirmed)
                }
                SubmissionStatus::FailedRevertedConfirmed => {
                    return Some(SubmissionContextStatus::FailedRevertedConfirmed)
                }
                _ => {}
            }
        }
        if self
            .attempts
            .iter()
            .all(|attempt| attempt.status.is_terminal())
        {
            return Some(SubmissionContextStatus::FailedExpired);
        }
        None
    }
}
