use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::transaction::eip2930::AccessListWithGasUsed;
use ethers::types::{
    Address, Block, Bytes, Transaction, TransactionReceipt, H256, U256,
};

use rfqm_core::{
    Approval, BalanceCache, ChainGateway, FeeTerms, GasAttendant, GasFees, GatewayResult, Job,
    JobId, JobKind, JobKindData, JobStatus, JobStore, MakerRegistry, MetaTransactionData,
    OrderSignature, QuoteServerClient, QuoteServerError, RawOrderSignature, RfqOrderData,
    SignatureType, SignedTransaction, StoreResult, SubmissionStatus, SubmissionType,
    TransactionSubmission, Workflow,
};

use crate::metrics::WorkerMetrics;
use crate::settings::WorkerSettings;
use crate::submission::SubmissionContext;
use crate::worker::RfqmWorker;

pub const WORKER_ADDRESS: u64 = 0xAA;
pub const MAKER_ADDRESS: u64 = 0xBB;

pub fn worker_address() -> Address {
    Address::from_low_u64_be(WORKER_ADDRESS)
}

pub fn dummy_signature() -> OrderSignature {
    OrderSignature {
        signature_type: SignatureType::Eip712,
        v: 27,
        r: H256::from_low_u64_be(1),
        s: H256::from_low_u64_be(2),
    }
}

pub fn dummy_raw_signature() -> RawOrderSignature {
    RawOrderSignature {
        signature_type: SignatureType::Eip712,
        v: 27,
        r: Bytes::from(vec![0x11u8; 32]),
        s: Bytes::from(vec![0x22u8; 32]),
    }
}

pub fn dummy_rfq_job() -> Job {
    let expiry = Utc::now().timestamp() as u64 + 600;
    Job {
        id: format!("{:?}", H256::from_low_u64_be(7)),
        chain_id: 137,
        created_at: Utc::now(),
        expiry,
        integrator_id: Some("integrator-1".to_string()),
        worker_address: worker_address(),
        taker_signature: Some(dummy_signature()),
        maker_signature: None,
        last_look_result: None,
        fee: FeeTerms {
            token: Address::from_low_u64_be(0xFE),
            amount: U256::from(1_000u64),
        },
        maker_token: Address::from_low_u64_be(0x01),
        taker_token: Address::from_low_u64_be(0x02),
        maker_amount: U256::from(1_000_000u64),
        taker_amount: U256::from(2_000_000u64),
        status: JobStatus::PendingEnqueued,
        workflow: Workflow::Rfqm,
        data: JobKindData::RfqOrder(RfqOrderData {
            order_hash: H256::from_low_u64_be(7),
            maker: Address::from_low_u64_be(MAKER_ADDRESS),
            taker: Address::from_low_u64_be(0xCC),
            maker_uri: "https://maker.example".to_string(),
            expiry_and_nonce: U256::from(expiry) << 192,
            approval: None,
        }),
    }
}

pub fn dummy_meta_transaction_job() -> Job {
    let mut job = dummy_rfq_job();
    job.id = "mtx-1".to_string();
    job.data = JobKindData::MetaTransaction(MetaTransactionData {
        mtx_hash: H256::from_low_u64_be(9),
        signer: Address::from_low_u64_be(0xCC),
        calldata: Bytes::from(vec![0xab, 0xcd]),
        value: U256::zero(),
    });
    job.workflow = Workflow::Gasless;
    job
}

pub fn with_approval(mut job: Job) -> Job {
    let approval = Approval {
        token: job.taker_token,
        payload: Bytes::from(vec![0x01, 0x02, 0x03]),
    };
    job.data = match job.data {
        JobKindData::RfqOrder(mut data) => {
            data.approval = Some(approval);
            JobKindData::RfqOrder(data)
        }
        JobKindData::MetaTransaction(data) => JobKindData::MetaTransaction(data),
        JobKindData::MetaTransactionV2(mut data) => {
            data.approval = Some(approval);
            JobKindData::MetaTransactionV2(data)
        }
    };
    job
}

pub fn dummy_submission(
    job: &Job,
    submission_type: SubmissionType,
    status: SubmissionStatus,
    hash: Option<H256>,
) -> TransactionSubmission {
    TransactionSubmission {
        uuid: uuid::Uuid::new_v4(),
        job_id: job.id.clone(),
        submission_type,
        nonce: U256::from(21u64),
        max_fee_per_gas: U256::from(100_000_000_000u64),
        max_priority_fee_per_gas: U256::from(1_000_000_000u64),
        from: job.worker_address,
        to: Address::from_low_u64_be(0xDD),
        transaction_hash: hash,
        status,
        created_at: Utc::now(),
    }
}

pub fn successful_receipt(hash: H256) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        status: Some(1u64.into()),
        ..Default::default()
    }
}

pub fn reverted_receipt(hash: H256) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: hash,
        status: Some(0u64.into()),
        ..Default::default()
    }
}

pub fn test_settings() -> WorkerSettings {
    WorkerSettings {
        worker_count: 1,
        transaction_watch_interval_ms: 5,
        quote_server_timeout_ms: 50,
        maker_cooldown_s: 60,
    }
}

/// Hand-rolled store fake recording every write, for call-sequence
/// assertions mockall is a poor fit for.
#[derive(Default)]
pub struct RecordingJobStore {
    pub jobs: Mutex<HashMap<(JobKind, JobId), Job>>,
    pub job_updates: Mutex<Vec<Job>>,
    pub submissions: Mutex<Vec<TransactionSubmission>>,
    pub rejection_writes: Mutex<Vec<(String, u64, Address, Address, String)>>,
}

impl RecordingJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(job: &Job) -> Self {
        let store = Self::default();
        store
            .jobs
            .lock()
            .unwrap()
            .insert((job.kind(), job.id.clone()), job.clone());
        store
    }

    pub fn seed_submission(&self, submission: TransactionSubmission) {
        self.submissions.lock().unwrap().push(submission);
    }

    /// Statuses in the order they were persisted.
    pub fn recorded_statuses(&self) -> Vec<JobStatus> {
        self.job_updates
            .lock()
            .unwrap()
            .iter()
            .map(|job| job.status)
            .collect()
    }

    pub fn last_job(&self) -> Option<Job> {
        self.job_updates.lock().unwrap().last().cloned()
    }

    pub fn submissions_of_type(&self, submission_type: SubmissionType) -> Vec<TransactionSubmission> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|submission| submission.submission_type == submission_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobStore for RecordingJobStore {
    async fn find_unresolved_jobs(
        &self,
        kind: JobKind,
        worker_address: Address,
    ) -> StoreResult<Vec<Job>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|job| {
                job.kind() == kind
                    && job.worker_address == worker_address
                    && !job.status.is_terminal()
            })
            .cloned()
            .collect())
    }

    async fn find_job(&self, kind: JobKind, id: &str) -> StoreResult<Option<Job>> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .get(&(kind, id.to_string()))
            .cloned())
    }

    async fn update_job(&self, job: &Job) -> StoreResult<()> {
        self.job_updates.lock().unwrap().push(job.clone());
        self.jobs
            .lock()
            .unwrap()
            .insert((job.kind(), job.id.clone()), job.clone());
        Ok(())
    }

    async fn find_transaction_submissions(
        &self,
        job_id: &str,
        submission_type: Option<SubmissionType>,
    ) -> StoreResult<Vec<TransactionSubmission>> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|submission| {
                submission.job_id == job_id
                    && submission_type
                        .map(|ty| submission.submission_type == ty)
                        .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn write_transaction_submission(
        &self,
        submission: &TransactionSubmission,
    ) -> StoreResult<TransactionSubmission> {
        self.submissions.lock().unwrap().push(submission.clone());
        Ok(submission.clone())
    }

    async fn update_transaction_submissions(
        &self,
        submissions: &[TransactionSubmission],
    ) -> StoreResult<()> {
        let mut stored = self.submissions.lock().unwrap();
        for updated in submissions {
            match stored.iter_mut().find(|row| row.uuid == updated.uuid) {
                Some(row) => *row = updated.clone(),
                None => stored.push(updated.clone()),
            }
        }
        Ok(())
    }

    async fn find_transaction_submission_by_hash(
        &self,
        hash: H256,
    ) -> StoreResult<Option<TransactionSubmission>> {
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .iter()
            .find(|submission| submission.transaction_hash == Some(hash))
            .cloned())
    }

    async fn write_rejection_cooldown(
        &self,
        maker_id: &str,
        chain_id: u64,
        maker_token: Address,
        taker_token: Address,
        order_hash: &str,
    ) -> StoreResult<()> {
        self.rejection_writes.lock().unwrap().push((
            maker_id.to_string(),
            chain_id,
            maker_token,
            taker_token,
            order_hash.to_string(),
        ));
        Ok(())
    }
}

mockall::mock! {
    pub Gateway {}

    #[async_trait]
    impl ChainGateway for Gateway {
        async fn get_nonce(&self, address: Address) -> GatewayResult<U256>;
        async fn get_account_balance(&self, address: Address) -> GatewayResult<U256>;
        async fn get_token_balances(
            &self,
            owner: Address,
            tokens: &[Address],
        ) -> GatewayResult<Vec<U256>>;
        async fn get_min_of_balances_and_allowances(
            &self,
            owner: Address,
            tokens: &[Address],
            spender: Address,
        ) -> GatewayResult<Vec<U256>>;
        async fn estimate_gas(&self, tx: &TypedTransaction) -> GatewayResult<U256>;
        async fn create_access_list(
            &self,
            tx: &TypedTransaction,
        ) -> GatewayResult<AccessListWithGasUsed>;
        async fn sign_transaction(&self, tx: &TypedTransaction) -> GatewayResult<SignedTransaction>;
        async fn submit_signed_transaction(&self, raw: Bytes) -> GatewayResult<H256>;
        async fn get_receipts(&self, hashes: &[H256]) -> GatewayResult<Vec<TransactionReceipt>>;
        async fn get_transaction(&self, hash: H256) -> GatewayResult<Option<Transaction>>;
        async fn get_block(&self, hash: H256) -> GatewayResult<Option<Block<H256>>>;
        async fn get_current_block(&self) -> GatewayResult<u64>;
        fn is_valid_order_signer(
            &self,
            maker: Address,
            signature: &OrderSignature,
            order_hash: H256,
        ) -> GatewayResult<bool>;
        fn generate_approval_calldata(&self, job: &Job, approval: &Approval) -> GatewayResult<Bytes>;
        fn generate_meta_transaction_calldata(&self, job: &Job) -> GatewayResult<Bytes>;
        fn generate_taker_signed_otc_order_calldata(&self, job: &Job) -> GatewayResult<Bytes>;
        fn exchange_proxy(&self) -> Address;
    }
}

mockall::mock! {
    pub Attendant {}

    #[async_trait]
    impl GasAttendant for Attendant {
        async fn get_expected_transaction_gas_rate(&self) -> GatewayResult<GasFees>;
    }
}

mockall::mock! {
    pub QuoteServer {}

    #[async_trait]
    impl QuoteServerClient for QuoteServer {
        async fn sign_v2(
            &self,
            job: &Job,
            maker_uri: &str,
            timeout: Duration,
        ) -> Result<Option<RawOrderSignature>, QuoteServerError>;
    }
}

mockall::mock! {
    pub Balances {}

    #[async_trait]
    impl BalanceCache for Balances {
        async fn get_erc20_owner_balances(
            &self,
            chain_id: u64,
            owner: Address,
            tokens: &[Address],
        ) -> StoreResult<Vec<U256>>;
    }
}

mockall::mock! {
    pub Registry {}

    #[async_trait]
    impl MakerRegistry for Registry {
        fn find_maker_id_with_rfqm_uri(&self, uri: &str) -> Option<String>;
        async fn add_maker_to_cooldown(
            &self,
            maker_id: &str,
            until: DateTime<Utc>,
            chain_id: u64,
            maker_token: Address,
            taker_token: Address,
        ) -> StoreResult<()>;
    }
}

/// A fully mocked worker with sub-second timings.
#[allow(clippy::too_many_arguments)]
pub fn build_worker(
    store: Arc<RecordingJobStore>,
    gateway: MockGateway,
    gas_attendant: MockAttendant,
    quote_server: MockQuoteServer,
    balance_cache: MockBalances,
    maker_registry: MockRegistry,
) -> RfqmWorker {
    RfqmWorker::new(
        store,
        Arc::new(gateway),
        Arc::new(gas_attendant),
        Arc::new(quote_server),
        Arc::new(balance_cache),
        Arc::new(maker_registry),
        test_settings(),
        WorkerMetrics::dummy_instance(),
    )
}

/// A submission context wired to the recording store and the given mocks.
pub fn build_context(
    store: Arc<RecordingJobStore>,
    gateway: MockGateway,
    gas_attendant: MockAttendant,
) -> SubmissionContext {
    SubmissionContext::new(
        store,
        Arc::new(gateway),
        Arc::new(gas_attendant),
        WorkerMetrics::dummy_instance(),
        Duration::from_millis(5),
    )
}
