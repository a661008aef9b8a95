use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::transaction::eip2930::AccessListWithGasUsed;
use ethers::types::{Address, Block, Bytes, Transaction, TransactionReceipt, H256, U256};

use crate::error::GatewayResult;
use crate::types::{Approval, GasFees, Job, OrderSignature};

/// A transaction signed by the worker's key, ready for broadcast. The hash
/// is known before broadcast so the attempt can be persisted first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: H256,
}

/// Thin wrapper over JSON-RPC plus the exchange-proxy calldata encoders.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Next nonce for `address` from the node's view of the pending state.
    async fn get_nonce(&self, address: Address) -> GatewayResult<U256>;

    /// Native token balance.
    async fn get_account_balance(&self, address: Address) -> GatewayResult<U256>;

    /// ERC-20 balances of `owner`, one entry per token.
    async fn get_token_balances(
        &self,
        owner: Address,
        tokens: &[Address],
    ) -> GatewayResult<Vec<U256>>;

    /// Per token, `min(balanceOf(owner), allowance(owner, spender))`.
    async fn get_min_of_balances_and_allowances(
        &self,
        owner: Address,
        tokens: &[Address],
        spender: Address,
    ) -> GatewayResult<Vec<U256>>;

    /// `eth_estimateGas`; doubles as the pre-broadcast dry run, since a
    /// reverting call fails estimation.
    async fn estimate_gas(&self, tx: &TypedTransaction) -> GatewayResult<U256>;

    /// `eth_createAccessList`. Callers treat failures as non-fatal; an
    /// access list is a gas optimization, not a correctness requirement.
    async fn create_access_list(
        &self,
        tx: &TypedTransaction,
    ) -> GatewayResult<AccessListWithGasUsed>;

    async fn sign_transaction(&self, tx: &TypedTransaction) -> GatewayResult<SignedTransaction>;

    /// Broadcast a signed transaction, returning its hash.
    async fn submit_signed_transaction(&self, raw: Bytes) -> GatewayResult<H256>;

    /// Receipts for whichever of `hashes` have been mined. Unmined hashes
    /// are simply absent from the result.
    async fn get_receipts(&self, hashes: &[H256]) -> GatewayResult<Vec<TransactionReceipt>>;

    /// Mempool/chain lookup of a transaction by hash.
    async fn get_transaction(&self, hash: H256) -> GatewayResult<Option<Transaction>>;

    async fn get_block(&self, hash: H256) -> GatewayResult<Option<Block<H256>>>;

    async fn get_current_block(&self) -> GatewayResult<u64>;

    /// Whether `signature` over `order_hash` recovers to `maker` (or to a
    /// signer the maker has registered as valid).
    fn is_valid_order_signer(
        &self,
        maker: Address,
        signature: &OrderSignature,
        order_hash: H256,
    ) -> GatewayResult<bool>;

    fn generate_approval_calldata(&self, job: &Job, approval: &Approval) -> GatewayResult<Bytes>;

    fn generate_meta_transaction_calldata(&self, job: &Job) -> GatewayResult<Bytes>;

    fn generate_taker_signed_otc_order_calldata(&self, job: &Job) -> GatewayResult<Bytes>;

    /// Settlement contract all trade transactions are sent to.
    fn exchange_proxy(&self) -> Address;
}

/// Gas price oracle.
#[async_trait]
pub trait GasAttendant: Send + Sync {
    /// Currently recommended max fee / priority fee for a transaction that
    /// should be included promptly.
    async fn get_expected_transaction_gas_rate(&self) -> GatewayResult<GasFees>;
}
