//! Access to the network contracts are deployed on.

use {
    crate::config,
    alloy::{
        network::{EthereumWallet, ReceiptResponse as _, TransactionBuilder},
        primitives::{Address, Bytes, TxHash},
        providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
        rpc::{client::ClientBuilder, types::TransactionRequest},
        signers::{
            Signer as _,
            local::{MnemonicBuilder, PrivateKeySigner, coins_bip39::English},
        },
    },
    anyhow::{Context, Result, ensure},
};

/// A contract creation that made it into a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    pub transaction: TxHash,
}

/// Abstracts the blockchain operations a deployment needs so the
/// orchestration can be tested without a node.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    /// Addresses of all accounts that can sign transactions, in derivation
    /// order.
    async fn signers(&self) -> Result<Vec<Address>>;

    /// Sends a contract creation transaction with `code` as input from
    /// `from` and waits for it to be mined.
    async fn deploy(&self, from: Address, code: Bytes) -> Result<Deployment>;

    /// Resolves once `transaction` has at least `confirmations` blocks on top
    /// of it (counting its own block).
    async fn wait_for_confirmations(&self, transaction: TxHash, confirmations: u64) -> Result<()>;
}

/// [`ChainClient`] talking to a JSON RPC node, signing locally with accounts
/// derived from a mnemonic.
pub struct AlloyChain {
    provider: DynProvider,
    signers: Vec<Address>,
}

impl AlloyChain {
    pub async fn connect(config: &config::Network) -> Result<Self> {
        let keys = match config.mnemonic()? {
            Some(phrase) => derive_signers(&phrase, config.accounts)?,
            None => Vec::new(),
        };
        let signers = keys.iter().map(PrivateKeySigner::address).collect();

        let rpc = ClientBuilder::default().http(config.url.clone());
        let mut keys = keys.into_iter();
        let provider = match keys.next() {
            Some(first) => {
                let mut wallet = EthereumWallet::new(first);
                for key in keys {
                    wallet.register_signer(key);
                }
                ProviderBuilder::new()
                    .wallet(wallet)
                    .connect_client(rpc)
                    .erased()
            }
            None => ProviderBuilder::new().connect_client(rpc).erased(),
        };

        if let Some(expected) = config.chain_id {
            let actual = provider
                .get_chain_id()
                .await
                .context("failed to query chain id")?;
            ensure!(
                actual == expected,
                "node at {} is on chain {actual} but {expected} is configured",
                config.url
            );
        }

        Ok(Self { provider, signers })
    }
}

fn derive_signers(phrase: &str, count: u32) -> Result<Vec<PrivateKeySigner>> {
    (0..count)
        .map(|index| {
            MnemonicBuilder::<English>::default()
                .phrase(phrase)
                .index(index)?
                .build()
                .with_context(|| format!("failed to derive account {index} from mnemonic"))
        })
        .collect()
}

#[async_trait::async_trait]
impl ChainClient for AlloyChain {
    async fn signers(&self) -> Result<Vec<Address>> {
        Ok(self.signers.clone())
    }

    async fn deploy(&self, from: Address, code: Bytes) -> Result<Deployment> {
        let tx = TransactionRequest::default()
            .from(from)
            .with_deploy_code(code);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .context("failed to submit deployment transaction")?;
        let transaction = *pending.tx_hash();
        tracing::debug!(?transaction, "submitted deployment transaction");

        let receipt = pending
            .get_receipt()
            .await
            .with_context(|| format!("deployment transaction {transaction} was not mined"))?;
        ensure!(
            receipt.status(),
            "deployment transaction {transaction} reverted"
        );
        let address = receipt
            .contract_address
            .with_context(|| format!("receipt of {transaction} has no contract address"))?;

        Ok(Deployment {
            address,
            transaction,
        })
    }

    async fn wait_for_confirmations(&self, transaction: TxHash, confirmations: u64) -> Result<()> {
        PendingTransactionBuilder::new(self.provider.root().clone(), transaction)
            .with_required_confirmations(confirmations)
            .watch()
            .await
            .with_context(|| {
                format!("failed waiting for {confirmations} confirmations of {transaction}")
            })?;
        Ok(())
    }
}
