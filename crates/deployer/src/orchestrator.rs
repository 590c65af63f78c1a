//! Runs one deployment from the transaction to the verified registry entry.
//!
//! A deployment that made it on chain is always recorded. Only failures up to
//! and including persisting the record abort the run before anything is
//! written. Confirmation failures are reported after the fact and
//! verification failures are logged and otherwise ignored.

use {
    crate::{
        artifact::{self, Artifact},
        chain::ChainClient,
        explorer::Verifier,
    },
    alloy::primitives::{Address, Bytes, TxHash},
    chrono::{SubsecRound, Utc},
    deployments::{Args, DeploymentRecord, Kind, Network, Registry, Store, tag, version},
    std::sync::Arc,
};

/// Blocks on top of a deployment before it is considered final.
pub const DEFAULT_CONFIRMATIONS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Artifact(#[from] artifact::Error),
    #[error("failed to list signers")]
    Signers(#[source] anyhow::Error),
    #[error("no signer at index {index}, only {available} accounts are available")]
    SignerUnavailable { index: usize, available: usize },
    #[error("deployment failed")]
    Deploy(#[source] anyhow::Error),
    #[error("failed to record deployment")]
    Registry(#[from] deployments::Error),
    #[error("deployment at {address} was recorded but did not get confirmed")]
    Confirmation {
        address: Address,
        #[source]
        source: anyhow::Error,
    },
}

/// What to deploy.
#[derive(Clone, Debug)]
pub struct Request {
    /// Registry key the deployment is recorded under.
    pub contract_type: String,
    pub artifact: Artifact,
    pub args: Args,
    pub tag: Option<String>,
    pub upgradable: bool,
}

#[derive(Clone, Debug)]
pub struct Outcome {
    /// The record as it was persisted.
    pub record: DeploymentRecord,
    pub transaction: TxHash,
    /// Deployments of the same contract type that already carried the tag.
    pub tag_matches: usize,
    pub verification: Verification,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    Verified,
    Failed(String),
    /// No explorer is configured or the deployment has no implementation to
    /// verify.
    Skipped,
}

pub struct Orchestrator {
    chain: Arc<dyn ChainClient>,
    verifier: Option<Arc<dyn Verifier>>,
    store: Store,
    network: Network,
    account_index: usize,
    confirmations: u64,
}

impl Orchestrator {
    pub fn new(chain: Arc<dyn ChainClient>, store: Store, network: Network) -> Self {
        Self {
            chain,
            verifier: None,
            store,
            network,
            account_index: 0,
            confirmations: DEFAULT_CONFIRMATIONS,
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn with_account_index(mut self, account_index: usize) -> Self {
        self.account_index = account_index;
        self
    }

    pub fn with_confirmations(mut self, confirmations: u64) -> Self {
        self.confirmations = confirmations;
        self
    }

    pub async fn deploy(&self, request: Request) -> Result<Outcome, Error> {
        let constructor_args = request.artifact.encode_constructor_args(&request.args)?;

        let signers = self.chain.signers().await.map_err(Error::Signers)?;
        let from = *signers
            .get(self.account_index)
            .ok_or(Error::SignerUnavailable {
                index: self.account_index,
                available: signers.len(),
            })?;

        tracing::info!(
            contract_type = %request.contract_type,
            network = %self.network,
            %from,
            "deploying contract"
        );
        let deployment = self
            .chain
            .deploy(from, request.artifact.creation_code(&constructor_args))
            .await
            .map_err(Error::Deploy)?;
        tracing::info!(
            address = %deployment.address,
            transaction = %deployment.transaction,
            "contract deployed"
        );

        let kind = if request.upgradable {
            Kind::Upgradable {
                implementation: deployment.address,
            }
        } else {
            Kind::Fixed
        };
        let record = DeploymentRecord {
            tag: Some(tag::normalize(request.tag.as_deref())),
            address: deployment.address,
            version: version::implementation_version(&request.artifact.bytecode),
            // Registries store millisecond precision.
            date: Utc::now().trunc_subsecs(3),
            args: request.args,
            kind,
        };
        let tag_matches = self.persist(&request.contract_type, record.clone())?;

        tracing::debug!(confirmations = self.confirmations, "waiting for confirmations");
        self.chain
            .wait_for_confirmations(deployment.transaction, self.confirmations)
            .await
            .map_err(|source| Error::Confirmation {
                address: deployment.address,
                source,
            })?;

        let verification = self.verify(&record, constructor_args).await;

        Ok(Outcome {
            record,
            transaction: deployment.transaction,
            tag_matches,
            verification,
        })
    }

    /// Appends the record to the network's registry, returning how many
    /// existing deployments of the contract type share its tag.
    fn persist(&self, contract_type: &str, record: DeploymentRecord) -> Result<usize, Error> {
        let mut registry = match self.store.load(&self.network)? {
            Some(registry) => registry,
            None => {
                tracing::info!(
                    path = ?self.store.path(&self.network),
                    "no deployments recorded yet, creating registry"
                );
                Registry::default()
            }
        };

        let tag = record.tag.as_deref().unwrap_or(tag::UNTAGGED);
        let matches = tag::count_matching(tag, registry.records(contract_type));
        tracing::warn!("There are {matches} deployments with the same tag of {tag}");

        registry.append(contract_type, record);
        self.store.save(&self.network, &registry)?;
        tracing::info!(path = ?self.store.path(&self.network), "deployment recorded");
        Ok(matches)
    }

    async fn verify(&self, record: &DeploymentRecord, constructor_args: Bytes) -> Verification {
        let (Some(implementation), Some(verifier)) = (record.implementation(), &self.verifier)
        else {
            tracing::debug!("skipping verification");
            return Verification::Skipped;
        };

        match verifier.verify(implementation, constructor_args).await {
            Ok(()) => {
                tracing::info!(%implementation, "contract verified");
                Verification::Verified
            }
            Err(err) => {
                tracing::error!(?err, %implementation, "verification failed");
                Verification::Failed(err.to_string())
            }
        }
    }
}
