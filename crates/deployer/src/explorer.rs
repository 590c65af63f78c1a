//! Source verification with Etherscan compatible block explorers (Etherscan,
//! BscScan, ...).
//!
//! Verification is asynchronous on the explorer side: a submission returns a
//! GUID whose status has to be polled until the explorer reached a verdict.

use {
    crate::{artifact, config},
    alloy::primitives::{Address, Bytes},
    anyhow::Context,
    reqwest::Client,
    serde::Deserialize,
    std::{path::Path, time::Duration},
    url::Url,
};

const USER_AGENT: &str = concat!("deployer/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("no build info was provided, sources cannot be submitted")]
    MissingBuildInfo,
    #[error("explorer API key is not set, export {0}")]
    MissingApiKey(String),
    #[error("contract is already verified")]
    AlreadyVerified,
    #[error("explorer rejected the verification: {0}")]
    Rejected(String),
    #[error("verification still pending after {0} status checks")]
    Pending(u32),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Publishes the sources of a deployed contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Verifier: Send + Sync {
    /// Verifies the contract at `address` that was deployed with the ABI
    /// encoded `constructor_args`.
    async fn verify(&self, address: Address, constructor_args: Bytes)
    -> Result<(), VerificationError>;
}

/// Output of one Hardhat compilation, found under `artifacts/build-info`.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub solc_long_version: String,
    /// Standard JSON input that was passed to the compiler.
    pub input: serde_json::Value,
}

impl BuildInfo {
    pub async fn from_path(path: &Path) -> anyhow::Result<Self> {
        let data = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read build info {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("malformed build info {}", path.display()))
    }
}

/// What gets submitted for verification.
#[derive(Clone, Debug)]
pub struct Source {
    pub build_info: BuildInfo,
    /// Fully qualified `<source>:<contract>` name.
    pub contract: String,
}

pub struct Etherscan {
    client: Client,
    url: Url,
    api_key: Option<String>,
    api_key_env: String,
    chain_id: Option<u64>,
    poll_interval: Duration,
    max_polls: u32,
    source: Option<Source>,
}

impl Etherscan {
    pub fn new(
        config: &config::Explorer,
        chain_id: Option<u64>,
        http_timeout: Duration,
        source: Option<Source>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(http_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url: config.api_url.clone(),
            api_key: config.api_key(),
            api_key_env: config.api_key_env.clone(),
            chain_id,
            poll_interval: config.poll_interval,
            max_polls: config.max_polls,
            source,
        })
    }

    fn api_key(&self) -> Result<&str, VerificationError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| VerificationError::MissingApiKey(self.api_key_env.clone()))
    }

    fn chain_query(&self) -> Vec<(&'static str, u64)> {
        self.chain_id
            .map(|chain_id| ("chainid", chain_id))
            .into_iter()
            .collect()
    }
}

/// The two explorer requests a verification consists of.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
trait Api: Send + Sync {
    /// Submits the sources, returning the GUID of the verification job.
    async fn submit(
        &self,
        address: Address,
        constructor_args: Bytes,
    ) -> Result<String, VerificationError>;

    async fn status(&self, guid: String) -> Result<Status, VerificationError>;
}

#[async_trait::async_trait]
impl Api for Etherscan {
    async fn submit(
        &self,
        address: Address,
        constructor_args: Bytes,
    ) -> Result<String, VerificationError> {
        let source = self
            .source
            .as_ref()
            .ok_or(VerificationError::MissingBuildInfo)?;
        let api_key = self.api_key()?;
        let source_code = serde_json::to_string(&source.build_info.input)
            .context("failed to encode standard JSON input")?;
        let form = [
            ("apikey", api_key.to_string()),
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("contractaddress", address.to_string()),
            ("sourceCode", source_code),
            ("codeformat", "solidity-standard-json-input".to_string()),
            ("contractname", source.contract.clone()),
            (
                "compilerversion",
                format!("v{}", source.build_info.solc_long_version),
            ),
            // Misspelled in the explorer API.
            ("constructorArguements", artifact::encode_hex(&constructor_args)),
        ];
        let response = self
            .client
            .post(self.url.clone())
            .query(&self.chain_query())
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json::<Response>()
            .await?;
        let guid = submission(response)?;
        tracing::debug!(%guid, contract = %source.contract, "submitted sources for verification");
        Ok(guid)
    }

    async fn status(&self, guid: String) -> Result<Status, VerificationError> {
        let response = self
            .client
            .get(self.url.clone())
            .query(&self.chain_query())
            .query(&[
                ("apikey", self.api_key()?),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<Response>()
            .await?;
        status(response)
    }
}

#[async_trait::async_trait]
impl Verifier for Etherscan {
    async fn verify(
        &self,
        address: Address,
        constructor_args: Bytes,
    ) -> Result<(), VerificationError> {
        submit_and_poll(
            self,
            address,
            constructor_args,
            self.poll_interval,
            self.max_polls,
        )
        .await
    }
}

/// Submits the sources and checks the verification status every
/// `poll_interval`, at most `max_polls` times but at least once.
async fn submit_and_poll(
    api: &dyn Api,
    address: Address,
    constructor_args: Bytes,
    poll_interval: Duration,
    max_polls: u32,
) -> Result<(), VerificationError> {
    let guid = api.submit(address, constructor_args).await?;
    let polls = max_polls.max(1);
    for _ in 0..polls {
        tokio::time::sleep(poll_interval).await;
        match api.status(guid.clone()).await? {
            Status::Verified => return Ok(()),
            Status::Pending => tracing::debug!(%guid, "verification pending"),
        }
    }
    Err(VerificationError::Pending(polls))
}

/// Envelope of every explorer API response. `status` is `"1"` on success and
/// `"0"` otherwise, in which case `result` holds the reason.
#[derive(Debug, Deserialize)]
struct Response {
    status: String,
    #[serde(default)]
    message: String,
    result: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Status {
    Pending,
    Verified,
}

fn is_already_verified(result: &str) -> bool {
    result.to_lowercase().contains("already verified")
}

/// Interprets a `verifysourcecode` response, returning the GUID to poll.
fn submission(response: Response) -> Result<String, VerificationError> {
    match response.status.as_str() {
        "1" => Ok(response.result),
        _ if is_already_verified(&response.result) => Err(VerificationError::AlreadyVerified),
        _ => Err(VerificationError::Rejected(format!(
            "{}: {}",
            response.message, response.result
        ))),
    }
}

/// Interprets a `checkverifystatus` response.
fn status(response: Response) -> Result<Status, VerificationError> {
    let result = response.result.as_str();
    if result.starts_with("Pending") {
        return Ok(Status::Pending);
    }
    if is_already_verified(result) {
        return Err(VerificationError::AlreadyVerified);
    }
    match response.status.as_str() {
        "1" => Ok(Status::Verified),
        _ => Err(VerificationError::Rejected(result.to_string())),
    }
}
