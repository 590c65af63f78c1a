use {
    crate::{
        artifact::Artifact,
        chain::{AlloyChain, ChainClient},
        cli::{self, Command},
        config::{self, Configuration},
        explorer::{BuildInfo, Etherscan, Source},
        orchestrator::{Orchestrator, Request},
    },
    anyhow::{Context, Result},
    clap::Parser,
    deployments::{Network, Store},
    std::{sync::Arc, time::Duration},
};

pub async fn run(args: impl IntoIterator<Item = String>) -> Result<()> {
    let args = cli::Args::parse_from(args);
    let obs_config = observe::Config::new(
        &args.log_filter,
        args.log_stderr_threshold.into_level(),
        args.use_json_logs,
    );
    observe::tracing::initialize(&obs_config);
    tracing::info!("running deployer with validated arguments:\n{args}");

    let config = Configuration::from_path(&args.config).await?;
    let network = Network::new(args.network.as_str())?;
    let network_config = config.network(network.as_str())?;
    let chain = AlloyChain::connect(network_config)
        .await
        .with_context(|| format!("failed to connect to network {network}"))?;

    match args.command {
        Command::Accounts => accounts(&chain).await,
        Command::Deploy(deploy) => {
            self::deploy(
                deploy,
                &config,
                network,
                network_config,
                Arc::new(chain),
                args.http_timeout,
            )
            .await
        }
    }
}

/// Prints one signer address per line.
async fn accounts(chain: &dyn ChainClient) -> Result<()> {
    for signer in chain.signers().await? {
        println!("{signer}");
    }
    Ok(())
}

async fn deploy(
    args: cli::Deploy,
    config: &Configuration,
    network: Network,
    network_config: &config::Network,
    chain: Arc<dyn ChainClient>,
    http_timeout: Duration,
) -> Result<()> {
    let artifact = Artifact::from_path(&args.artifact).await?;

    let mut orchestrator = Orchestrator::new(chain, Store::new(&config.deployments_dir), network)
        .with_account_index(network_config.account_index)
        .with_confirmations(args.confirmations.unwrap_or(config.confirmations));
    if let Some(explorer) = &network_config.explorer {
        let source = match &args.build_info {
            Some(path) => Some(Source {
                build_info: BuildInfo::from_path(path).await?,
                contract: artifact.qualified_name().with_context(|| {
                    format!(
                        "artifact {} lacks the source name needed for verification",
                        args.artifact.display()
                    )
                })?,
            }),
            None => {
                tracing::warn!("no build info given, sources cannot be verified");
                None
            }
        };
        let etherscan = Etherscan::new(explorer, network_config.chain_id, http_timeout, source)?;
        orchestrator = orchestrator.with_verifier(Arc::new(etherscan));
    }

    let outcome = orchestrator
        .deploy(Request {
            contract_type: args.contract_type,
            artifact,
            args: args.constructor_args,
            tag: args.tag,
            upgradable: args.upgradable,
        })
        .await?;
    println!("{}", outcome.record.address);
    Ok(())
}
