//! CLI arguments for the `deployer` binary.

use {
    clap::{Parser, Subcommand},
    deployments::Args as ConstructorArgs,
    std::{
        fmt::{self, Display, Formatter},
        path::PathBuf,
        time::Duration,
    },
    tracing::level_filters::LevelFilter,
};

/// Deploy contracts and keep track of them in a per network registry
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    #[clap(long, env, default_value = "warn,deployer=debug,deployments=debug")]
    pub log_filter: String,

    #[clap(long, env, default_value = "error")]
    pub log_stderr_threshold: LevelFilter,

    /// Emit logs as JSON lines.
    #[clap(long, env)]
    pub use_json_logs: bool,

    /// Path to the deployer configuration file. This file should be in TOML
    /// format.
    #[clap(long, env, default_value = "deployer.toml")]
    pub config: PathBuf,

    /// Network to operate on, as named in the configuration file.
    #[clap(long, env)]
    pub network: String,

    /// Timeout of requests to block explorers.
    #[clap(long, env, default_value = "10s", value_parser = humantime::parse_duration)]
    pub http_timeout: Duration,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Deploy a contract, record it and verify its sources.
    Deploy(Deploy),
    /// Print the addresses of the configured accounts.
    Accounts,
}

#[derive(clap::Args, Debug)]
pub struct Deploy {
    /// Compiled contract artifact, in Hardhat or Foundry format.
    #[clap(long, env)]
    pub artifact: PathBuf,

    /// Name the deployment is recorded under in the registry.
    #[clap(long, env)]
    pub contract_type: String,

    /// Label of the deployment. Deployments without one are recorded as
    /// `untagged`.
    #[clap(long, env)]
    pub tag: Option<String>,

    /// Whether the contract follows an upgradable proxy pattern. Only
    /// upgradable deployments are verified.
    #[clap(long, env)]
    pub upgradable: bool,

    /// Constructor arguments as a JSON object keyed by input name, for
    /// example `{"account": "0x...", "supply": "1000"}`.
    #[clap(long, env, default_value = "{}", value_parser = parse_constructor_args)]
    pub constructor_args: ConstructorArgs,

    /// Hardhat build info of the compilation that produced the artifact.
    /// Required for source verification.
    #[clap(long, env)]
    pub build_info: Option<PathBuf>,

    /// Overrides the number of confirmations from the configuration file.
    #[clap(long, env)]
    pub confirmations: Option<u64>,
}

fn parse_constructor_args(s: &str) -> Result<ConstructorArgs, serde_json::Error> {
    serde_json::from_str(s)
}

impl Display for Args {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            log_filter,
            log_stderr_threshold,
            use_json_logs,
            config,
            network,
            http_timeout,
            command,
        } = self;

        writeln!(f, "log_filter: {log_filter}")?;
        writeln!(f, "log_stderr_threshold: {log_stderr_threshold}")?;
        writeln!(f, "use_json_logs: {use_json_logs}")?;
        writeln!(f, "config: {}", config.display())?;
        writeln!(f, "network: {network}")?;
        writeln!(f, "http_timeout: {http_timeout:?}")?;
        match command {
            Command::Deploy(deploy) => write!(f, "{deploy}"),
            Command::Accounts => writeln!(f, "command: accounts"),
        }
    }
}

impl Display for Deploy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            artifact,
            contract_type,
            tag,
            upgradable,
            constructor_args,
            build_info,
            confirmations,
        } = self;

        writeln!(f, "command: deploy")?;
        writeln!(f, "artifact: {}", artifact.display())?;
        writeln!(f, "contract_type: {contract_type}")?;
        display_option(f, "tag", tag)?;
        writeln!(f, "upgradable: {upgradable}")?;
        writeln!(
            f,
            "constructor_args: {}",
            serde_json::Value::Object(constructor_args.clone())
        )?;
        display_option(f, "build_info", &build_info.as_ref().map(|p| p.display()))?;
        display_option(f, "confirmations", confirmations)?;
        Ok(())
    }
}

fn display_option(f: &mut Formatter<'_>, name: &str, option: &Option<impl Display>) -> fmt::Result {
    write!(f, "{name}: ")?;
    match option {
        Some(display) => writeln!(f, "{display}"),
        None => writeln!(f, "None"),
    }
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn parses_deploy_command() {
        let args = Args::try_parse_from([
            "deployer",
            "--network",
            "testnet",
            "deploy",
            "--artifact",
            "artifacts/contracts/Tribe.sol/Tribe.json",
            "--contract-type",
            "tribe",
            "--tag",
            "tribe-token-prod",
            "--upgradable",
            "--constructor-args",
            r#"{"account": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"}"#,
        ])
        .unwrap();

        assert_eq!(args.network, "testnet");
        assert_eq!(args.config, PathBuf::from("deployer.toml"));
        assert_eq!(args.http_timeout, Duration::from_secs(10));
        assert_eq!(args.log_stderr_threshold, LevelFilter::ERROR);
        let Command::Deploy(deploy) = args.command else {
            panic!("expected deploy command");
        };
        assert_eq!(deploy.contract_type, "tribe");
        assert_eq!(deploy.tag.as_deref(), Some("tribe-token-prod"));
        assert!(deploy.upgradable);
        assert_eq!(
            serde_json::Value::Object(deploy.constructor_args),
            json!({ "account": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266" })
        );
        assert_eq!(deploy.build_info, None);
        assert_eq!(deploy.confirmations, None);
    }

    #[test]
    fn constructor_args_must_be_an_object() {
        let result = Args::try_parse_from([
            "deployer",
            "--network",
            "testnet",
            "deploy",
            "--artifact",
            "Tribe.json",
            "--contract-type",
            "tribe",
            "--constructor-args",
            "[1, 2]",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_accounts_command() {
        let args = Args::try_parse_from([
            "deployer",
            "--network",
            "localhost",
            "--http-timeout",
            "30s",
            "accounts",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Accounts));
        assert_eq!(args.http_timeout, Duration::from_secs(30));
        assert!(args.to_string().contains("command: accounts"));
    }
}
