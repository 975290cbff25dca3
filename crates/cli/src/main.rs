use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use cloudmanager_client::HttpConnector;
use cloudmanager_core::{
    CommandExecutionRunner, Config, Error, ExecutionOutcome, MagentoCommand, PollPolicy,
    StaticIdentity,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cloudmanagerctl",
    version,
    about = "Run bin/magento commands on Cloud Manager Commerce environments"
)]
struct Cli {
    /// Config file (default: ~/.config/cloudmanager/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// IMS context to authenticate with.
    #[arg(long = "ims-context", visible_alias = "imsContextName", global = true)]
    ims_context: Option<String>,

    /// Print the outcome as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Log level (env-filter syntax). Logs go to stderr.
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    /// Wait between status polls, in milliseconds.
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    poll_interval_ms: Option<u64>,

    /// Give up after this many status polls. Unbounded by default.
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(1..))]
    max_polls: Option<u32>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Adobe Commerce commands.
    Commerce {
        #[command(subcommand)]
        commerce: CommerceCmd,
    },
}

#[derive(Subcommand, Debug)]
enum CommerceCmd {
    /// Run a bin/magento command.
    #[command(name = "bin-magento")]
    BinMagento {
        #[command(subcommand)]
        group: BinMagentoCmd,
    },
}

#[derive(Subcommand, Debug)]
enum BinMagentoCmd {
    Maintenance {
        #[command(subcommand)]
        action: MaintenanceCmd,
    },
    Cache {
        #[command(subcommand)]
        action: CacheCmd,
    },
    Indexer {
        #[command(subcommand)]
        action: IndexerCmd,
    },
    App {
        #[command(subcommand)]
        action: AppCmd,
    },
}

#[derive(Subcommand, Debug)]
enum MaintenanceCmd {
    /// Enable maintenance mode.
    Enable(Target),
    /// Disable maintenance mode.
    Disable(Target),
    /// Show maintenance mode status.
    Status(Target),
}

#[derive(Subcommand, Debug)]
enum CacheCmd {
    /// Clean cache types.
    Clean(Target),
    /// Flush cache storage.
    Flush(Target),
}

#[derive(Subcommand, Debug)]
enum IndexerCmd {
    /// Reindex all indexers.
    Reindex(Target),
    /// List indexers.
    Info(Target),
}

#[derive(Subcommand, Debug)]
enum AppCmd {
    /// Check whether config propagation is up to date.
    #[command(name = "config-status")]
    ConfigStatus(Target),
}

#[derive(Args, Debug, Clone)]
struct Target {
    /// Program id.
    #[arg(long = "programId", visible_alias = "program-id")]
    program_id: String,

    /// Environment id.
    #[arg(value_name = "ENVIRONMENT_ID")]
    environment_id: String,
}

impl Cmd {
    fn resolve(self) -> (MagentoCommand, Target) {
        let Cmd::Commerce {
            commerce: CommerceCmd::BinMagento { group },
        } = self;
        match group {
            BinMagentoCmd::Maintenance { action } => match action {
                MaintenanceCmd::Enable(t) => (MagentoCommand::MaintenanceEnable, t),
                MaintenanceCmd::Disable(t) => (MagentoCommand::MaintenanceDisable, t),
                MaintenanceCmd::Status(t) => (MagentoCommand::MaintenanceStatus, t),
            },
            BinMagentoCmd::Cache { action } => match action {
                CacheCmd::Clean(t) => (MagentoCommand::CacheClean, t),
                CacheCmd::Flush(t) => (MagentoCommand::CacheFlush, t),
            },
            BinMagentoCmd::Indexer { action } => match action {
                IndexerCmd::Reindex(t) => (MagentoCommand::IndexerReindex, t),
                IndexerCmd::Info(t) => (MagentoCommand::IndexerInfo, t),
            },
            BinMagentoCmd::App { action } => match action {
                AppCmd::ConfigStatus(t) => (MagentoCommand::AppConfigStatus, t),
            },
        }
    }
}

/// File values, then the `--ims-context` selection, then `CLOUDMANAGER_*`
/// credentials for the selected context.
fn load_config(
    path: &Path,
    ims_context: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Config> {
    let config = Config::load_or_default(path)
        .with_context(|| format!("load config {}", path.display()))?;
    Ok(config.select_context(ims_context).apply_env(env))
}

fn poll_policy(
    config: &Config,
    interval_ms: Option<u64>,
    max_polls: Option<u32>,
) -> Result<PollPolicy, Error> {
    let mut policy = config.poll_policy()?;
    if let Some(ms) = interval_ms {
        policy = policy.with_interval(Duration::from_millis(ms));
    }
    if max_polls.is_some() {
        policy = policy.with_max_attempts(max_polls);
    }
    policy.validate()?;
    Ok(policy)
}

fn build_runner(
    config: &Config,
    policy: PollPolicy,
) -> CommandExecutionRunner<StaticIdentity, HttpConnector> {
    CommandExecutionRunner::new(config.identity(), HttpConnector::new())
        .with_base_url(config.cloudmanager.base_url.clone())
        .with_policy(policy)
}

fn progress_line(command: MagentoCommand, target: &Target) -> String {
    format!(
        "{} on environment {} (program {})...",
        command.progress(),
        target.environment_id,
        target.program_id
    )
}

fn render(outcome: &ExecutionOutcome, json: bool) -> anyhow::Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(outcome)?)
    } else {
        Ok(outcome.message.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(&cli.log))
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = load_config(&config_path, cli.ims_context.as_deref(), |k| {
        std::env::var(k).ok()
    })?;

    let policy = poll_policy(&config, cli.poll_interval_ms, cli.max_polls)?;
    let runner = build_runner(&config, policy);

    let (command, target) = cli.cmd.resolve();
    tracing::debug!(%command, program_id = %target.program_id, environment_id = %target.environment_id, "running");
    eprintln!("{}", progress_line(command, &target));

    let outcome = runner
        .run(&target.program_id, &target.environment_id, command)
        .await?;
    println!("{}", render(&outcome, cli.json)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use cloudmanager_core::config::{ENV_ACCESS_TOKEN, ENV_CLIENT_ID, ENV_ORG_ID};
    use cloudmanager_core::{CommandExecutionStatus, ExecutionId, IdentityProvider};

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("cloudmanagerctl").chain(args.iter().copied()))
    }

    #[test]
    fn missing_environment_is_rejected_by_parser() {
        let err = parse(&["commerce", "bin-magento", "maintenance", "enable", "--programId", "5"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn missing_program_is_rejected_by_parser() {
        let err = parse(&["commerce", "bin-magento", "maintenance", "enable", "10"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn maintenance_enable_parses() {
        let cli = parse(&["commerce", "bin-magento", "maintenance", "enable", "--programId", "5", "10"])
            .unwrap();
        let (command, target) = cli.cmd.resolve();
        assert_eq!(command, MagentoCommand::MaintenanceEnable);
        assert_eq!(target.program_id, "5");
        assert_eq!(target.environment_id, "10");
    }

    #[test]
    fn every_subcommand_maps_to_its_remote_command() {
        let cases = [
            (["maintenance", "enable"], "maintenance:enable"),
            (["maintenance", "disable"], "maintenance:disable"),
            (["maintenance", "status"], "maintenance:status"),
            (["cache", "clean"], "cache:clean"),
            (["cache", "flush"], "cache:flush"),
            (["indexer", "reindex"], "indexer:reindex"),
            (["indexer", "info"], "indexer:info"),
            (["app", "config-status"], "app:config:status"),
        ];
        for ([group, action], expected) in cases {
            let cli = parse(&["commerce", "bin-magento", group, action, "--program-id", "5", "10"])
                .unwrap();
            let (command, _) = cli.cmd.resolve();
            assert_eq!(command.command(), expected);
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&[
            "commerce",
            "bin-magento",
            "cache",
            "flush",
            "--programId",
            "5",
            "10",
            "--json",
            "--max-polls",
            "12",
            "--imsContextName",
            "ci",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.max_polls, Some(12));
        assert_eq!(cli.ims_context.as_deref(), Some("ci"));
    }

    #[test]
    fn zero_poll_flags_are_rejected_by_parser() {
        let base = ["commerce", "bin-magento", "cache", "clean", "--programId", "5", "10"];
        for flag in ["--max-polls", "--poll-interval-ms"] {
            let mut args = base.to_vec();
            args.extend([flag, "0"]);
            let err = parse(&args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ValueValidation, "{flag}");
        }
    }

    #[test]
    fn flags_override_config_policy() {
        let mut config = Config::default();
        config.polling.max_attempts = Some(3);
        let policy = poll_policy(&config, Some(200), None).unwrap();
        assert_eq!(policy.interval, Duration::from_millis(200));
        assert_eq!(policy.max_attempts, Some(3));

        let policy = poll_policy(&config, None, Some(9)).unwrap();
        assert_eq!(policy.max_attempts, Some(9));
    }

    #[test]
    fn zero_config_bound_is_an_error_even_with_flags() {
        let mut config = Config::default();
        config.polling.max_attempts = Some(0);
        assert!(matches!(
            poll_policy(&config, None, None),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            poll_policy(&config, Some(100), Some(4)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn env_credentials_land_in_selected_context() {
        let env = |k: &str| match k {
            ENV_ORG_ID => Some("org".to_string()),
            ENV_CLIENT_ID => Some("client".to_string()),
            ENV_ACCESS_TOKEN => Some("token".to_string()),
            _ => None,
        };
        let missing = Path::new("/nonexistent/cloudmanager/config.toml");

        let config = load_config(missing, Some("ci"), env).unwrap();
        let identity = config.identity();
        assert_eq!(identity.context_name(), "ci");
        assert_eq!(identity.current_context().unwrap().org_id, "org");

        let config = load_config(missing, None, env).unwrap();
        assert_eq!(
            config.identity().context_name(),
            "aio-cli-plugin-cloudmanager"
        );
        assert!(config.identity().current_context().is_ok());
    }

    #[test]
    fn progress_line_names_command_and_target() {
        let target = Target {
            program_id: "5".into(),
            environment_id: "10".into(),
        };
        assert_eq!(
            progress_line(MagentoCommand::MaintenanceEnable, &target),
            "Enabling maintenance mode on environment 10 (program 5)..."
        );
        assert_eq!(
            progress_line(MagentoCommand::CacheFlush, &target),
            "Flushing cache on environment 10 (program 5)..."
        );
    }

    #[test]
    fn render_plain_and_json() {
        let outcome = ExecutionOutcome {
            execution_id: ExecutionId::new("5000"),
            status: CommandExecutionStatus::Complete,
            message: "maintenance enabled".into(),
            polls: 3,
        };
        assert_eq!(render(&outcome, false).unwrap(), "maintenance enabled");
        let v: serde_json::Value = serde_json::from_str(&render(&outcome, true).unwrap()).unwrap();
        assert_eq!(v["executionId"], "5000");
        assert_eq!(v["status"], "COMPLETE");
        assert_eq!(v["polls"], 3);
    }

    #[tokio::test]
    async fn missing_ims_context_fails_without_network() {
        let mut config = Config::default();
        // nothing listens here; a request would surface as a transport error
        config.cloudmanager.base_url = "http://127.0.0.1:9".into();
        let runner = build_runner(&config, PollPolicy::default());

        let err = runner
            .run("5", "10", MagentoCommand::MaintenanceEnable)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthContext { .. }));
        assert_eq!(
            err.to_string(),
            "unable to find IMS context aio-cli-plugin-cloudmanager"
        );
    }
}
