//! CLI argument definitions for keel.
//!
//! The command tree is declared with `clap` derive. [`build_command`] then
//! layers environment-variable defaults over it: every argument of every
//! command can be defaulted by `KEEL_<SUBCOMMAND PATH>_<ARG ID>`, e.g.
//! `KEEL_DOCKER_RUN_NETWORK` or `KEEL_DOCKER_RUN_TAG`.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Arg, Args, Command, CommandFactory, Parser, Subcommand, ValueEnum};

use crate::container::DEFAULT_TAG;
use crate::credentials::CredentialOptions;

/// Prefix of every environment default.
pub const ENV_DEFAULT_PREFIX: &str = "KEEL";

/// `keel --version` with build details.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("KEEL_GIT_COMMIT"),
    ", built ",
    env!("KEEL_BUILD_TIMESTAMP"),
    ")"
);

/// Root arguments the environment may not default.
const ENV_EXEMPT_ARGS: &[&str] = &["telemetry", "help", "version"];

/// keel - scaffold, run and ship blockchain client applications.
///
/// Start with `keel docker build` in your project, then `keel docker run <NETWORK>`.
#[derive(Parser, Debug)]
#[command(name = "keel")]
#[command(author, version, long_version = LONG_VERSION)]
#[command(about = "Build, run and ship blockchain client applications", long_about = None)]
pub struct Cli {
    /// Upload usage telemetry for the given arguments, then exit
    #[arg(long, hide = true)]
    pub telemetry: bool,

    /// Output as JSON instead of human-readable text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Wallet management
    Wallet {
        #[command(subcommand)]
        command: WalletCommands,
    },

    /// Build and run the application container
    Docker {
        #[command(subcommand)]
        command: DockerCommands,
    },

    /// Account management
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },

    /// Log in to your keel account (same as `keel account login`)
    Login(LoginArgs),

    /// Log out of your keel account (same as `keel account logout`)
    Logout,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Wallet subcommands
#[derive(Subcommand, Debug)]
pub enum WalletCommands {
    /// Create a new encrypted wallet file
    Create {
        /// Directory to write the wallet into [default: <keel home>/keystore]
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Wallet password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Use an existing wallet file as the default credential
    Default {
        /// Path to the wallet file
        path: PathBuf,

        /// Wallet password (prompted for when omitted; may be empty)
        #[arg(long)]
        password: Option<String>,
    },
}

/// Docker subcommands
#[derive(Subcommand, Debug)]
pub enum DockerCommands {
    /// Build the application image (`docker build -t TAG .`)
    Build(DockerBuildArgs),

    /// Run the application container against a network
    Run(DockerRunArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DockerBuildArgs {
    /// Image tag
    #[arg(short, long, default_value = DEFAULT_TAG)]
    pub tag: String,

    /// Project directory [default: current directory]
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Print the docker command instead of running it
    #[arg(short, long)]
    pub print: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DockerRunArgs {
    /// Network to connect to (e.g. mainnet, sepolia)
    pub network: String,

    /// Image tag
    #[arg(short, long, default_value = DEFAULT_TAG)]
    pub tag: String,

    /// Mount the keel home directory into the container
    #[arg(short, long)]
    pub local: bool,

    /// Project directory [default: current directory]
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Print the docker command instead of running it
    #[arg(short, long)]
    pub print: bool,

    #[command(flatten)]
    pub credentials: CredentialsArgs,
}

/// Credential options. The first one given wins: wallet path, private key,
/// wallet JSON. With none, the default wallet is used.
#[derive(Args, Debug, Clone, Default)]
pub struct CredentialsArgs {
    /// Wallet file to sign with
    #[arg(long)]
    pub wallet_path: Option<PathBuf>,

    /// Password of --wallet-path
    #[arg(long)]
    pub wallet_password: Option<String>,

    /// Raw hex private key
    #[arg(long)]
    pub private_key: Option<String>,

    /// Wallet as a JSON string
    #[arg(long)]
    pub wallet_json: Option<String>,
}

impl CredentialsArgs {
    pub fn to_options(&self) -> CredentialOptions {
        CredentialOptions {
            wallet_path: self.wallet_path.clone(),
            wallet_password: self.wallet_password.clone().unwrap_or_default(),
            private_key: self.private_key.clone().unwrap_or_default(),
            wallet_json: self.wallet_json.clone().unwrap_or_default(),
        }
    }
}

/// Account subcommands
#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    /// Store an account token
    Login(LoginArgs),

    /// Forget the stored account token
    Logout,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Account token (prompted for when omitted)
    #[arg(long)]
    pub token: Option<String>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings and where each came from
    Show,

    /// Turn background usage telemetry on or off
    Telemetry {
        #[arg(value_enum)]
        state: TelemetryState,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryState {
    Enable,
    Disable,
}

/// The command tree with environment defaults applied from `env`.
pub fn build_command(env: &HashMap<String, String>) -> Command {
    apply_env_defaults(Cli::command(), &[], env)
}

/// Environment variable that defaults argument `id` of the command at `path`.
pub fn env_var_name(path: &[String], id: &str) -> String {
    std::iter::once(ENV_DEFAULT_PREFIX)
        .chain(path.iter().map(String::as_str))
        .chain(std::iter::once(id))
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
        .replace('-', "_")
}

fn apply_env_defaults(cmd: Command, path: &[String], env: &HashMap<String, String>) -> Command {
    let is_root = path.is_empty();

    cmd.mut_args(|arg| {
        let id = arg.get_id().as_str().to_string();
        if is_root && ENV_EXEMPT_ARGS.contains(&id.as_str()) {
            return arg;
        }
        match env.get(&env_var_name(path, &id)).filter(|v| !v.is_empty()) {
            Some(value) => with_env_default(arg, value),
            None => arg,
        }
    })
    .mut_subcommands(|sub| {
        let mut sub_path = path.to_vec();
        sub_path.push(sub.get_name().to_string());
        apply_env_defaults(sub, &sub_path, env)
    })
}

fn with_env_default(arg: Arg, value: &str) -> Arg {
    // Switches only accept true/false.
    let value = if arg.get_action().takes_values() {
        value.to_string()
    } else {
        is_truthy(value).to_string()
    };
    arg.required(false).default_value(value)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::FromArgMatches;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn parse(env_vars: &[(&str, &str)], args: &[&str]) -> Result<Cli, clap::Error> {
        let mut cmd = build_command(&env(env_vars));
        let matches = cmd.try_get_matches_from_mut(std::iter::once("keel").chain(args.iter().copied()))?;
        Cli::from_arg_matches(&matches)
    }

    fn run_args(cli: Cli) -> DockerRunArgs {
        match cli.command {
            Some(Commands::Docker {
                command: DockerCommands::Run(args),
            }) => args,
            other => panic!("expected docker run, got {:?}", other),
        }
    }

    #[test]
    fn verify_cli() {
        // This will panic if the CLI is misconfigured
        Cli::command().debug_assert();
        build_command(&env(&[("KEEL_DOCKER_RUN_NETWORK", "sepolia")])).debug_assert();
    }

    #[test]
    fn test_env_var_name() {
        let path = vec!["docker".to_string(), "run".to_string()];
        assert_eq!(env_var_name(&path, "wallet_path"), "KEEL_DOCKER_RUN_WALLET_PATH");
        assert_eq!(env_var_name(&[], "json"), "KEEL_JSON");
        assert_eq!(
            env_var_name(&["config".to_string()], "some-id"),
            "KEEL_CONFIG_SOME_ID"
        );
    }

    #[test]
    fn test_docker_run_defaults() {
        let args = run_args(parse(&[], &["docker", "run", "sepolia"]).unwrap());
        assert_eq!(args.network, "sepolia");
        assert_eq!(args.tag, DEFAULT_TAG);
        assert!(!args.local);
        assert!(!args.print);
        assert_eq!(args.credentials.to_options(), CredentialOptions::default());
    }

    #[test]
    fn test_docker_run_all_options() {
        let args = run_args(
            parse(
                &[],
                &[
                    "docker",
                    "run",
                    "mainnet",
                    "-t",
                    "myapp",
                    "-l",
                    "-p",
                    "-d",
                    "/proj",
                    "--wallet-path",
                    "/k/w.json",
                    "--wallet-password",
                    "pw",
                    "--private-key",
                    "0xabc",
                ],
            )
            .unwrap(),
        );
        assert_eq!(args.tag, "myapp");
        assert!(args.local && args.print);
        assert_eq!(args.dir, Some(PathBuf::from("/proj")));

        let options = args.credentials.to_options();
        assert_eq!(options.wallet_path, Some(PathBuf::from("/k/w.json")));
        assert_eq!(options.wallet_password, "pw");
        assert_eq!(options.private_key, "0xabc");
    }

    #[test]
    fn test_missing_network_is_usage_error() {
        let err = parse(&[], &["docker", "run"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_env_supplies_required_positional() {
        let args = run_args(
            parse(
                &[("KEEL_DOCKER_RUN_NETWORK", "sepolia"), ("KEEL_DOCKER_RUN_TAG", "envtag")],
                &["docker", "run"],
            )
            .unwrap(),
        );
        assert_eq!(args.network, "sepolia");
        assert_eq!(args.tag, "envtag");
    }

    #[test]
    fn test_command_line_beats_env() {
        let args = run_args(
            parse(&[("KEEL_DOCKER_RUN_TAG", "envtag")], &["docker", "run", "x", "-t", "cli"]).unwrap(),
        );
        assert_eq!(args.tag, "cli");
    }

    #[test]
    fn test_env_switch_values() {
        let args = run_args(
            parse(
                &[("KEEL_DOCKER_RUN_LOCAL", "1"), ("KEEL_DOCKER_RUN_PRINT", "no")],
                &["docker", "run", "x"],
            )
            .unwrap(),
        );
        assert!(args.local);
        assert!(!args.print);
    }

    #[test]
    fn test_env_credentials() {
        let args = run_args(
            parse(&[("KEEL_DOCKER_RUN_PRIVATE_KEY", "0xfeed")], &["docker", "run", "x"]).unwrap(),
        );
        assert_eq!(args.credentials.to_options().private_key, "0xfeed");
    }

    #[test]
    fn test_empty_env_value_ignored() {
        let err = parse(&[("KEEL_DOCKER_RUN_NETWORK", "")], &["docker", "run"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_env_cannot_force_telemetry_mode() {
        let cli = parse(&[("KEEL_TELEMETRY", "true")], &["logout"]).unwrap();
        assert!(!cli.telemetry);
        assert!(matches!(cli.command, Some(Commands::Logout)));
    }

    #[test]
    fn test_json_is_global() {
        let cli = parse(&[], &["config", "show", "--json"]).unwrap();
        assert!(cli.json);
    }

    #[test]
    fn test_config_telemetry_state() {
        let cli = parse(&[], &["config", "telemetry", "disable"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Config {
                command: ConfigCommands::Telemetry {
                    state: TelemetryState::Disable
                }
            })
        ));
    }

    #[test]
    fn test_unknown_subcommand_suggests() {
        let err = parse(&[], &["dokcer"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
        assert!(err.to_string().contains("docker"));
    }
}
