//! Top-level dispatch: one call per process.
//!
//! ```text
//! banner -> bootstrap -> update prompt -> parse -> subcommand -> telemetry
//! ```
//!
//! A process started with `--telemetry` as its first argument is a telemetry
//! child: it uploads the event for the remaining arguments, refreshes the
//! update cache and exits without touching anything else.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::FromArgMatches;

use crate::cli::{self, AccountCommands, Cli, Commands, ConfigCommands, DockerCommands, WalletCommands};
use crate::commands::{self, Output};
use crate::config::{ConfigStore, Endpoints, ResolvedSettings, resolve_home, resolve_telemetry_disabled};
use crate::container::{ContainerEngine, DockerEngine, errors};
use crate::exec::{ProcessExecutor, SystemExecutor};
use crate::prompt::{DialoguerPrompter, Prompter};
use crate::wallet::{KeystoreWalletCreator, WalletCreator};
use crate::web::telemetry::{HttpTelemetry, TELEMETRY_FLAG, Telemetry};
use crate::web::updater::{HttpUpdateChecker, UpdateChecker};
use crate::{Result, banner, bootstrap};

/// The external collaborators a dispatch may use.
pub struct Services {
    pub prompter: Box<dyn Prompter>,
    pub wallets: Box<dyn WalletCreator>,
    pub telemetry: Box<dyn Telemetry>,
    pub updater: Box<dyn UpdateChecker>,
    pub engine: Box<dyn ContainerEngine>,
    pub executor: Box<dyn ProcessExecutor>,
}

impl Services {
    /// Real implementations talking to the terminal, disk, docker and the web.
    pub fn system(home: &Path, endpoints: &Endpoints) -> Self {
        Self {
            prompter: Box::new(DialoguerPrompter),
            wallets: Box::new(KeystoreWalletCreator),
            telemetry: Box::new(HttpTelemetry::new(endpoints.telemetry_url.value.clone(), home)),
            updater: Box::new(HttpUpdateChecker::new(endpoints.update_url.value.clone())),
            engine: Box::new(DockerEngine::new()),
            executor: Box::new(SystemExecutor),
        }
    }
}

/// Parse and run one invocation with the real collaborators.
pub fn parse(args: &[String], env: &HashMap<String, String>) -> i32 {
    let home = match resolve_home(env) {
        Ok(home) => home.value,
        Err(e) => {
            eprintln!("{}", errors::init_failed(&e));
            return 1;
        }
    };
    let services = Services::system(&home, &Endpoints::resolve(env));
    Dispatcher::new(services).parse(args, env)
}

pub struct Dispatcher {
    services: Services,
    cwd: Option<PathBuf>,
}

impl Dispatcher {
    pub fn new(services: Services) -> Self {
        Self { services, cwd: None }
    }

    /// Resolve relative paths against `cwd` instead of the process directory.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Run one invocation and return the process exit code.
    ///
    /// `args` excludes the program name.
    pub fn parse(&self, args: &[String], env: &HashMap<String, String>) -> i32 {
        let mut cmd = cli::build_command(env);

        let (home, mut store) = match open_store(env) {
            Ok(opened) => opened,
            Err(e) => {
                eprintln!("{}", errors::init_failed(&e));
                return 1;
            }
        };

        if args.first().map(String::as_str) == Some(TELEMETRY_FLAG) {
            self.report_usage(args, &mut store);
            return 0;
        }

        banner::print_banner();

        if let Err(e) = bootstrap::ensure_configured(&mut store, &home, self.services.wallets.as_ref()) {
            eprintln!("{}", errors::init_failed(&e));
            return 1;
        }
        self.services.updater.prompt_if_update_available(&mut store);

        let argv = std::iter::once("keel".to_string()).chain(args.iter().cloned());
        let cli = match cmd
            .try_get_matches_from_mut(argv)
            .and_then(|matches| Cli::from_arg_matches(&matches))
        {
            Ok(cli) => cli,
            Err(e) => {
                // clap renders the error, similar-name suggestions and usage.
                let _ = e.print();
                return e.exit_code();
            }
        };

        if cli.telemetry {
            self.report_usage(args, &mut store);
            return 0;
        }

        let code = match cli.command {
            Some(command) => match self.run(command, &mut store, &home, env) {
                Ok(output) => {
                    print_output(output.as_ref(), cli.json);
                    0
                }
                Err(e) => {
                    tracing::debug!(error = %e, "command failed");
                    eprintln!("{}", errors::render(&e));
                    e.exit_code()
                }
            },
            None => 0,
        };

        if args.is_empty() {
            let _ = cmd.print_help();
            println!();
        }

        let telemetry_disabled = resolve_telemetry_disabled(env, store.config());
        if !telemetry_disabled.value {
            if let Err(e) = self.services.telemetry.invoke_upload(args) {
                tracing::warn!(error = %e, "failed to start telemetry upload");
            }
        }

        code
    }

    /// Blocking upload plus a silent update check.
    fn report_usage(&self, args: &[String], store: &mut ConfigStore) {
        if let Err(e) = self.services.telemetry.upload(args) {
            tracing::warn!(error = %e, "telemetry upload failed");
        }
        self.services.updater.online_update_check(store);
    }

    fn run(
        &self,
        command: Commands,
        store: &mut ConfigStore,
        home: &Path,
        env: &HashMap<String, String>,
    ) -> Result<Box<dyn Output>> {
        let cwd = match &self.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir()?,
        };
        let services = &self.services;

        let output: Box<dyn Output> = match command {
            Commands::Docker { command } => match command {
                DockerCommands::Build(args) => Box::new(commands::docker_build(&args, &cwd, services)?),
                DockerCommands::Run(args) => {
                    Box::new(commands::docker_run(&args, store, home, &cwd, services)?)
                }
            },
            Commands::Wallet { command } => match command {
                WalletCommands::Create { dir, password } => Box::new(commands::wallet_create(
                    dir.as_ref(),
                    password.as_deref(),
                    home,
                    &cwd,
                    services,
                )?),
                WalletCommands::Default { path, password } => Box::new(commands::wallet_default(
                    &path,
                    password.as_deref(),
                    store,
                    &cwd,
                    services,
                )?),
            },
            Commands::Account { command } => match command {
                AccountCommands::Login(args) => {
                    Box::new(commands::login(args.token.as_deref(), store, services)?)
                }
                AccountCommands::Logout => Box::new(commands::logout(store)?),
            },
            Commands::Login(args) => Box::new(commands::login(args.token.as_deref(), store, services)?),
            Commands::Logout => Box::new(commands::logout(store)?),
            Commands::Config { command } => {
                let settings = ResolvedSettings::resolve(env, store.config())?;
                match command {
                    ConfigCommands::Show => Box::new(commands::config_show(store, &settings)),
                    ConfigCommands::Telemetry { state } => {
                        Box::new(commands::config_telemetry(state, store, &settings)?)
                    }
                }
            }
        };
        Ok(output)
    }
}

fn open_store(env: &HashMap<String, String>) -> Result<(PathBuf, ConfigStore)> {
    let home = resolve_home(env)?.value;
    let store = ConfigStore::open(&home)?;
    Ok((home, store))
}

fn print_output(output: &dyn Output, json: bool) {
    if json {
        println!("{}", output.to_json());
    } else {
        let human = output.to_human();
        if !human.is_empty() {
            println!("{}", human);
        }
    }
}
