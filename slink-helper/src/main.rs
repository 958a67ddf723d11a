use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use slink_helper::helper::HelperLoop;
use slink_user::config::*;
use slink_user::login::{pam_provider::*, static_provider::*, ArcLoginProvider};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,

    /// A special mode dedicated to developers, NOT INTENDED FOR PRODUCTION
    #[clap(long)]
    dev: bool,

    #[clap(
        short,
        long,
        env = "SLINK_HELPER_CONFIG",
        default_value = "slink-helper.toml"
    )]
    /// Path to the helper configuration file
    config_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer the proxy's requests on stdin/stdout, this is what runs when no command is given
    Serve,

    #[clap(subcommand)]
    /// Manage the users of a static configuration file
    Account(AccountManagement),

    #[clap(subcommand)]
    /// Specific tooling, should not be part of a normal workflow
    Tools(ToolsCommand),
}

#[derive(Subcommand, Debug)]
enum ToolsCommand {
    /// Print the argon2 hash of a password, to be used in a static configuration
    PasswordHash {
        #[clap(env = "SLINK_HELPER_PASSWORD")]
        maybe_password: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum AccountManagement {
    /// Add an account
    Add {
        #[clap(short, long)]
        login: String,

        #[clap(env = "SLINK_HELPER_PASSWORD")]
        maybe_password: Option<String>,
    },
    /// Delete an account
    Delete {
        #[clap(short, long)]
        login: String,
    },
    /// Change password for a given account
    ChangePassword {
        #[clap(short, long)]
        login: String,

        #[clap(env = "SLINK_HELPER_PASSWORD")]
        maybe_password: Option<String>,
    },
}

fn tracer() {
    // stdout belongs to the verdicts
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var(
            "RUST_LOG",
            "slink_helper=info,slink_user=info,slink_proto=info",
        )
    }

    // Report panics, the helper loop recovers from them
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("{}", panic_info);
        eprintln!("{:?}", backtrace::Backtrace::new());
    }));

    tracer();

    let args = Args::parse();
    match &args.command {
        None | Some(Command::Serve) => serve(&args).await?,
        Some(Command::Account(cmd)) => account_management(cmd, args.config_file.clone())?,
        Some(Command::Tools(ToolsCommand::PasswordHash { maybe_password })) => {
            let password = match maybe_password {
                Some(pwd) => pwd.clone(),
                None => rpassword::prompt_password("Enter password: ")?,
            };
            println!("{}", hash_password(&password)?);
        }
    }

    Ok(())
}

async fn serve(args: &Args) -> Result<()> {
    let config: HelperConfig = if args.dev {
        HelperConfig::Static(StaticConfig::demo())
    } else {
        read_config(args.config_file.clone()).context(format!(
            "'{:?}' must be a helper configuration file",
            args.config_file
        ))?
    };

    let login: ArcLoginProvider = match config {
        HelperConfig::Static(cfg) => Arc::new(StaticLoginProvider::new(cfg)?),
        HelperConfig::Pam(cfg) => Arc::new(PamLoginProvider::new(cfg)?),
    };

    tracing::info!("Helper ready, waiting for requests");
    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();
    HelperLoop::new(reader, writer, login).run().await
}

fn account_management(cmd: &AccountManagement, config_file: PathBuf) -> Result<()> {
    let existing: HelperConfig = match config_file.exists() {
        true => read_config(config_file.clone())
            .context(format!("'{:?}' must be a helper configuration file", config_file))?,
        false => HelperConfig::Static(StaticConfig::default()),
    };
    let mut config = match existing {
        HelperConfig::Static(cfg) => cfg,
        HelperConfig::Pam(_) => bail!("Accounts of the PAM backend are managed by the operating system."),
    };

    match cmd {
        AccountManagement::Add {
            login,
            maybe_password,
        } => {
            tracing::debug!(user = %login, "will-create");
            if config.users.contains_key(login) {
                bail!("user {} already exists", login);
            }
            let password = password_or_prompt(maybe_password)?;
            set_user(&mut config, login, &password)?;
        }
        AccountManagement::Delete { login } => {
            tracing::debug!(user = %login, "will-delete");
            if config.users.remove(login).is_none() {
                bail!("user {} does not exist", login);
            }
        }
        AccountManagement::ChangePassword {
            login,
            maybe_password,
        } => {
            if !config.users.contains_key(login) {
                bail!("user {} does not exist", login);
            }
            let password = password_or_prompt(maybe_password)?;
            set_user(&mut config, login, &password)?;
        }
    };

    write_config(config_file, &HelperConfig::Static(config))
}

fn password_or_prompt(maybe_password: &Option<String>) -> Result<String> {
    match maybe_password {
        Some(pwd) => Ok(pwd.clone()),
        None => {
            let password = rpassword::prompt_password("Enter password: ")?;
            let password_confirm = rpassword::prompt_password("Confirm password: ")?;
            if password != password_confirm {
                bail!("Passwords don't match.");
            }
            Ok(password)
        }
    }
}
