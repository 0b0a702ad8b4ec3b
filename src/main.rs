//! KeyAuth license client
//!
//! Usage:
//!   keyauth hwid
//!   keyauth activate KA-XXXX --username alice
//!   keyauth validate KA-XXXX --username alice --repeat 10 --interval 60
//!
//! The password is read from `--password` or `KEYAUTH_PASSWORD`. Exit status is
//! 0 on success, 2 when a license is not valid, and 1 on any other failure.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use keyauth::utils::logging::mask_secret;
use keyauth::{
    Credentials, HardwareIdentity, KeyAuthError, KeyAuthSettings, LicenseController,
    ValidationResult,
};
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "keyauth")]
#[command(version, about = "Bind license keys to this machine's hardware ID")]
struct Cli {
    /// Base URL of the KeyAuth API (overrides settings and KEYAUTH_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print this machine's hardware ID
    Hwid,

    /// Log in and activate a license key on this machine
    Activate {
        license_key: String,
        #[command(flatten)]
        login: LoginArgs,
    },

    /// Log in and check a license key against this machine
    Validate {
        license_key: String,
        #[command(flatten)]
        login: LoginArgs,

        /// Number of checks to run
        #[arg(long, default_value = "1")]
        repeat: u32,

        /// Seconds between checks
        #[arg(long, default_value = "60")]
        interval: u64,
    },

    /// Log in and list the licenses held by the user
    Status {
        #[command(flatten)]
        login: LoginArgs,
    },

    /// Log in and print the user's profile
    Whoami {
        #[command(flatten)]
        login: LoginArgs,
    },
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(short, long, env = "KEYAUTH_USERNAME")]
    username: String,

    #[arg(short, long, env = "KEYAUTH_PASSWORD", hide_env_values = true)]
    password: String,
}

impl LoginArgs {
    fn credentials(self) -> Credentials {
        Credentials::new(self.username, self.password)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            match err.downcast_ref::<KeyAuthError>() {
                Some(keyauth_err) => eprintln!("Error: {}", keyauth_err.user_message()),
                None => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings =
        KeyAuthSettings::load().map_err(|e| anyhow!("Failed to load settings: {e}"))?;
    if let Some(api_url) = cli.api_url {
        settings.api.base_url = api_url;
    }

    match cli.command {
        Command::Hwid => {
            let identity =
                HardwareIdentity::system().with_process_cache(settings.identity.cache_for_process);
            let hwid = identity.resolve()?;
            println!("{hwid} ({})", hwid.source());
            Ok(ExitCode::SUCCESS)
        }
        Command::Activate { license_key, login } => {
            let mut controller = logged_in(&settings, login).await?;
            let result = controller.activate(&license_key).await?;
            println!("{}", result.message.as_deref().unwrap_or("License activated"));
            println!("Type: {}", result.license_type);
            match result.expires_at {
                Some(expires_at) => println!("Expires: {}", expires_at.format("%Y-%m-%d %H:%M UTC")),
                None => println!("Expires: never"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Validate {
            license_key,
            login,
            repeat,
            interval,
        } => {
            let mut controller = logged_in(&settings, login).await?;
            let mut last = None;
            for attempt in 1..=repeat.max(1) {
                if attempt > 1 {
                    tokio::time::sleep(Duration::from_secs(interval)).await;
                }
                let result = controller.validate(&license_key).await?;
                print_validation(&result);
                last = Some(result);
            }
            Ok(match last {
                Some(result) if result.valid => ExitCode::SUCCESS,
                _ => ExitCode::from(2),
            })
        }
        Command::Status { login } => {
            let mut controller = logged_in(&settings, login).await?;
            let licenses = controller.license_status().await?;
            if licenses.is_empty() {
                println!("No licenses");
            }
            for license in licenses {
                let expires = license
                    .expires_at
                    .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d").to_string());
                println!(
                    "{}\t{}\t{}\texpires {}\t{}",
                    license.key,
                    license.license_type,
                    license.status,
                    expires,
                    if license.is_valid { "valid" } else { "not valid" }
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Whoami { login } => {
            let mut controller = logged_in(&settings, login).await?;
            let profile = controller.auth_session_mut().fetch_profile().await?;
            println!("{} (id {})", profile.username, profile.id);
            if let Some(email) = profile.email {
                println!("Email: {email}");
            }
            if profile.is_admin {
                println!("Role: admin");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn logged_in(settings: &KeyAuthSettings, login: LoginArgs) -> Result<LicenseController> {
    let mut controller = LicenseController::from_settings(settings)?;
    let session = controller.login(login.credentials()).await?;
    info!(
        "Logged in as {} against {}",
        mask_secret(&session.username),
        settings.api.base_url
    );
    Ok(controller)
}

fn print_validation(result: &ValidationResult) {
    if result.valid {
        println!("{}", result.describe());
    } else {
        warn!("License check failed: {}", result.describe());
        println!("{}", result.describe());
    }
}
