//! Command-line entry point for OMS.
//!
//! # Responsibility
//! - Load settings, open storage and drive `OmsService` use-cases.
//! - Print results as JSON on stdout; failures as JSON on stderr.

use clap::{Parser, Subcommand};
use oms_core::{init_logging, OmsService, OmsSettings, ServiceError, SqliteConnector};
use serde_json::json;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "oms", version, about = "Organization management command line")]
struct Cli {
    /// Settings file; defaults to `<config-dir>/<OMS_PROFILE>.toml`.
    #[arg(long, env = "OMS_CONFIG")]
    config: Option<PathBuf>,
    /// Directory searched for profile settings files.
    #[arg(long, default_value = "env")]
    config_dir: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Checks core linkage.
    Ping,
    /// Registers an organization and its admin user.
    CreateOrg {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Looks an organization up by name.
    GetOrg {
        #[arg(long)]
        name: String,
    },
    /// Authenticates an admin and prints a session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!(
                "{}",
                json!({ "failure_code": "internal_error", "failure_message": err.to_string() })
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    if let Command::Ping = cli.command {
        println!(
            "{}",
            json!({ "ping": oms_core::ping(), "version": oms_core::core_version() })
        );
        return Ok(ExitCode::SUCCESS);
    }

    let settings = match &cli.config {
        Some(path) => OmsSettings::load_file(path)?,
        None => OmsSettings::load_from_env(&cli.config_dir)?,
    };
    if let Some(log_dir) = &settings.log_dir {
        init_logging(&settings.log_level, log_dir, &settings.service_acronym)?;
    }

    let connector = match &settings.database_path {
        Some(path) => SqliteConnector::open(path)?,
        None => SqliteConnector::in_memory()?,
    };
    if settings.recreate_db_tables {
        connector.recreate_schema()?;
    }
    let service = OmsService::new(&connector, &settings)?;

    match cli.command {
        Command::Ping => Ok(ExitCode::SUCCESS),
        Command::CreateOrg {
            name,
            email,
            password,
        } => match service.create_organization(&name, &email, &password) {
            Ok(created) => {
                println!("{}", serde_json::to_string_pretty(&created)?);
                Ok(ExitCode::SUCCESS)
            }
            Err(ServiceError::Conflict(message)) => Ok(failure("conflict", &message)),
            Err(ServiceError::InvalidInput(message)) => Ok(failure("invalid_input", &message)),
            Err(err) => Err(err.into()),
        },
        Command::GetOrg { name } => match service.get_organization_by_name(&name)? {
            Some(summary) => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                Ok(ExitCode::SUCCESS)
            }
            None => Ok(failure("not_found", "Organization not found")),
        },
        Command::Login { email, password } => {
            match service.authenticate_admin(&email, &password)? {
                Some(token) => {
                    println!("{}", json!({ "access_token": token }));
                    Ok(ExitCode::SUCCESS)
                }
                None => Ok(failure("unauthorized", "Invalid credentials")),
            }
        }
    }
}

fn failure(code: &str, message: &str) -> ExitCode {
    eprintln!(
        "{}",
        json!({ "failure_code": code, "failure_message": message })
    );
    ExitCode::from(2)
}
