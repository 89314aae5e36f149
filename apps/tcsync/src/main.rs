//! tcsync - sync LDAP directory groups into TeamCity
//!
//! For every directory group matching a `--group` pattern, creates the
//! TeamCity group if missing, creates missing users and adds missing
//! memberships. Nothing is ever removed from TeamCity.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tcsync_connector_ldap::LdapDirectory;
use tcsync_connector_teamcity::TeamCityClient;
use tcsync_reconcile::{Reconciler, SyncReport};

mod config;
mod error;

use config::SyncArgs;
use error::{CliError, CliResult};

/// tcsync - one-way, additive LDAP to TeamCity group sync
#[derive(Parser)]
#[command(name = "tcsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    sync: SyncArgs,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    // Load .env before parsing so env fallbacks see it
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.sync).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(verbose)
        .init();
}

async fn run(args: SyncArgs) -> CliResult<()> {
    let settings = args.into_settings()?;

    let token = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(token.clone()));

    info!(
        ldap = %settings.ldap.url(),
        base_dn = %settings.ldap.base_dn,
        teamcity = %settings.teamcity.base_url,
        patterns = ?settings.patterns,
        dry_run = settings.options.dry_run,
        "Starting sync"
    );

    let target = Arc::new(TeamCityClient::new(settings.teamcity)?);
    let reconciler = Reconciler::new(target, settings.options)?.with_cancellation(token.clone());

    let mut directory = tokio::select! {
        directory = LdapDirectory::connect(settings.ldap) => directory?,
        _ = token.cancelled() => {
            return Err(CliError::Cancelled("connect to directory".to_string()));
        }
    };

    let result = reconciler.run(&mut directory, &settings.patterns).await;

    if let Err(e) = directory.close().await {
        warn!(error = %e, "Failed to close directory session");
    }

    let report = result?;
    log_summary(&report);

    if report.is_clean() {
        Ok(())
    } else {
        Err(CliError::PartialSync {
            failures: report.failures.len(),
        })
    }
}

async fn cancel_on_ctrl_c(token: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            warn!("Received Ctrl+C, cancelling sync");
            token.cancel();
        }
        Err(e) => error!("Failed to install Ctrl+C handler: {e}"),
    }
}

fn log_summary(report: &SyncReport) {
    let elapsed_ms = report
        .duration()
        .map(|d| d.num_milliseconds())
        .unwrap_or_default();

    info!(
        dry_run = report.dry_run,
        groups_examined = report.groups_examined,
        groups_created = report.groups_created,
        users_created = report.users_created,
        memberships_added = report.memberships_added,
        failures = report.failures.len(),
        elapsed_ms,
        "Sync finished"
    );

    for failure in &report.failures {
        warn!(
            entity = %failure.entity,
            operation = %failure.operation,
            code = %failure.error_code,
            "{}",
            failure.message
        );
    }
}
