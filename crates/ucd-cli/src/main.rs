//! CLI entry point - the composition root.
//!
//! Parses arguments, sets up logging, wires the context via bootstrap and
//! routes each command to its handler.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use ucd_cli::handlers::{self, GetArgs};
use ucd_cli::{
    Cli, CliConfig, CliError, Commands, InstalledCommand, InstallingCommand, RootCommand,
    bootstrap,
};
use ucd_core::DownloadManagerConfig;

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    let mut engine = DownloadManagerConfig::default();
    if let Commands::Get { retries, .. } = &command {
        engine = engine.with_max_segment_retries(*retries);
    }
    let ctx = bootstrap(CliConfig {
        root_override: cli.root,
        engine,
    })
    .await?;

    match command {
        Commands::Get {
            url,
            appid,
            name,
            filename,
            image_url,
            concurrency,
            min_chunk,
            retries: _,
            no_install,
        } => {
            let args = GetArgs {
                url,
                appid,
                name,
                filename,
                image_url,
                concurrency,
                min_chunk,
                install: !no_install,
            };
            handlers::get::execute(&ctx, args).await?;
        }
        Commands::Installed { command } => match command {
            InstalledCommand::List { json } => handlers::installed::list(&ctx, json).await?,
            InstalledCommand::Get { appid } => handlers::installed::get(&ctx, &appid).await?,
            InstalledCommand::Reindex => handlers::installed::reindex(&ctx).await?,
        },
        Commands::Installing {
            command: InstallingCommand::List { json },
        } => handlers::installed::list_installing(&ctx, json).await?,
        Commands::Disks => handlers::disks::list(&ctx).await?,
        Commands::Usage { path } => handlers::disks::usage(&ctx, path.as_deref()).await?,
        Commands::Root { command } => match command {
            RootCommand::Get => handlers::root::get(&ctx),
            RootCommand::Set { path } => handlers::root::set(&ctx, &path).await?,
        },
    }

    Ok(())
}
