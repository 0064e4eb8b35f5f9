//! `rentbook` entry point.
//!
//! # Responsibility
//! - Resolve configuration and initialize logging before any database work.
//! - Dispatch to the HTTP server or one of the maintenance commands.

mod cli;
mod config;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ExportArgs, ImportArgs};
use config::AppConfig;
use log::{error, info};
use rentbook_core::db::{diagnose, export_database, import_database, open_db};
use rentbook_web::AppState;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref(), &cli.overrides())?;

    rentbook_core::init_logging(&config.log_level, &config.log_dir)
        .map_err(anyhow::Error::msg)
        .context("failed to initialize logging")?;
    ensure_parent_dir(&config.db_path)?;

    let result = match cli.command {
        None | Some(Commands::Serve(_)) => serve(&config).await,
        Some(Commands::Doctor) => doctor(&config),
        Some(Commands::Export(args)) => export(&config, &args),
        Some(Commands::Import(args)) => import(&config, &args),
    };
    if let Err(err) = &result {
        error!("event=cli_command module=cli status=error error={err:#}");
    }
    result
}

async fn serve(config: &AppConfig) -> Result<()> {
    // Migrate before the first request arrives.
    drop(open_db(&config.db_path).with_context(|| {
        format!("failed to open database `{}`", config.db_path.display())
    })?);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    println!("rentbook listening on http://{}", listener.local_addr()?);

    rentbook_web::serve(listener, AppState::new(&config.db_path), shutdown_signal()).await?;
    Ok(())
}

fn doctor(config: &AppConfig) -> Result<()> {
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;
    let health = diagnose(&conn)?;

    println!("database:        {}", config.db_path.display());
    println!(
        "schema version:  {} (latest {})",
        health.schema_version, health.latest_supported
    );
    println!("integrity:       {}", health.integrity);
    println!("settings row:    {}", if health.has_settings { "present" } else { "missing" });
    println!("bills:           {}", health.bill_count);
    println!("closed months:   {}", health.closed_month_count);
    println!("active types:    {}", health.active_utility_type_count);
    if !health.missing_tables.is_empty() {
        println!("missing tables:  {}", health.missing_tables.join(", "));
    }

    info!(
        "event=doctor module=cli status={} bills={}",
        if health.is_healthy() { "ok" } else { "error" },
        health.bill_count
    );
    if !health.is_healthy() {
        bail!("database is not healthy");
    }
    println!("status:          ok");
    Ok(())
}

fn export(config: &AppConfig, args: &ExportArgs) -> Result<()> {
    let conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;
    ensure_parent_dir(&args.out)?;
    export_database(&conn, &args.out)
        .with_context(|| format!("failed to export to `{}`", args.out.display()))?;
    println!("exported {} -> {}", config.db_path.display(), args.out.display());
    Ok(())
}

fn import(config: &AppConfig, args: &ImportArgs) -> Result<()> {
    let mut conn = open_db(&config.db_path)
        .with_context(|| format!("failed to open database `{}`", config.db_path.display()))?;
    import_database(&mut conn, &args.from)
        .with_context(|| format!("failed to import `{}`", args.from.display()))?;
    println!("imported {} -> {}", args.from.display(), config.db_path.display());
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory `{}`", parent.display()))?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("event=shutdown_signal module=cli status=error error={err}");
    }
}
