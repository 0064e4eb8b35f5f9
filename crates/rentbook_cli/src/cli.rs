//! Command-line interface definitions.

use crate::config::Overrides;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Rentbook - utility bills and monthly rent settlements on a local database.
#[derive(Parser, Debug)]
#[command(name = "rentbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (default: ./rentbook.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(long = "db", global = true)]
    pub db_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Directory for rolling log files
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the local HTTP API (default)
    Serve(ServeArgs),

    /// Check database schema, integrity and contents
    Doctor,

    /// Write a consistent copy of the database
    Export(ExportArgs),

    /// Replace the database with a previously exported file
    Import(ImportArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to listen on, e.g. 127.0.0.1:8000
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Destination file
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Database file to restore from
    #[arg(long)]
    pub from: PathBuf,
}

impl Cli {
    /// Collects flag values that take precedence over file and environment.
    pub fn overrides(&self) -> Overrides {
        let bind = match &self.command {
            Some(Commands::Serve(args)) => args.bind.clone(),
            _ => None,
        };
        Overrides {
            db_path: self.db_path.clone(),
            bind,
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_serve_defaults() {
        let cli = Cli::parse_from(["rentbook"]);
        assert!(cli.command.is_none());
        assert!(cli.overrides().bind.is_none());
    }

    #[test]
    fn serve_bind_and_global_flags_become_overrides() {
        let cli = Cli::parse_from([
            "rentbook",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--db",
            "/tmp/books.db",
        ]);
        let overrides = cli.overrides();
        assert_eq!(overrides.bind.as_deref(), Some("0.0.0.0:9000"));
        assert_eq!(overrides.db_path, Some(PathBuf::from("/tmp/books.db")));
    }

    #[test]
    fn import_requires_source_file() {
        assert!(Cli::try_parse_from(["rentbook", "import"]).is_err());
        let cli = Cli::parse_from(["rentbook", "import", "--from", "backup.db"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Import(args)) if args.from == PathBuf::from("backup.db")
        ));
    }
}
