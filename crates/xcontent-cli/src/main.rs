use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use xcontent_cli::{
    ExtractArgs, InfoArgs, LsArgs, MountOptions, OutputFormat, commands, output::OutputStyle,
};

#[derive(Parser)]
#[command(
    name = "xcontent",
    about = "Inspect and extract Xbox 360 STFS and SVOD content packages",
    version,
    author,
    long_about = "A command-line tool for mounting Xbox 360 XContent packages (CON, LIVE and PIRS) read-only, printing their metadata and directory tree, and extracting their files."
)]
struct Cli {
    /// Set the logging level (RUST_LOG takes precedence)
    #[arg(long, value_enum, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Path to a JSON mount configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Draw tables with ASCII instead of Unicode borders
    #[arg(long, global = true)]
    ascii: bool,

    /// Fail on block chains that disagree with their directory record
    #[arg(long, global = true)]
    strict: bool,

    /// Maximum number of SVOD directory records to visit
    #[arg(long, global = true)]
    max_directory_nodes: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show package metadata
    Info(InfoArgs),

    /// List the entries of a package
    Ls(LsArgs),

    /// Extract files from a package
    Extract(ExtractArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = Level::from(cli.log_level).as_str().to_ascii_lowercase();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = MountOptions {
        config: cli.config,
        strict: cli.strict,
        max_directory_nodes: cli.max_directory_nodes,
    };

    let mut style = OutputStyle::new();
    if cli.no_color {
        style = style.no_color();
    }
    if cli.ascii {
        style = style.ascii();
    }

    match cli.command {
        Commands::Info(args) => commands::info::handle(args, &options, cli.format, &style)?,
        Commands::Ls(args) => commands::ls::handle(args, &options, cli.format, &style)?,
        Commands::Extract(args) => {
            commands::extract::handle(args, &options, cli.format, &style)?;
        }
    }

    Ok(())
}
