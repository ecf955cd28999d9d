// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use modelstore::{DatabaseConfiguration, SessionFactory};

/// CLI wrapper for the log level to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LevelFilter {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LevelFilter::Error,
            CliLogLevel::Warn => LevelFilter::Warn,
            CliLogLevel::Info => LevelFilter::Info,
            CliLogLevel::Debug => LevelFilter::Debug,
            CliLogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConfigFormat {
    Properties,
    Xml,
    Json,
}

impl ConfigFormat {
    /// Pick the format from a file extension; anything unknown is a
    /// properties file
    fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("xml") => ConfigFormat::Xml,
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Properties,
        }
    }

    fn default_file_name(self) -> &'static str {
        match self {
            ConfigFormat::Properties => "database.properties",
            ConfigFormat::Xml => "database.xml",
            ConfigFormat::Json => "database.json",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the bootstrap default configuration to a file
    Init {
        /// Output format
        #[arg(short, long, value_enum, default_value = "properties")]
        format: ConfigFormat,

        /// Output file (defaults to database.<format> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Comment stored at the top of the file
        #[arg(short, long, default_value = "Database configuration")]
        comment: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Load a configuration file and print it (password masked)
    Show {
        /// Configuration file; the format follows the extension
        #[arg(short, long, env = "MODELSTORE_CONFIG")]
        config: PathBuf,
    },

    /// Open a session factory from a configuration file and run a round-trip
    Check {
        /// Configuration file; the format follows the extension
        #[arg(short, long, env = "MODELSTORE_CONFIG")]
        config: PathBuf,
    },

    /// Generate shell completions for modelstore
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// modelstore - database configuration and model store utility
#[derive(Parser, Debug)]
#[command(name = "modelstore")]
#[command(version)]
#[command(about = "Database configuration and model store utility")]
#[command(long_about = "modelstore writes, inspects and checks database configuration files.

EXAMPLES:
    modelstore init                                  # Write database.properties
    modelstore init -f xml -o conf/db.xml            # Write an XML property list
    modelstore show -c database.properties           # Print a configuration
    modelstore check -c store.json                   # Open the store and run a round-trip
    modelstore completions bash > modelstore.bash    # Generate bash completions

FORMATS:
    properties - key=value text (USERNAME, PASSWORD, HOSTNAME, PORT, SCHEMA, DIALECT, DRIVER_CLASS)
    xml        - XML property list with the same keys
    json       - snake_case fields (username, ..., driver_class)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Set logging level
    #[arg(short, long, value_enum, global = true, default_value = "info")]
    log_level: CliLogLevel,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and marker for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "❌"),
            Level::Warn => ("\x1B[1;33m", "🚧"),
            Level::Info => ("\x1B[1;32m", " "),
            Level::Debug => ("\x1B[1;36m", "🔍"),
            Level::Trace => ("\x1B[1;35m", "📋"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, marker) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, marker, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CommandLineOptions::parse();
    CustomLogger::init(cli.log_level.into())?;

    match cli.command {
        Commands::Init {
            format,
            output,
            comment,
            force,
        } => {
            let output = output.unwrap_or_else(|| PathBuf::from(format.default_file_name()));
            run_init(format, &output, &comment, force)
        }
        Commands::Show { config } => run_show(&config),
        Commands::Check { config } => run_check(&config).await,
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "modelstore", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn run_init(format: ConfigFormat, output: &Path, comment: &str, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "Refusing to overwrite existing file: {} (use --force)",
            output.display()
        );
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create directory: {}", parent.display()))?;
    }

    match format {
        ConfigFormat::Properties => {
            DatabaseConfiguration::store_default_to_properties(output, comment)
                .context(format!("Failed to write properties file: {}", output.display()))?;
        }
        ConfigFormat::Xml => {
            DatabaseConfiguration::store_default_to_xml(output, comment)
                .context(format!("Failed to write XML file: {}", output.display()))?;
        }
        ConfigFormat::Json => {
            let file = File::create(output)
                .context(format!("Failed to create JSON file: {}", output.display()))?;
            let mut writer = BufWriter::new(file);
            DatabaseConfiguration::bootstrap_default()
                .write_json(&mut writer)
                .context(format!("Failed to write JSON file: {}", output.display()))?;
            writer.flush().context("Failed to flush JSON file")?;
        }
    }

    info!("Default configuration written to {}", output.display());
    Ok(())
}

fn load_configuration(path: &Path) -> Result<DatabaseConfiguration> {
    let format = ConfigFormat::from_path(path);
    debug!("Loading {:?} configuration from {}", format, path.display());

    let configuration = match format {
        ConfigFormat::Properties => DatabaseConfiguration::from_properties_file(path),
        ConfigFormat::Xml => DatabaseConfiguration::from_xml_file(path),
        ConfigFormat::Json => DatabaseConfiguration::from_json_file(path),
    };

    configuration.context(format!("Failed to load config file: {}", path.display()))
}

fn run_show(path: &Path) -> Result<()> {
    let configuration = load_configuration(path)?;

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", configuration).context("Failed to write to stdout")?;
    writeln!(stdout, "url: {}", configuration.connection_url()).context("Failed to write to stdout")?;
    Ok(())
}

async fn run_check(path: &Path) -> Result<()> {
    let configuration = load_configuration(path)?;

    let factory = SessionFactory::builder(&configuration)
        .build()
        .context(format!("Failed to open store for {}", configuration.connection_url()))?;

    let probe = factory.clone();
    let answer = tokio::task::spawn_blocking(move || {
        let session = probe.open_session();
        let answer: rusqlite::Result<i64> =
            session.connection().query_row("SELECT 1", [], |row| row.get(0));
        answer
    })
    .await
    .context("Store check task panicked")?
    .context("Round-trip query failed")?;

    if answer != 1 {
        bail!("Unexpected round-trip answer: {}", answer);
    }

    info!("Store at {} is reachable ({})", factory.url(), factory.stats());
    Ok(())
}
