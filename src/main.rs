// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, error, info};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use xlate::app_config::{Config, LogLevel};
use xlate::app_controller::Controller;
use xlate::file_utils::{FileManager, encode_document};
use xlate::translation::po::{read_po, write_po};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the translatable units of documents into a PO catalog
    Extract(ExtractArgs),

    /// Translate documents with a PO catalog
    Translate(TranslateArgs),

    /// Generate shell completions for xlate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Input documents or directories
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// SRX document replacing the built-in segmentation rules
    #[arg(long, value_name = "FILE")]
    srx: Option<PathBuf>,

    /// Catalog file to write (standard output when omitted)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Language tag of the documents (e.g., 'en', 'fr-CA')
    #[arg(long)]
    language: Option<String>,
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Input documents or directories
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// PO catalog holding the translations
    #[arg(long, value_name = "FILE")]
    catalog: PathBuf,

    /// SRX document replacing the built-in segmentation rules
    #[arg(long, value_name = "FILE")]
    srx: Option<PathBuf>,

    /// Output file for one document, output directory for several
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Language tag of the source documents
    #[arg(long)]
    language: Option<String>,
}

/// xlate - XML translation pipeline
///
/// Splits XML and XHTML documents into sentence-level units, collects them
/// into gettext catalogs and applies translated catalogs back onto the
/// documents, keeping markup, inline tags and whitespace intact.
#[derive(Parser, Debug)]
#[command(name = "xlate")]
#[command(version)]
#[command(about = "Extract and translate the text of XML documents")]
#[command(long_about = "xlate extracts translatable units from XML documents and applies translations back.

EXAMPLES:
    xlate extract -o site.pot site/               # Collect units of every page
    xlate extract --language fr page.html         # Use the French segmentation rules
    xlate translate --catalog es.po page.html     # Print the translated page
    xlate translate --catalog es.po -o out/ site/ # Translate a whole directory
    xlate completions bash > xlate.bash           # Generate bash completions

CONFIGURATION:
    Configuration is read from conf.json by default. You can specify a different
    config file with --config-path. A missing file means default settings.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
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

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
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
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Trace lets every record through; the max level filters
    if let Err(e) = CustomLogger::init(LevelFilter::Trace) {
        eprintln!("Failed to install logger: {}", e);
    }
    log::set_max_level(LevelFilter::Info);

    // Usage errors exit with 2, help and version with 0
    let cli = match CommandLineOptions::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Run a subcommand; `Ok(false)` when some input failed
async fn run(cli: CommandLineOptions) -> Result<bool> {
    // If log level is set via command line, apply it immediately
    if let Some(log_level) = &cli.log_level {
        log::set_max_level(LogLevel::from(log_level.clone()).to_level_filter());
    }

    let mut config = Config::load_or_default(&cli.config_path)?;
    match &cli.log_level {
        Some(log_level) => config.log_level = log_level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }
    debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "xlate", &mut std::io::stdout());
            Ok(true)
        }
        Commands::Extract(args) => {
            if let Some(language) = args.language {
                config.language = language;
            }
            if args.srx.is_some() {
                config.srx_file = args.srx;
            }
            run_extract(config, &args.inputs, args.output).await
        }
        Commands::Translate(args) => {
            if let Some(language) = args.language {
                config.language = language;
            }
            if args.srx.is_some() {
                config.srx_file = args.srx;
            }
            run_translate(config, &args.inputs, &args.catalog, args.output).await
        }
    }
}

async fn run_extract(config: Config, inputs: &[PathBuf], output: Option<PathBuf>) -> Result<bool> {
    let controller = Controller::with_config(config)?;
    let report = controller.extract(inputs).await?;
    let catalog = write_po(&report.catalog, Some(&controller.config().language));

    match output {
        Some(path) => {
            FileManager::write_to_file(&path, &catalog)?;
            info!("Success: {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout();
            stdout
                .write_all(catalog.as_bytes())
                .context("Failed to write catalog to standard output")?;
        }
    }

    Ok(!report.has_failures())
}

async fn run_translate(
    config: Config,
    inputs: &[PathBuf],
    catalog_path: &Path,
    output: Option<PathBuf>,
) -> Result<bool> {
    if output.is_none() && (inputs.len() > 1 || inputs.iter().any(|input| input.is_dir())) {
        return Err(anyhow!("--output DIRECTORY is required when translating several documents"));
    }

    let controller = Controller::with_config(config)?;
    let source = FileManager::read_to_string(catalog_path)?;
    let catalog = read_po(&source)
        .with_context(|| format!("Failed to load catalog: {:?}", catalog_path))?;
    info!("Loaded {} catalog entries", catalog.len());

    let report = controller.translate(inputs, Arc::new(catalog)).await?;
    match output {
        Some(path) => {
            controller.write_documents(&report.documents, &path)?;
        }
        None => {
            let mut stdout = std::io::stdout();
            for document in &report.documents {
                stdout
                    .write_all(&encode_document(&document.content, document.encoding.as_deref()))
                    .context("Failed to write document to standard output")?;
            }
        }
    }

    Ok(!report.has_failures())
}
