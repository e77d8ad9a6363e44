//! Thrax CLI - Command-line interface
//!
//! Usage:
//!   thrax extract [--config <file>] [--input <file>] [--set key=value]... [--format text|json]
//!   thrax config [--config <file>] [--set key=value]...

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use thrax_core::{AppConfig, LoggingConfig, Vocabulary};
use thrax_extractor::HierarchicalRuleExtractor;

#[derive(Parser)]
#[command(name = "thrax")]
#[command(about = "Hierarchical SCFG rule extraction from aligned parallel text")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract rules from `source ||| target ||| alignment` records
    Extract {
        #[command(flatten)]
        options: ConfigArgs,

        /// Input file (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the effective configuration as TOML
    Config {
        #[command(flatten)]
        options: ConfigArgs,
    },
}

#[derive(clap::Args)]
struct ConfigArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override an option, e.g. `--set arity=1`
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// `[LHS] ||| source ||| target`, one rule per line
    Text,
    /// One JSON object per line
    Json,
}

impl ConfigArgs {
    /// Defaults, then the config file, then the environment, then `--set`
    fn load(&self) -> anyhow::Result<AppConfig> {
        let config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };
        let mut config = config.with_env_override()?;
        for assignment in &self.overrides {
            config.apply_override(assignment)?;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.as_str().into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_file(logging.include_location)
        .with_line_number(logging.include_location);

    if logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            options,
            input,
            format,
        } => {
            let config = options.load()?;
            init_tracing(&config.logging);
            extract(&config, input, format)
        }
        Commands::Config { options } => {
            let config = options.load()?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn extract(config: &AppConfig, input: Option<PathBuf>, format: OutputFormat) -> anyhow::Result<()> {
    let vocab = Arc::new(Vocabulary::new());
    // no parse-to-lattice builder ships with the CLI, so samt is rejected here
    let mut extractor = HierarchicalRuleExtractor::from_config(config, Arc::clone(&vocab), None)
        .context("Failed to configure extractor")?;

    let reader: Box<dyn BufRead> = match &input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin().lock())),
    };

    info!("Extracting with {} labeling", extractor.labeler().kind());

    // reading stops at the first I/O error, which is reported after extraction
    let mut read_error: Option<io::Error> = None;
    let lines = reader.lines().map_while(|line| match line {
        Ok(line) => Some(line),
        Err(e) => {
            read_error = Some(e);
            None
        }
    });

    let mut out = BufWriter::new(io::stdout().lock());
    let stats = extractor
        .extract_lines(lines, |rule| match format {
            OutputFormat::Text => writeln!(out, "{}", rule.display(&vocab)),
            OutputFormat::Json => serde_json::to_string(&rule.to_record(&vocab))
                .map_err(io::Error::from)
                .and_then(|json| writeln!(out, "{}", json)),
        })
        .context("Failed to write rules")?;
    if let Some(e) = read_error {
        return Err(e).context("Failed to read input");
    }
    out.flush().context("Failed to write rules")?;

    info!(
        records = stats.records,
        extracted = stats.extracted,
        skipped = stats.skipped(),
        rules = stats.rules,
        "Extraction complete"
    );
    if stats.skipped() > 0 {
        eprint!("{}", stats.report());
    }
    Ok(())
}
