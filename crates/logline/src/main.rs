use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use clap::Parser as ClapParser;
use logline::runtime::{boot, run};
use logline::LogFormat;

/// Normalize JSON, logfmt, or free-text logs into JSON lines.
#[derive(Debug, ClapParser)]
#[command(name = "logline", version, about)]
struct Cli {
    /// Input format; `auto` detects it from the first lines
    #[arg(long, value_parser = parse_format)]
    format: Option<LogFormat>,

    /// Config file (defaults to $LOGLINE_CONFIG_FILE, then /etc/logline/logline.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pretty-print records
    #[arg(long)]
    pretty: bool,

    /// Log parsing metrics when done
    #[arg(long)]
    stats: bool,

    /// Input file; stdin when omitted
    file: Option<PathBuf>,
}

fn parse_format(raw: &str) -> Result<LogFormat, String> {
    raw.parse().map_err(|e: logline::parser::model::UnknownFormat| e.to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    boot::init_logging();

    let mut config = boot::load_config(cli.config.as_deref())?;
    if let Some(format) = cli.format {
        config.format = format;
    }
    config.pretty |= cli.pretty;
    config.stats |= cli.stats;

    let stdout = io::stdout().lock();
    match &cli.file {
        Some(path) => run::run(&config, BufReader::new(File::open(path)?), stdout)?,
        None => run::run(&config, io::stdin().lock(), stdout)?,
    };

    Ok(())
}
