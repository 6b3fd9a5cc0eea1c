#![warn(clippy::pedantic)]

mod config;

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use chrono::Local;
use clap::{ArgAction, Parser};
use color_eyre::eyre::WrapErr;
use config::{Config, Settings};
use cross_table::{
    TABLE_SIZE,
    csv::{Dataset, Delimiter},
    emit::{HeaderInfo, OutputFormat, render},
    rows::{IngestStats, Ingestor},
    start, success, working,
};
use env_logger::TimestampPrecision;
use log::{LevelFilter, info, warn};

/// Generates a direct-index cross solution table from a CSV dataset
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Input CSV with GRBO position columns and a solution column
    csv: PathBuf,

    /// Where to write the generated source
    #[arg(short, long)]
    output: PathBuf,

    /// Reverse and invert each move sequence (use if the CSV stores
    /// solved->scrambled)
    #[arg(long)]
    invert: bool,

    /// Force the CSV delimiter (',', ';', '\t', '|'). Detected if omitted.
    #[arg(long)]
    delimiter: Option<Delimiter>,

    /// Language of the generated source. Guessed from the output extension
    /// if omitted.
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Configuration file, in TOML format. Defaults to `cross_table.toml`
    /// if present.
    #[arg(long, short = 'c', value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (can be repeated)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    log_level: u8,
}

fn main() -> color_eyre::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(match cli.log_level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        })
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let settings = config.resolve(cli.invert, cli.delimiter, cli.format, &cli.output)?;

    let summary = generate(&cli.csv, &cli.output, &settings)?;
    println!("{summary}");

    Ok(())
}

/// What a successful run reports.
#[derive(Debug)]
struct Summary {
    output: PathBuf,
    unique_entries: usize,
    blob_size: usize,
    stats: IngestStats,
    delimiter: Delimiter,
    delimiter_forced: bool,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Generated {}", self.output.display())?;
        writeln!(
            f,
            "  rows          : {} read, {} accepted, {} skipped, {} blank",
            self.stats.rows, self.stats.accepted, self.stats.skipped, self.stats.blank
        )?;
        writeln!(
            f,
            "  replaced      : {} (shorter solution found later)",
            self.stats.replaced
        )?;
        writeln!(
            f,
            "  count notes   : {} declared move counts differ",
            self.stats.move_count_mismatches
        )?;
        writeln!(f, "  unique entries: {}", self.unique_entries)?;
        writeln!(f, "  blob size     : {} bytes", self.blob_size)?;
        writeln!(
            f,
            "  table size    : {TABLE_SIZE} ints (~{} KiB)",
            TABLE_SIZE * size_of::<i32>() / 1024
        )?;
        writeln!(
            f,
            "  max CSV pos   : {} (should be <= 24)",
            self.stats.max_position
        )?;
        write!(
            f,
            "  delimiter     : {} ({})",
            self.delimiter,
            if self.delimiter_forced {
                "forced"
            } else {
                "auto"
            }
        )
    }
}

fn generate(csv: &Path, output: &Path, settings: &Settings) -> color_eyre::Result<Summary> {
    info!(start!("Reading {}"), csv.display());
    let text = fs::read_to_string(csv)
        .wrap_err_with(|| format!("Failed to read {}", csv.display()))?;
    let dataset = Dataset::parse(&text, settings.delimiter)?;
    if dataset.is_empty() {
        warn!("{} has a header but no data rows", csv.display());
    }
    info!(
        working!("Ingesting {} records ({})"),
        dataset.len(),
        settings.direction
    );

    let mut ingestor = Ingestor::new(settings.direction);
    for row in dataset.rows() {
        // Rejected rows are logged and counted by the ingestor
        let _ = ingestor.push(&row);
    }
    let (table, stats) = ingestor.finish()?;
    table.verify()?;

    let info = HeaderInfo {
        source: fs::canonicalize(csv)?,
        generated: Local::now().naive_local(),
        direction: settings.direction,
    };
    let source = render(&table, &info, settings.format).to_string();
    write_replacing(output, source.as_bytes())
        .wrap_err_with(|| format!("Failed to write {}", output.display()))?;
    info!(success!("Wrote {} as {}"), output.display(), settings.format);

    Ok(Summary {
        output: output.to_owned(),
        unique_entries: table.len(),
        blob_size: table.blob().len(),
        stats,
        delimiter: dataset.delimiter(),
        delimiter_forced: settings.delimiter.is_some(),
    })
}

/// Writes to a sibling file and renames it over `path`, so readers never see
/// a partial file.
fn write_replacing(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp = PathBuf::from(temp);

    fs::write(&temp, contents)?;
    fs::rename(&temp, path).inspect_err(|_| {
        let _ = fs::remove_file(&temp);
    })
}
