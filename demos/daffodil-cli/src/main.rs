use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use clap::{Parser as ClapParser, Subcommand};
use daffodil::SyntaxError;
use daffodil::prelude::{Daffodil, PrettyOptions, Value};
use log::{LevelFilter, Metadata, debug};
use serde::Deserialize;
use thiserror::Error;

#[derive(ClapParser)]
#[command(about = "Format, check and apply Daffodil filters")]
pub struct Arguments {
    /// Optional TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log what the library does to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the canonical form of a filter
    Fmt {
        input: PathBuf,
        /// One condition per line instead of a single dense line
        #[arg(long)]
        indent: bool,
    },
    /// Print the JSON records (one per line) that satisfy a filter
    Filter {
        input: PathBuf,
        /// JSON-lines file, stdin when omitted
        records: Option<PathBuf>,
    },
    /// Validate a filter and build its predicate
    Check { input: PathBuf },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Config {
    pretty: PrettyOptions,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration in {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("record on line {line} is not a JSON object of scalars and lists: {source}")]
    Record {
        line: usize,
        source: serde_json::Error,
    },

    #[error("record on line {line}: {source}")]
    Evaluate {
        line: usize,
        source: daffodil::Error,
    },

    #[error("{}: {source}", .path.display())]
    Filter {
        path: PathBuf,
        source_text: String,
        source: daffodil::Error,
    },
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn load_config(path: Option<&Path>) -> Result<Config, CliError> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    toml::from_str(&read(path)?).map_err(|source| CliError::Config {
        path: path.to_path_buf(),
        source,
    })
}

fn load_filter(path: &Path) -> Result<Daffodil, CliError> {
    let source_text = read(path)?;
    Daffodil::new(source_text.as_str()).map_err(|source| CliError::Filter {
        path: path.to_path_buf(),
        source_text,
        source,
    })
}

fn filter_error(path: &Path, filter: &Daffodil, source: daffodil::Error) -> CliError {
    CliError::Filter {
        path: path.to_path_buf(),
        source_text: filter.source().to_string(),
        source,
    }
}

fn run_filter(
    path: &Path,
    filter: &Daffodil,
    records: Box<dyn BufRead>,
) -> Result<usize, CliError> {
    let predicate = filter
        .predicate()
        .map_err(|e| filter_error(path, filter, e))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut kept = 0;

    for (index, line) in records.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: BTreeMap<String, Value> =
            serde_json::from_str(&line).map_err(|source| CliError::Record {
                line: index + 1,
                source,
            })?;
        let keep = predicate
            .test(&record)
            .map_err(|source| CliError::Evaluate {
                line: index + 1,
                source,
            })?;
        if keep {
            writeln!(out, "{line}")?;
            kept += 1;
        }
    }
    Ok(kept)
}

fn run(args: Arguments) -> Result<(), CliError> {
    let config = load_config(args.config.as_deref())?;
    debug!("configuration: {config:?}");

    match args.command {
        Command::Fmt { input, indent } => {
            let filter = load_filter(&input)?;
            let options = if indent {
                PrettyOptions::INDENTED
            } else {
                config.pretty
            };
            let doc = filter
                .pretty_doc(options)
                .map_err(|e| filter_error(&input, &filter, e))?;
            doc.print()?;
            println!();
        }
        Command::Filter { input, records } => {
            let filter = load_filter(&input)?;
            let reader: Box<dyn BufRead> = match &records {
                Some(path) => Box::new(BufReader::new(std::fs::File::open(path).map_err(
                    |source| CliError::Read {
                        path: path.clone(),
                        source,
                    },
                )?)),
                None => Box::new(BufReader::new(io::stdin())),
            };
            let kept = run_filter(&input, &filter, reader)?;
            debug!("{kept} record(s) matched");
        }
        Command::Check { input } => {
            let filter = load_filter(&input)?;
            filter
                .predicate()
                .map_err(|e| filter_error(&input, &filter, e))?;
            println!(
                "{}: ok ({} node(s))",
                input.display(),
                filter.ast().node_count()
            );
        }
    }
    Ok(())
}

fn report(path: &Path, source_text: &str, errors: &[SyntaxError]) {
    let file = path.display().to_string();
    let mut colors = ColorGenerator::new();
    let color = colors.next();

    for error in errors {
        let span = (file.clone(), error.span.clone());
        let mut builder = Report::build(ReportKind::Error, span.clone())
            .with_config(ariadne::Config::default().with_index_type(ariadne::IndexType::Byte))
            .with_message(&error.message)
            .with_label(
                Label::new(span)
                    .with_message(match error.found {
                        Some(c) => format!("unexpected {c:?}"),
                        None => "unexpected end of input".to_string(),
                    })
                    .with_color(color),
            );
        if !error.expected.is_empty() {
            builder = builder.with_note(format!("expected {}", error.expected.join(", ")));
        }
        if let Err(e) = builder
            .finish()
            .eprint((file.clone(), Source::from(source_text)))
        {
            eprintln!("Error: {e}");
        }
    }
}

fn main() {
    let args = Arguments::parse();

    if args.verbose
        && log::set_logger(&LOGGER)
            .map(|()| log::set_max_level(LevelFilter::Debug))
            .is_err()
    {
        eprintln!("Warning: a logger was already installed");
    }

    if let Err(error) = run(args) {
        match &error {
            CliError::Filter {
                path,
                source_text,
                source: daffodil::Error::Syntax { errors },
            } => report(path, source_text, errors),
            _ => eprintln!("Error: {error}"),
        }
        std::process::exit(1);
    }
}
