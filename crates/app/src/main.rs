mod command;
mod logging;
mod repl;

use std::fmt;
use std::io::Write;

use chrono::{Local, Offset};
use quiz_core::model::QuizCatalog;
use services::{Clock, QuizServices};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::command::Command;
use crate::repl::{Flow, Repl};

const SAMPLE_CATALOG: &str = include_str!("../assets/sample_catalog.json");

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidCatalogPath { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCatalogPath { raw } => write!(f, "invalid --catalog value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    db_url: String,
    catalog: Option<String>,
    open: Option<String>,
    show_help: bool,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  quiz [--db <sqlite_url>] [--catalog <path.json>] [--open <section_id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://quiz.sqlite3");
    eprintln!("  --catalog <bundled sample>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_CATALOG, RUST_LOG");
}

impl Args {
    fn parse(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = env("QUIZ_DB_URL")
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut catalog = env("QUIZ_CATALOG").filter(|v| !v.trim().is_empty());
        let mut open = None;
        let mut show_help = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog" => {
                    let value = require_value(&mut args, "--catalog")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidCatalogPath { raw: value });
                    }
                    catalog = Some(value);
                }
                "--open" => open = Some(require_value(&mut args, "--open")?),
                "--help" | "-h" => show_help = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            catalog,
            open,
            show_help,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn load_catalog(path: Option<&str>) -> Result<QuizCatalog, Box<dyn std::error::Error>> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => SAMPLE_CATALOG.to_string(),
    };
    Ok(QuizCatalog::from_json_str(&raw)?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1), |key| std::env::var(key).ok()).map_err(
        |e| {
            eprintln!("{e}");
            print_usage();
            e
        },
    )?;
    if args.show_help {
        print_usage();
        return Ok(());
    }

    logging::init_logging(logging::DEFAULT_LEVEL);

    let catalog = load_catalog(args.catalog.as_deref())?;
    prepare_sqlite_file(&args.db_url)?;
    let services = QuizServices::new_sqlite(&args.db_url, Clock::default_clock(), catalog).await?;
    tracing::debug!(db = %args.db_url, "quiz services ready");

    let repl = Repl::new(services, Local::now().offset().fix());
    let mut stdout = std::io::stdout();
    repl.start(args.open.as_deref().unwrap_or(""), &mut stdout)
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                writeln!(stdout, "{err}")?;
                continue;
            }
        };
        if repl.execute(command, &mut stdout).await? == Flow::Quit {
            break;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_to_local_database_and_bundled_catalog() {
        let parsed = Args::parse(args(&[]), no_env).unwrap();
        assert_eq!(parsed.db_url, "sqlite://quiz.sqlite3");
        assert_eq!(parsed.catalog, None);
        assert!(!parsed.show_help);
    }

    #[test]
    fn flags_override_environment() {
        let env = |key: &str| match key {
            "QUIZ_DB_URL" => Some("sqlite://from-env.sqlite3".to_string()),
            "QUIZ_CATALOG" => Some("env.json".to_string()),
            _ => None,
        };
        let from_env = Args::parse(args(&[]), env).unwrap();
        assert_eq!(from_env.db_url, "sqlite://from-env.sqlite3");
        assert_eq!(from_env.catalog.as_deref(), Some("env.json"));

        let parsed = Args::parse(
            args(&["--db", "sqlite::memory:", "--catalog", "mine.json", "--open", "music"]),
            env,
        )
        .unwrap();
        assert_eq!(parsed.db_url, "sqlite::memory:");
        assert_eq!(parsed.catalog.as_deref(), Some("mine.json"));
        assert_eq!(parsed.open.as_deref(), Some("music"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(
            Args::parse(args(&["--db"]), no_env),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(
            Args::parse(args(&["--db", " "]), no_env),
            Err(ArgsError::InvalidDbUrl { .. })
        ));
        assert!(matches!(
            Args::parse(args(&["--verbose"]), no_env),
            Err(ArgsError::UnknownArg(arg)) if arg == "--verbose"
        ));
    }

    #[test]
    fn relative_paths_become_absolute_urls() {
        let url = normalize_sqlite_url("sqlite:data/quiz.sqlite3".to_string());
        assert!(url.starts_with("sqlite:///"), "{url}");
        assert!(url.ends_with("data/quiz.sqlite3"), "{url}");
    }

    #[test]
    fn bundled_catalog_is_valid() {
        let catalog = load_catalog(None).unwrap();
        assert_eq!(catalog.sections().len(), 3);
        assert_eq!(catalog.section("chemistry").unwrap().title(), "Chemistry");
    }
}
