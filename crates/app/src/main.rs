use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use quiz_core::deadline::remaining;
use quiz_core::model::{ClassId, TestId};
use services::{BackendConfig, Clock, HttpBackend, SessionBootstrapper, TestBackend};
use storage::repository::SessionCacheStore;
use storage::sqlite::SqliteCache;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingSetting { flag: &'static str, env: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingSetting { flag, env } => {
                write!(f, "{flag} (or {env}) must be set")
            }
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- status [--db <sqlite_url>] --api <url> --class-id <id> --test-id <id> --mail <addr>");
    eprintln!("  cargo run -p app -- reset  [--db <sqlite_url>] --test-id <id>");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_API_URL, QUIZ_CLASS_ID, QUIZ_TEST_ID, QUIZ_AUTHOR_MAIL");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    api_url: Option<String>,
    class_id: Option<ClassId>,
    test_id: Option<TestId>,
    author_mail: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut api_url = std::env::var("QUIZ_API_URL").ok().filter(|v| !v.trim().is_empty());
        let mut class_id = std::env::var("QUIZ_CLASS_ID").ok().map(ClassId::new);
        let mut test_id = std::env::var("QUIZ_TEST_ID").ok().map(TestId::new);
        let mut author_mail = std::env::var("QUIZ_AUTHOR_MAIL").ok();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--api" => {
                    api_url = Some(require_value(args, "--api")?);
                }
                "--class-id" => {
                    class_id = Some(ClassId::new(require_value(args, "--class-id")?));
                }
                "--test-id" => {
                    test_id = Some(TestId::new(require_value(args, "--test-id")?));
                }
                "--mail" => {
                    author_mail = Some(require_value(args, "--mail")?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            api_url,
            class_id,
            test_id,
            author_mail,
        })
    }

    fn test_id(&self) -> Result<TestId, ArgsError> {
        self.test_id.clone().ok_or(ArgsError::MissingSetting {
            flag: "--test-id",
            env: "QUIZ_TEST_ID",
        })
    }

    fn class_id(&self) -> Result<ClassId, ArgsError> {
        self.class_id.clone().ok_or(ArgsError::MissingSetting {
            flag: "--class-id",
            env: "QUIZ_CLASS_ID",
        })
    }

    fn author_mail(&self) -> Result<String, ArgsError> {
        self.author_mail.clone().ok_or(ArgsError::MissingSetting {
            flag: "--mail",
            env: "QUIZ_AUTHOR_MAIL",
        })
    }

    fn backend_config(&self) -> Result<BackendConfig, ArgsError> {
        match &self.api_url {
            Some(base_url) => Ok(BackendConfig {
                base_url: base_url.clone(),
            }),
            None => BackendConfig::from_env().ok_or(ArgsError::MissingSetting {
                flag: "--api",
                env: "QUIZ_API_URL",
            }),
        }
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

fn format_remaining(left: Duration) -> String {
    let seconds = left.num_seconds().max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: report status when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Status,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Status,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let cache = SqliteCache::connect(&parsed.db_url).await?;
    cache.migrate().await?;
    let cache: Arc<dyn SessionCacheStore> = Arc::new(cache);

    match cmd {
        Command::Status => {
            let clock = Clock::default_clock();
            let backend = HttpBackend::new(parsed.backend_config()?)?;
            let backend: Arc<dyn TestBackend> = Arc::new(backend);
            let boot = SessionBootstrapper::new(Arc::clone(&cache), backend, clock);

            let class_id = parsed.class_id()?;
            let test_id = parsed.test_id()?;
            let mail = parsed.author_mail()?;
            let resolved = boot.resolve(&class_id, &mail, &test_id).await?;

            let session = &resolved.session;
            println!("test:      {}", session.info().title);
            println!(
                "questions: {} answered of {}",
                session.answered_count(),
                session.total_questions()
            );
            if session.is_done() {
                match session.score() {
                    Some(score) => println!("state:     done (score {score})"),
                    None => println!("state:     done"),
                }
            } else {
                println!("state:     in progress");
                if let Some(deadline) = resolved.deadline {
                    let left = remaining(deadline, clock.now());
                    println!("remaining: {}", format_remaining(left));
                }
            }
            Ok(())
        }
        Command::Reset => {
            let test_id = parsed.test_id()?;
            cache.clear(&test_id).await?;
            println!("cleared cached session for test {test_id}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
