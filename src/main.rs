use clap::{Parser, Subcommand};
use quire::cache::{self, CacheHandle};
use quire::config;
use quire::entries::{Entries, EntryFields};
use quire::media::{MediaStore, UploadOutcome, UploadedFile};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Flat-file content maintenance: media, entries, cache")]
#[command(long_about = "\
Flat-file content maintenance: media, entries, cache

Project structure:

  project/
  ├── settings.toml                    # Optional, overrides stock defaults
  ├── entries/blog/hello/entry.toml    # Entry 'blog/hello'
  ├── uploads/blog/cover.jpg           # Media 'blog/cover.jpg'
  ├── uploads/.meta/blog/cover.jpg.toml  # Its metadata sidecar
  └── cache/                           # File cache driver storage

Every command prints JSON on stdout. Logs go to stderr; set RUST_LOG to
change verbosity (default: quire=info).

Run 'quire gen-config' to print a documented settings.toml.")]
#[command(version)]
struct Cli {
    /// Project root
    #[arg(long, default_value = ".", global = true)]
    project: PathBuf,

    /// Origin used for full_url when settings.toml has no `url`
    #[arg(long, default_value = "http://localhost", global = true)]
    origin: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upload and manage media files
    #[command(subcommand)]
    Media(MediaCommand),
    /// Read and write entries
    #[command(subcommand)]
    Entry(EntryCommand),
    /// Inspect the configured cache
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Print a stock settings.toml with all options documented
    GenConfig,
}

#[derive(Subcommand)]
enum MediaCommand {
    /// Push a local file through the upload pipeline
    Upload {
        file: PathBuf,
        /// Target folder under uploads/
        #[arg(long, default_value = "")]
        folder: String,
        /// Client file name (defaults to the local file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show one file's metadata, or every file in a folder
    Fetch {
        #[arg(default_value = "")]
        id: String,
    },
    Move { id: String, new_id: String },
    Copy { id: String, new_id: String },
    Delete { id: String },
    Has { id: String },
}

#[derive(Subcommand)]
enum EntryCommand {
    Fetch {
        id: String,
    },
    /// Create an entry from key=value fields (values parsed as TOML, else text)
    Create {
        id: String,
        #[arg(long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,
    },
    Has {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    Get {
        key: String,
    },
    /// Store a JSON value
    Set {
        key: String,
        value: String,
        /// Seconds until the entry expires
        #[arg(long)]
        ttl: Option<u64>,
    },
    Delete {
        key: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quire=info")),
        )
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_settings_toml());
            return Ok(());
        }
        Command::Media(command) => {
            let settings = config::load_settings(&cli.project)?;
            run_media(command, &cli.project, &cli.origin, &settings)?
        }
        Command::Entry(command) => {
            let settings = config::load_settings(&cli.project)?;
            run_entry(command, &cli.project, &settings)?
        }
        Command::Cache(command) => {
            let settings = config::load_settings(&cli.project)?;
            let handle = cache::adapter_for(&settings.cache, &cli.project)?.driver()?;
            run_cache(command, handle.as_ref())?
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_media(
    command: MediaCommand,
    project: &Path,
    origin: &str,
    settings: &config::Settings,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let store = MediaStore::open(project, settings);
    Ok(match command {
        MediaCommand::Upload { file, folder, name } => {
            let name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or("upload path has no file name")?,
            };
            let tmp_name = store.spool().stage(&file)?;
            let size = std::fs::metadata(&tmp_name)?.len();
            let upload = UploadedFile::new(name, &tmp_name, size);
            let outcome = store.upload(&upload, &folder);
            if tmp_name.exists() {
                let _ = std::fs::remove_file(&tmp_name);
            }
            match outcome? {
                UploadOutcome::Stored(path) => json!({ "stored": path }),
                UploadOutcome::Rejected(rejection) => json!({
                    "rejected": rejection,
                    "message": rejection.to_string(),
                }),
            }
        }
        MediaCommand::Fetch { id } => serde_json::to_value(store.fetch(&id, origin)?)?,
        MediaCommand::Move { id, new_id } => json!({ "ok": store.move_file(&id, &new_id) }),
        MediaCommand::Copy { id, new_id } => json!({ "ok": store.copy_file(&id, &new_id) }),
        MediaCommand::Delete { id } => json!({ "ok": store.delete(&id) }),
        MediaCommand::Has { id } => json!({ "has": store.has(&id) }),
    })
}

fn run_entry(
    command: EntryCommand,
    project: &Path,
    settings: &config::Settings,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let entries = Entries::open(project, settings);
    Ok(match command {
        EntryCommand::Fetch { id } => serde_json::to_value(entries.fetch(&id)?)?,
        EntryCommand::Create { id, fields } => {
            let fields = parse_fields(&fields)?;
            json!({ "created": entries.create(&id, fields)? })
        }
        EntryCommand::Has { id } => json!({ "has": entries.has(&id) }),
        EntryCommand::Delete { id } => json!({ "ok": entries.delete(&id) }),
    })
}

fn run_cache(
    command: CacheCommand,
    handle: &dyn CacheHandle,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    Ok(match command {
        CacheCommand::Get { key } => json!({ "value": handle.get(&key)? }),
        CacheCommand::Set { key, value, ttl } => {
            let value: serde_json::Value = serde_json::from_str(&value)?;
            handle.set(&key, value, ttl.map(Duration::from_secs))?;
            json!({ "ok": true })
        }
        CacheCommand::Delete { key } => json!({ "ok": handle.delete(&key)? }),
    })
}

/// Build entry fields from `key=value` pairs.
///
/// Values that parse as a TOML value (`3`, `true`, `[1, 2]`) keep that type;
/// anything else is stored as a string.
fn parse_fields(pairs: &[String]) -> Result<EntryFields, Box<dyn std::error::Error>> {
    let mut document = toml::Table::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| format!("field '{pair}' is not KEY=VALUE"))?;
        let value = toml::from_str::<toml::Table>(&format!("v = {raw}"))
            .ok()
            .and_then(|mut t| t.remove("v"))
            .unwrap_or_else(|| toml::Value::String(raw.to_string()));
        document.insert(key.trim().to_string(), value);
    }
    Ok(toml::Value::Table(document).try_into()?)
}
