//! Entries: content records stored as one TOML file per directory.
//!
//! An entry with id `blog/hello` lives at `entries/blog/hello/entry.toml`.
//! Fetch and create publish on an [`EventBus<EntryContext>`] so field
//! handlers (see [`fields`]) can fill in or normalize values before the
//! caller sees them or before they are written.

pub mod fields;

use crate::codec::{self, CodecError, MetaMap};
use crate::config::Settings;
use crate::events::EventBus;
use crate::locator::{Locator, is_valid_id, normalize_id};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use fields::{TimestampField, parse_timestamp, register_fields};

/// Entries root, relative to the project root.
pub const ENTRIES_DIR: &str = "entries";
/// Content file inside each entry directory.
pub const ENTRY_FILE: &str = "entry.toml";

/// Published after an entry has been read, before it is returned.
pub const ENTRY_FETCH_HAS_RESULT: &str = "entries.fetch.single.has_result";
/// Published before a new entry is written.
pub const ENTRY_CREATE: &str = "entries.create";

#[derive(Error, Debug)]
pub enum EntryError {
    #[error("invalid entry id '{0}'")]
    InvalidId(String),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// A date field as stored: epoch seconds, or text still to be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    Epoch(i64),
    Text(String),
}

impl Timestamp {
    pub fn as_epoch(&self) -> Option<i64> {
        match self {
            Timestamp::Epoch(secs) => Some(*secs),
            Timestamp::Text(_) => None,
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Native TOML dates arrive as Datetime; keep their text form.
        match toml::Value::deserialize(deserializer)? {
            toml::Value::Integer(secs) => Ok(Timestamp::Epoch(secs)),
            toml::Value::String(text) => Ok(Timestamp::Text(text)),
            toml::Value::Datetime(dt) => Ok(Timestamp::Text(dt.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "expected a date or epoch seconds, found {}",
                other.type_str()
            ))),
        }
    }
}

/// Fields of one entry: the handled timestamps plus everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: MetaMap,
}

/// What field handlers see: the entry being processed and where it lives.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryContext {
    pub id: String,
    /// Path of the entry's content file.
    pub location: PathBuf,
    pub fields: EntryFields,
}

/// A fetched entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: String,
    #[serde(flatten)]
    pub fields: EntryFields,
}

pub struct Entries {
    locator: Locator,
    bus: EventBus<EntryContext>,
}

impl Entries {
    /// Entries under `<project>/entries` with the configured field handlers.
    pub fn open(project_root: &Path, settings: &Settings) -> Self {
        let mut bus = EventBus::new();
        register_fields(&mut bus, settings);
        Self::new(
            Locator::with_content_file(project_root.join(ENTRIES_DIR), ENTRY_FILE),
            bus,
        )
    }

    pub fn new(locator: Locator, bus: EventBus<EntryContext>) -> Self {
        Self { locator, bus }
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Read an entry and run the after-fetch handlers over it.
    pub fn fetch(&self, id: &str) -> Result<Option<Entry>, EntryError> {
        let id = normalize_id(id);
        if !is_valid_id(id) {
            return Ok(None);
        }
        let location = self.locator.location(id);
        if !location.is_file() {
            return Ok(None);
        }
        let fields: EntryFields = codec::read_document(&location)?;
        let ctx = self.bus.publish(
            ENTRY_FETCH_HAS_RESULT,
            EntryContext {
                id: id.to_string(),
                location,
                fields,
            },
        );
        Ok(Some(Entry {
            id: ctx.id,
            fields: ctx.fields,
        }))
    }

    /// Write a new entry after the before-create handlers have run.
    ///
    /// Returns `Ok(false)` when the entry already exists.
    pub fn create(&self, id: &str, fields: EntryFields) -> Result<bool, EntryError> {
        let id = normalize_id(id);
        if !is_valid_id(id) {
            return Err(EntryError::InvalidId(id.to_string()));
        }
        let location = self.locator.location(id);
        if location.exists() {
            tracing::debug!(%id, "entry already exists");
            return Ok(false);
        }
        let dir = self.locator.dir_location(id);
        std::fs::create_dir_all(&dir).map_err(|source| EntryError::Io { path: dir, source })?;

        let ctx = self.bus.publish(
            ENTRY_CREATE,
            EntryContext {
                id: id.to_string(),
                location,
                fields,
            },
        );
        codec::write_document(&ctx.location, &ctx.fields)?;
        tracing::info!(%id, "created entry");
        Ok(true)
    }

    pub fn has(&self, id: &str) -> bool {
        is_valid_id(id) && self.locator.location(id).is_file()
    }

    /// Remove the entry directory, nested entries included.
    pub fn delete(&self, id: &str) -> bool {
        if !self.has(id) {
            return false;
        }
        let dir = self.locator.dir_location(id);
        if let Err(e) = std::fs::remove_dir_all(&dir) {
            tracing::warn!(%id, error = %e, "entry delete failed");
            return false;
        }
        let meta_dir = self.locator.dir_meta_location(id);
        if meta_dir.is_dir()
            && let Err(e) = std::fs::remove_dir_all(&meta_dir)
        {
            tracing::warn!(%id, error = %e, "entry metadata delete failed");
        }
        tracing::info!(%id, "deleted entry");
        true
    }
}
