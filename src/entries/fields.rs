//! Timestamp field handlers.
//!
//! `created_at` and `published_at` each get two subscriptions:
//!
//! - on [`ENTRY_FETCH_HAS_RESULT`]: an absent value becomes the entry file's
//!   modification time; a textual date is parsed to epoch seconds (falling
//!   back to the modification time when it does not parse).
//! - on [`ENTRY_CREATE`]: an absent value becomes "now", formatted with the
//!   configured `date_format`.
//!
//! Both handlers leave a value alone once it is an integer, so running them
//! any number of times gives the same result.

use super::{ENTRY_CREATE, ENTRY_FETCH_HAS_RESULT, EntryContext, EntryFields, Timestamp};
use crate::config::Settings;
use crate::events::EventBus;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt::Write;
use std::path::Path;
use std::time::UNIX_EPOCH;

/// Date-only and date-time layouts tried after the configured format.
const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];
const FALLBACK_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampField {
    CreatedAt,
    PublishedAt,
}

impl TimestampField {
    pub fn name(self) -> &'static str {
        match self {
            TimestampField::CreatedAt => "created_at",
            TimestampField::PublishedAt => "published_at",
        }
    }

    fn slot(self, fields: &mut EntryFields) -> &mut Option<Timestamp> {
        match self {
            TimestampField::CreatedAt => &mut fields.created_at,
            TimestampField::PublishedAt => &mut fields.published_at,
        }
    }

    /// Normalize the field after an entry has been read.
    pub fn on_fetch(self, mut ctx: EntryContext, date_format: &str) -> EntryContext {
        let slot = self.slot(&mut ctx.fields);
        let resolved = match slot.take() {
            Some(Timestamp::Epoch(secs)) => Some(secs),
            Some(Timestamp::Text(text)) => parse_timestamp(&text, date_format).or_else(|| {
                tracing::debug!(field = self.name(), %text, "unparseable date, using file time");
                modified_secs(&ctx.location)
            }),
            None => modified_secs(&ctx.location),
        };
        *slot = resolved.map(Timestamp::Epoch);
        ctx
    }

    /// Default the field before a new entry is written.
    pub fn on_create(self, mut ctx: EntryContext, date_format: &str) -> EntryContext {
        let slot = self.slot(&mut ctx.fields);
        if slot.is_none() {
            let now = Utc::now();
            let mut text = String::new();
            *slot = Some(match write!(text, "{}", now.format(date_format)) {
                Ok(()) => Timestamp::Text(text),
                Err(_) => {
                    tracing::warn!(
                        field = self.name(),
                        date_format,
                        "unrenderable date_format, storing epoch"
                    );
                    Timestamp::Epoch(now.timestamp())
                }
            });
        }
        ctx
    }
}

/// Subscribe the handlers of every enabled timestamp field.
pub fn register_fields(bus: &mut EventBus<EntryContext>, settings: &Settings) {
    let toggles = [
        (TimestampField::CreatedAt, settings.entries.fields.created_at.enabled),
        (TimestampField::PublishedAt, settings.entries.fields.published_at.enabled),
    ];
    for (field, enabled) in toggles {
        if !enabled {
            continue;
        }
        let format = settings.date_format.clone();
        bus.subscribe(ENTRY_FETCH_HAS_RESULT, move |ctx| field.on_fetch(ctx, &format));
        let format = settings.date_format.clone();
        bus.subscribe(ENTRY_CREATE, move |ctx| field.on_create(ctx, &format));
        tracing::debug!(field = field.name(), "registered field handlers");
    }
}

/// Parse a stored date into epoch seconds (UTC).
///
/// Accepts an integer string, the configured format, RFC 3339, and a few
/// common layouts.
pub fn parse_timestamp(text: &str, date_format: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(secs) = text.parse::<i64>() {
        return Some(secs);
    }
    if let Ok(dt) = DateTime::parse_from_str(text, date_format) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp());
    }
    let datetime_formats = std::iter::once(date_format).chain(FALLBACK_DATETIME_FORMATS.iter().copied());
    for format in datetime_formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().timestamp());
        }
    }
    let date_formats = std::iter::once(date_format).chain(FALLBACK_DATE_FORMATS.iter().copied());
    for format in date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        }
    }
    None
}

fn modified_secs(path: &Path) -> Option<i64> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let secs = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    i64::try_from(secs).ok()
}
