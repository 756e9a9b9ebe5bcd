//! # Quire
//!
//! A flat-file content core. The filesystem is the database: entries are
//! TOML files in directories, uploaded media are plain files with a TOML
//! sidecar each, and nothing lives anywhere else.
//!
//! # Storage Layout
//!
//! ```text
//! project/
//! ├── settings.toml                       # optional, merged over stock defaults
//! ├── entries/
//! │   └── blog/hello/entry.toml           # entry "blog/hello"
//! ├── uploads/
//! │   ├── blog/cover.jpg                  # media "blog/cover.jpg"
//! │   └── .meta/blog/cover.jpg.toml       # its sidecar
//! ├── tmp/uploads/                        # upload spool
//! └── cache/                              # file cache driver
//! ```
//!
//! Content and sidecar trees mirror each other exactly; the `.meta` segment
//! at the root is the only difference. See [`locator`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `settings.toml` loading, stock defaults, merging, validation |
//! | [`codec`] | TOML encode/decode for sidecars and entry files |
//! | [`locator`] | Maps ids to content and sidecar paths; id validation |
//! | [`naming`] | Dot splitting and slug-safe file names |
//! | [`imaging`] | Image sniffing, dimension rules, resize, EXIF computed fields |
//! | [`media`] | Upload pipeline and media file management |
//! | [`events`] | Explicit publish/subscribe bus of context transformations |
//! | [`entries`] | Entry store and the timestamp field handlers |
//! | [`cache`] | Cache adapter contract with file and memory drivers |
//!
//! # Design Decisions
//!
//! ## Rejections Are Values
//!
//! A bad upload (wrong extension, too large, image out of bounds) is an
//! ordinary outcome that a caller shows to a user, so
//! [`MediaStore::upload`](media::MediaStore::upload) returns
//! `Ok(UploadOutcome::Rejected(_))` for it. `Err` is reserved for a broken
//! deployment, such as an uploads directory that cannot be written.
//!
//! ## Explicit Event Bus
//!
//! Field enrichment runs through an [`EventBus`](events::EventBus) built at
//! startup and handed to [`Entries`](entries::Entries). Handlers are
//! `Fn(C) -> C`, run in subscription order, so the whole pipeline for an
//! event is a fold over the context. There is no global registry.
//!
//! ## Sniff, Don't Trust
//!
//! The upload channel spools files under meaningless names, and clients
//! lie about MIME types. Image handling keys off the bytes
//! ([`ImageBackend::sniff`](imaging::ImageBackend::sniff)), never the name.

pub mod cache;
pub mod codec;
pub mod config;
pub mod entries;
pub mod events;
pub mod imaging;
pub mod locator;
pub mod media;
pub mod naming;

#[cfg(test)]
pub(crate) mod test_helpers;
