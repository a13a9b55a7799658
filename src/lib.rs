//! # photostream
//!
//! A static photo-stream dataset builder for photography portfolios.
//! Your filesystem is the data source: nested directories become albums,
//! and the whole tree is flattened into one ordered "photo stream" JSON
//! document for a front-end to consume.
//!
//! # Architecture: Two-Stage Pipeline
//!
//! ```text
//! 1. Build     photos/   →  _data/albums/*.json + _data/gallery.json
//! 2. Flatten   gallery.json  →  _data/stream.json
//! ```
//!
//! The build stage walks the photo root depth-first. Directories with
//! sub-directories become composite albums, kept inline in the tree;
//! directories without sub-directories are leaf albums, persisted to their
//! own manifest and replaced by a lightweight reference. Every source image
//! passes through the [`photo::PhotoDescriptor`] seam, which yields a
//! metadata record (dimensions, camera, exposure) and writes a resized
//! `.min.avif` derivative alongside the source.
//!
//! The flatten stage reloads the tree from disk, resolves leaf manifests on
//! demand, and emits a linear, pre-order sequence of photo resources.
//!
//! The two stages communicate only through JSON on disk. This keeps each
//! stage a function from manifest to manifest — debuggable with a text
//! editor, testable without re-encoding images, and rerunnable on its own.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`album`] | Stage 1 — recursive album tree builder, leaf manifest persistence |
//! | [`stream`] | Stage 2 — flattens the tree into the photo stream |
//! | [`ordering`] | Contiguous-block order merge preserving manual reordering across reruns |
//! | [`store`] | JSON manifest read/write, merge-on-write under `keep_order` |
//! | [`types`] | Manifest node shapes serialized between stages |
//! | [`photo`] | `PhotoDescriptor` trait + pure-Rust `image`-crate implementation |
//! | [`exif`] | Minimal EXIF parser (JPEG APP1 + TIFF IFD) |
//! | [`config`] | `gallery.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting — pure `format_*` functions |
//!
//! # Design Decisions
//!
//! ## Order Preservation Over Regeneration
//!
//! Manifests are regenerated from scratch on every run, but users reorder
//! albums and photos by editing the persisted `order` arrays. With
//! `keep_order` enabled, a previous ordering survives a rerun when its
//! surviving entries form one contiguous block of the fresh order — the only
//! case where the old ordering has an unambiguous home. Anything murkier
//! resets to the fresh order, with a printed notice instead of a silent
//! discard.
//!
//! ## Pure-Rust Imaging
//!
//! Derivatives are decoded and encoded entirely through the `image` crate —
//! Lanczos3 resampling, AVIF output. No ImageMagick, no system dependencies:
//! a single binary serves the whole pipeline. EXIF extraction is a small
//! hand-rolled parser for the same reason; it reads exactly the six fields
//! the records need and degrades to `"Unknown"` rather than failing a build.
//!
//! ## Plain JSON State
//!
//! There is no database and no incremental build state. One manifest per
//! leaf album plus one tree manifest is the entire persistent model, written
//! deterministically (sorted keys, 2-space indent) so reruns diff cleanly
//! in version control.

pub mod album;
pub mod config;
pub mod exif;
pub mod ordering;
pub mod output;
pub mod photo;
pub mod store;
pub mod stream;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
