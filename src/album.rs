//! Album tree building.
//!
//! Stage 1 of the pipeline. Recursively walks the photo root, classifying
//! each directory entry exactly once:
//!
//! - a sub-directory is a sub-album candidate;
//! - a file whose extension is in [`IMAGE_EXTENSIONS`] and whose name does
//!   not carry the derivative marker is a photo candidate;
//! - everything else is ignored.
//!
//! ## Leaf vs. composite albums
//!
//! A directory containing at least one sub-directory becomes a composite
//! album, kept inline in its parent's tree. A directory with no
//! sub-directories at all — even one with zero photos — is a leaf album: its
//! `{order, dict}` pair is persisted to its own manifest under the albums
//! directory, named from the dash-joined parent chain
//! (`Travel-Japan.json`), and the parent's tree holds only a
//! [`LeafReference`] to that file.
//!
//! ```text
//! photos/                     composite (root, depth 0)
//! ├── Landscapes/             leaf  → _data/albums/Landscapes.json
//! │   ├── dawn.jpg
//! │   └── dawn.min.avif       derivative, never a candidate
//! └── Travel/                 composite (depth 1)
//!     ├── tokyo.jpg           direct photo child
//!     └── Japan/              leaf  → _data/albums/Travel-Japan.json
//! ```
//!
//! ## Ordering
//!
//! Photos and sub-albums are sorted independently, each by name or by a
//! configured filesystem timestamp, with an independent descending flag.
//! Photo description runs on the rayon pool, but results are inserted in
//! sorted candidate order — completion timing never changes a manifest.
//!
//! ## Failure policy
//!
//! A single photo failing to process is logged and omitted; the traversal
//! continues. A directory that cannot be enumerated fails its whole subtree.

use crate::config::{GalleryConfig, SortConfig, TimeKey};
use crate::photo::{self, PhotoDescriptor};
use crate::store::{self, StoreError};
use crate::types::{AlbumNode, CompositeAlbum, Items, LeafReference, Node};
use rayon::prelude::*;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to read directory {0}: {1}")]
    ReadDir(PathBuf, std::io::Error),
    #[error("Failed to write album manifest: {0}")]
    Store(#[from] StoreError),
}

/// Extensions considered source photos (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "bmp", "gif"];

/// Recursive album tree builder.
///
/// Holds the run's configuration and descriptor; [`AlbumBuilder::build`]
/// does the walking. Side effects: one manifest file per leaf album, plus
/// whatever derivatives the descriptor writes.
pub struct AlbumBuilder<'a> {
    config: &'a GalleryConfig,
    descriptor: &'a dyn PhotoDescriptor,
    site_root: &'a Path,
}

impl<'a> AlbumBuilder<'a> {
    pub fn new(
        config: &'a GalleryConfig,
        descriptor: &'a dyn PhotoDescriptor,
        site_root: &'a Path,
    ) -> Self {
        Self {
            config,
            descriptor,
            site_root,
        }
    }

    /// Build the whole tree from the configured photo root.
    pub fn build_root(&self) -> Result<AlbumNode, BuildError> {
        let photos_path = self.config.photos_path(self.site_root);
        self.build(&photos_path, &self.config.title, 0)
    }

    /// Build the album rooted at `dir`, `depth` levels below the photo root.
    pub fn build(&self, dir: &Path, name: &str, depth: usize) -> Result<AlbumNode, BuildError> {
        let (mut photo_paths, mut album_paths) = self.classify_entries(dir)?;
        sort_paths(&mut photo_paths, &self.config.photos);
        sort_paths(&mut album_paths, &self.config.albums);

        let mut items = Items::default();

        // Describe photos on the worker pool; insert in sorted candidate
        // order regardless of completion timing.
        let described: Vec<(String, _)> = photo_paths
            .par_iter()
            .map(|path| (entry_name(path), self.descriptor.describe(path)))
            .collect();
        for (key, result) in described {
            match result {
                Ok(Some(record)) => items.insert(key, Node::Photo(record)),
                Ok(None) => {}
                Err(err) => println!("Skipping {key}: {err}"),
            }
        }

        let has_child_albums = !album_paths.is_empty();
        for album_path in &album_paths {
            let child_name = entry_name(album_path);
            let child = self.build(album_path, &child_name, depth + 1)?;
            items.insert(child_name, Node::Album(child));
        }

        let parents = parent_chain(dir, depth);

        if has_child_albums {
            Ok(AlbumNode::Composite(CompositeAlbum {
                name: name.to_string(),
                root: depth,
                parents,
                items,
            }))
        } else {
            self.persist_leaf(name, depth, parents, &items)
        }
    }

    /// Write a leaf album's manifest and return the reference standing in
    /// for it in the parent tree.
    fn persist_leaf(
        &self,
        name: &str,
        depth: usize,
        parents: Vec<String>,
        items: &Items,
    ) -> Result<AlbumNode, BuildError> {
        let file_name = format!("{}.json", parents.join("-"));
        let manifest_path = self.config.albums_path(self.site_root).join(&file_name);
        store::write_manifest(&manifest_path, items, self.config.keep_order)?;

        let relative = manifest_path
            .strip_prefix(self.site_root)
            .unwrap_or(&manifest_path);
        Ok(AlbumNode::Leaf(LeafReference {
            name: name.to_string(),
            root: depth,
            parents,
            path: format!("./{}", relative.display()),
            no_sub_album: true,
        }))
    }

    /// Enumerate `dir` once, splitting entries into photo and sub-album
    /// candidates. Everything else (sidecars, dotfiles, derivatives) is
    /// ignored.
    fn classify_entries(&self, dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>), BuildError> {
        let read_dir =
            std::fs::read_dir(dir).map_err(|e| BuildError::ReadDir(dir.to_path_buf(), e))?;

        let mut photos = Vec::new();
        let mut albums = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| BuildError::ReadDir(dir.to_path_buf(), e))?;
            let path = entry.path();
            if path.is_dir() {
                albums.push(path);
            } else if is_photo_candidate(&path) {
                photos.push(path);
            }
        }
        Ok((photos, albums))
    }
}

/// True for files with a source-photo extension and no derivative marker.
fn is_photo_candidate(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    IMAGE_EXTENSIONS.contains(&ext.as_str()) && !photo::is_derivative(&entry_name(path))
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Trailing `depth` path segments of `dir`, most-distant first.
/// The node's own basename is the last element; empty at the root.
fn parent_chain(dir: &Path, depth: usize) -> Vec<String> {
    if depth == 0 {
        return Vec::new();
    }
    let segments: Vec<String> = dir
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    segments[segments.len().saturating_sub(depth)..].to_vec()
}

/// Sort candidates by name, or by the configured filesystem timestamp.
/// A missing timestamp sorts first rather than failing the walk.
fn sort_paths(paths: &mut [PathBuf], sort: &SortConfig) {
    if sort.sort_by_time {
        paths.sort_by_key(|path| timestamp(path, sort.order_by).unwrap_or(SystemTime::UNIX_EPOCH));
    } else {
        paths.sort_by_key(|path| entry_name(path));
    }
    if sort.reverse {
        paths.reverse();
    }
}

fn timestamp(path: &Path, key: TimeKey) -> Option<SystemTime> {
    let meta = std::fs::metadata(path).ok()?;
    match key {
        TimeKey::Access => meta.accessed().ok(),
        TimeKey::Modify => meta.modified().ok(),
        TimeKey::Create => meta.created().ok(),
    }
}

// ---------------------------------------------------------------------------
// Read-only survey (the `check` command)
// ---------------------------------------------------------------------------

/// Counts from a read-only sweep of the photo tree.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Survey {
    pub albums: usize,
    pub photos: usize,
    pub derivatives: usize,
    pub ignored: usize,
}

/// Walk the photo tree without writing anything and count what a build
/// would see. Unlike [`AlbumBuilder::build`], this has no side effects.
pub fn survey(photos_root: &Path) -> Result<Survey, BuildError> {
    let mut survey = Survey::default();
    for entry in WalkDir::new(photos_root) {
        let entry =
            entry.map_err(|e| BuildError::ReadDir(photos_root.to_path_buf(), e.into()))?;
        if entry.depth() == 0 {
            continue;
        }
        if entry.file_type().is_dir() {
            survey.albums += 1;
        } else if photo::is_derivative(&entry_name(entry.path())) {
            survey.derivatives += 1;
        } else if is_photo_candidate(entry.path()) {
            survey.photos += 1;
        } else {
            survey.ignored += 1;
        }
    }
    Ok(survey)
}
