//! Manifest node shapes shared across pipeline stages.
//!
//! These types are serialized to JSON between the build stage and the
//! flatten stage and must round-trip exactly: the flattener re-reads from
//! disk what the builder wrote.
//!
//! ## On-disk shapes
//!
//! A node is distinguished at runtime by its `type` tag, and albums further
//! by which fields they carry:
//!
//! ```text
//! composite album   {"name", "type": "album", "root", "parents", "items": {"order", "dict"}}
//! leaf reference    {"name", "type": "album", "root", "parents", "path", "no_sub_album": true}
//! photo             {"type": "photo", "width", "height", "camera", ..., "path", "min_path"}
//! ```
//!
//! Leaf-album manifests persist a bare `{"order", "dict"}` pair ([`Items`]);
//! composite albums embed the same pair under `items`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Any child of an album: a sub-album or a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    #[serde(rename = "album")]
    Album(AlbumNode),
    #[serde(rename = "photo")]
    Photo(PhotoRecord),
}

/// An album node: either a leaf reference (no sub-albums, children persisted
/// to a standalone manifest) or a composite album carried inline.
///
/// Untagged: a leaf reference is recognized by its `path`/`no_sub_album`
/// fields, a composite by its `items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlbumNode {
    Leaf(LeafReference),
    Composite(CompositeAlbum),
}

impl AlbumNode {
    pub fn name(&self) -> &str {
        match self {
            AlbumNode::Leaf(leaf) => &leaf.name,
            AlbumNode::Composite(album) => &album.name,
        }
    }

    pub fn parents(&self) -> &[String] {
        match self {
            AlbumNode::Leaf(leaf) => &leaf.parents,
            AlbumNode::Composite(album) => &album.parents,
        }
    }
}

/// A directory with at least one sub-directory, kept inline in its parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeAlbum {
    pub name: String,
    /// Depth from the photo root (root album = 0).
    pub root: usize,
    /// Trailing `root` path segments of the directory, most-distant first.
    /// The node's own basename is the last element; empty at the root.
    pub parents: Vec<String>,
    pub items: Items,
}

/// Stand-in for an album with no sub-albums, whose children live in a
/// standalone manifest on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafReference {
    pub name: String,
    pub root: usize,
    pub parents: Vec<String>,
    /// Manifest location relative to the site root, with explicit `./` prefix.
    pub path: String,
    pub no_sub_album: bool,
}

/// Ordered children of an album: `order` is the presentation sequence,
/// `dict` the keyed nodes. `order` holds exactly the keys of `dict`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Items {
    pub order: Vec<String>,
    pub dict: BTreeMap<String, Node>,
}

impl Items {
    /// Append a child, keeping `order` and `dict` in lockstep.
    pub fn insert(&mut self, key: String, node: Node) {
        self.order.push(key.clone());
        self.dict.insert(key, node);
    }

    /// Children in presentation order. Order entries with no matching dict
    /// key are dropped — manifests edited by hand are allowed to drift.
    pub fn ordered(&self) -> Vec<&Node> {
        self.order
            .iter()
            .filter_map(|key| self.dict.get(key))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }
}

/// Metadata record for one processed photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub width: u32,
    pub height: u32,
    /// `"Make Model"`, or `"Unknown"` when EXIF has neither.
    pub camera: String,
    /// Formatted f-number, e.g. `"f/2.8"`, or `"Unknown"`.
    pub aperture: String,
    /// Formatted exposure, e.g. `"1/250s"` or `"2s"`, or `"Unknown"`.
    pub exposure: String,
    pub iso: IsoSpeed,
    /// Formatted focal length, e.g. `"35mm"`, or `"Unknown"`.
    pub focal: String,
    /// Source image relative to the site root, with explicit `./` prefix.
    pub path: String,
    /// Generated derivative relative to the site root, with `./` prefix.
    pub min_path: String,
}

/// ISO reading: an integer when EXIF provides one, the literal string
/// `"Unknown"` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IsoSpeed {
    Rating(u32),
    Unknown(String),
}

impl Default for IsoSpeed {
    fn default() -> Self {
        IsoSpeed::Unknown("Unknown".to_string())
    }
}

/// One entry of the flattened photo stream.
///
/// The flattener emits `Photos` resources only; `Album` is the
/// carried-through composite shape the data model admits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Resource {
    #[serde(rename = "album")]
    Album(CompositeAlbum),
    #[serde(rename = "photos")]
    Photos(PhotoStream),
}

/// A run of photos belonging to one album, in presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoStream {
    pub name: String,
    pub parents: Vec<String>,
    pub list: Vec<PhotoRecord>,
}
