//! Tree flattening: nested album tree → linear photo stream.
//!
//! Stage 2 of the pipeline. Reloads the root manifest the builder wrote,
//! expands it depth-first, and emits one `photos` resource per album that
//! actually holds photos — leaf albums via their on-disk manifests, composite
//! albums via their direct photo children. The front-end consumes the result
//! as a flat ordered list.
//!
//! ## Emission order
//!
//! Depth-first, pre-order: an album's own direct photos come before anything
//! derived from its sub-albums, and siblings follow the album's `order`.
//!
//! ```text
//! Gallery                     ┐
//! ├── dawn.jpg                ├─→ 1. photos(Gallery)      [dawn]
//! ├── Landscapes/             ├─→ 2. photos(Landscapes)   [...]
//! └── Travel/                 │
//!     ├── tokyo.jpg           ├─→ 3. photos(Travel)       [tokyo]
//!     └── Japan/              └─→ 4. photos(Travel/Japan) [...]
//! ```
//!
//! Leaf references never appear in the output themselves — only their
//! synthesized photos resource, and only when it is non-empty. Order entries
//! with no matching dict key are tolerated and dropped (hand-edited
//! manifests drift); a leaf manifest that is missing outright is fatal.

use crate::store::{self, StoreError};
use crate::types::{AlbumNode, Items, Node, PhotoRecord, PhotoStream, Resource};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to read root manifest {path}: {source}")]
    RootManifest { path: PathBuf, source: StoreError },
    #[error("Root manifest {0} is not an album tree")]
    NotAnAlbum(PathBuf),
    #[error("Failed to read leaf manifest {path}: {source}")]
    LeafManifest { path: String, source: StoreError },
}

/// Flatten the album tree rooted at `tree_path` into an ordered resource
/// list. Leaf manifests are resolved against `site_root` on demand.
pub fn flatten(tree_path: &Path, site_root: &Path) -> Result<Vec<Resource>, StreamError> {
    let root: Node = store::read_manifest(tree_path).map_err(|source| {
        StreamError::RootManifest {
            path: tree_path.to_path_buf(),
            source,
        }
    })?;

    let Node::Album(album) = root else {
        return Err(StreamError::NotAnAlbum(tree_path.to_path_buf()));
    };

    let mut resources = Vec::new();
    nest_album(&album, site_root, &mut resources)?;
    Ok(resources)
}

/// Append the resources for `album` and its subtree, in emission order.
///
/// Photo children can't reach this function (the `Node` match below only
/// recurses into albums), so the "not an album" no-op of the contract is
/// encoded in the types rather than checked at runtime.
fn nest_album(
    album: &AlbumNode,
    site_root: &Path,
    out: &mut Vec<Resource>,
) -> Result<(), StreamError> {
    match album {
        AlbumNode::Leaf(leaf) => {
            let manifest_path = site_root.join(leaf.path.trim_start_matches("./"));
            let items: Items =
                store::read_manifest(&manifest_path).map_err(|source| {
                    StreamError::LeafManifest {
                        path: leaf.path.clone(),
                        source,
                    }
                })?;
            push_photos(leaf.name.clone(), leaf.parents.clone(), &items, out);
            Ok(())
        }
        AlbumNode::Composite(composite) => {
            push_photos(
                composite.name.clone(),
                composite.parents.clone(),
                &composite.items,
                out,
            );
            for child in composite.items.ordered() {
                if let Node::Album(sub) = child {
                    nest_album(sub, site_root, out)?;
                }
            }
            Ok(())
        }
    }
}

/// Synthesize a photos resource from an album's direct photo children.
/// Albums without photos emit nothing.
fn push_photos(name: String, parents: Vec<String>, items: &Items, out: &mut Vec<Resource>) {
    let list: Vec<PhotoRecord> = items
        .ordered()
        .into_iter()
        .filter_map(|node| match node {
            Node::Photo(record) => Some(record.clone()),
            Node::Album(_) => None,
        })
        .collect();

    if !list.is_empty() {
        out.push(Resource::Photos(PhotoStream {
            name,
            parents,
            list,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::photo_record;
    use crate::types::{CompositeAlbum, LeafReference};
    use tempfile::TempDir;

    fn items_of(entries: &[(&str, Node)]) -> Items {
        let mut items = Items::default();
        for (key, node) in entries {
            items.insert(key.to_string(), node.clone());
        }
        items
    }

    fn leaf(name: &str, parents: &[&str]) -> LeafReference {
        LeafReference {
            name: name.to_string(),
            root: parents.len(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            path: format!("./_data/albums/{}.json", parents.join("-")),
            no_sub_album: true,
        }
    }

    fn write_leaf_manifest(site: &Path, leaf: &LeafReference, photos: &[&str]) {
        let items = items_of(
            &photos
                .iter()
                .map(|p| (*p, Node::Photo(photo_record(&format!("./{p}")))))
                .collect::<Vec<_>>(),
        );
        let path = site.join(leaf.path.trim_start_matches("./"));
        store::write_manifest(&path, &items, false).unwrap();
    }

    fn write_tree(site: &Path, root: &CompositeAlbum) -> PathBuf {
        let tree_path = site.join("_data/gallery.json");
        store::write_manifest(
            &tree_path,
            &Node::Album(AlbumNode::Composite(root.clone())),
            false,
        )
        .unwrap();
        tree_path
    }

    fn stream_names(resources: &[Resource]) -> Vec<&str> {
        resources
            .iter()
            .map(|r| match r {
                Resource::Photos(stream) => stream.name.as_str(),
                Resource::Album(album) => album.name.as_str(),
            })
            .collect()
    }

    #[test]
    fn direct_photos_come_before_sub_albums() {
        let tmp = TempDir::new().unwrap();
        let japan = leaf("Japan", &["Japan"]);
        write_leaf_manifest(tmp.path(), &japan, &["tokyo.jpg"]);

        let root = CompositeAlbum {
            name: "Gallery".to_string(),
            root: 0,
            parents: vec![],
            items: items_of(&[
                ("p1.jpg", Node::Photo(photo_record("./p1.jpg"))),
                ("p2.jpg", Node::Photo(photo_record("./p2.jpg"))),
                ("Japan", Node::Album(AlbumNode::Leaf(japan))),
            ]),
        };
        let tree_path = write_tree(tmp.path(), &root);

        let resources = flatten(&tree_path, tmp.path()).unwrap();
        assert_eq!(stream_names(&resources), vec!["Gallery", "Japan"]);

        let Resource::Photos(gallery) = &resources[0] else {
            panic!("expected photos resource");
        };
        let paths: Vec<&str> = gallery.list.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["./p1.jpg", "./p2.jpg"]);
    }

    #[test]
    fn emission_is_depth_first_pre_order() {
        let tmp = TempDir::new().unwrap();

        let deep = leaf("Deep", &["Travel", "Deep"]);
        write_leaf_manifest(tmp.path(), &deep, &["d.jpg"]);
        let side = leaf("Side", &["Side"]);
        write_leaf_manifest(tmp.path(), &side, &["s.jpg"]);

        let travel = CompositeAlbum {
            name: "Travel".to_string(),
            root: 1,
            parents: vec!["Travel".to_string()],
            items: items_of(&[
                ("tokyo.jpg", Node::Photo(photo_record("./tokyo.jpg"))),
                ("Deep", Node::Album(AlbumNode::Leaf(deep))),
            ]),
        };
        let root = CompositeAlbum {
            name: "Gallery".to_string(),
            root: 0,
            parents: vec![],
            items: items_of(&[
                ("Travel", Node::Album(AlbumNode::Composite(travel))),
                ("Side", Node::Album(AlbumNode::Leaf(side))),
            ]),
        };
        let tree_path = write_tree(tmp.path(), &root);

        let resources = flatten(&tree_path, tmp.path()).unwrap();
        // Travel's own photos, then its sub-album, then the later sibling.
        assert_eq!(stream_names(&resources), vec!["Travel", "Deep", "Side"]);
    }

    #[test]
    fn empty_leaf_albums_emit_nothing() {
        let tmp = TempDir::new().unwrap();
        let empty = leaf("Empty", &["Empty"]);
        write_leaf_manifest(tmp.path(), &empty, &[]);
        let full = leaf("Full", &["Full"]);
        write_leaf_manifest(tmp.path(), &full, &["a.jpg"]);

        let root = CompositeAlbum {
            name: "Gallery".to_string(),
            root: 0,
            parents: vec![],
            items: items_of(&[
                ("Empty", Node::Album(AlbumNode::Leaf(empty))),
                ("Full", Node::Album(AlbumNode::Leaf(full))),
            ]),
        };
        let tree_path = write_tree(tmp.path(), &root);

        let resources = flatten(&tree_path, tmp.path()).unwrap();
        assert_eq!(stream_names(&resources), vec!["Full"]);
    }

    #[test]
    fn photos_resource_carries_album_name_and_parents() {
        let tmp = TempDir::new().unwrap();
        let japan = leaf("Japan", &["Travel", "Japan"]);
        write_leaf_manifest(tmp.path(), &japan, &["tokyo.jpg"]);

        let root = CompositeAlbum {
            name: "Gallery".to_string(),
            root: 0,
            parents: vec![],
            items: items_of(&[("Japan", Node::Album(AlbumNode::Leaf(japan)))]),
        };
        let tree_path = write_tree(tmp.path(), &root);

        let resources = flatten(&tree_path, tmp.path()).unwrap();
        let Resource::Photos(stream) = &resources[0] else {
            panic!("expected photos resource");
        };
        assert_eq!(stream.name, "Japan");
        assert_eq!(stream.parents, vec!["Travel", "Japan"]);
    }

    #[test]
    fn stale_order_entries_are_dropped() {
        let tmp = TempDir::new().unwrap();
        let album = leaf("Album", &["Album"]);
        write_leaf_manifest(tmp.path(), &album, &["a.jpg"]);

        // Inject a ghost key into the persisted order.
        let manifest_path = tmp.path().join("_data/albums/Album.json");
        let mut items: Items = store::read_manifest(&manifest_path).unwrap();
        items.order.push("ghost.jpg".to_string());
        store::write_manifest(&manifest_path, &items, false).unwrap();

        let root = CompositeAlbum {
            name: "Gallery".to_string(),
            root: 0,
            parents: vec![],
            items: items_of(&[("Album", Node::Album(AlbumNode::Leaf(album)))]),
        };
        let tree_path = write_tree(tmp.path(), &root);

        let resources = flatten(&tree_path, tmp.path()).unwrap();
        let Resource::Photos(stream) = &resources[0] else {
            panic!("expected photos resource");
        };
        assert_eq!(stream.list.len(), 1);
    }

    #[test]
    fn flatten_is_idempotent_in_shape() {
        let tmp = TempDir::new().unwrap();
        let album = leaf("Album", &["Album"]);
        write_leaf_manifest(tmp.path(), &album, &["a.jpg", "b.jpg"]);

        let root = CompositeAlbum {
            name: "Gallery".to_string(),
            root: 0,
            parents: vec![],
            items: items_of(&[("Album", Node::Album(AlbumNode::Leaf(album)))]),
        };
        let tree_path = write_tree(tmp.path(), &root);

        let first = flatten(&tree_path, tmp.path()).unwrap();
        let second = flatten(&tree_path, tmp.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_root_manifest_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let result = flatten(&tmp.path().join("_data/gallery.json"), tmp.path());
        assert!(matches!(result, Err(StreamError::RootManifest { .. })));
    }

    #[test]
    fn photo_root_manifest_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let tree_path = tmp.path().join("_data/gallery.json");
        store::write_manifest(&tree_path, &Node::Photo(photo_record("./a.jpg")), false).unwrap();

        let result = flatten(&tree_path, tmp.path());
        assert!(matches!(result, Err(StreamError::NotAnAlbum(_))));
    }

    #[test]
    fn missing_leaf_manifest_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let dangling = leaf("Gone", &["Gone"]);
        // No manifest written for it.
        let root = CompositeAlbum {
            name: "Gallery".to_string(),
            root: 0,
            parents: vec![],
            items: items_of(&[("Gone", Node::Album(AlbumNode::Leaf(dangling)))]),
        };
        let tree_path = write_tree(tmp.path(), &root);

        let result = flatten(&tree_path, tmp.path());
        assert!(matches!(result, Err(StreamError::LeafManifest { .. })));
    }

    #[test]
    fn leaf_root_manifest_streams_its_photos() {
        // A photo root with no sub-directories at all is itself a leaf
        // reference; the flattener must handle it directly.
        let tmp = TempDir::new().unwrap();
        let only = LeafReference {
            name: "Gallery".to_string(),
            root: 0,
            parents: vec![],
            path: "./_data/albums/.json".to_string(),
            no_sub_album: true,
        };
        let items = items_of(&[("a.jpg", Node::Photo(photo_record("./a.jpg")))]);
        store::write_manifest(
            &tmp.path().join("_data/albums/.json"),
            &items,
            false,
        )
        .unwrap();

        let tree_path = tmp.path().join("_data/gallery.json");
        store::write_manifest(&tree_path, &Node::Album(AlbumNode::Leaf(only)), false).unwrap();

        let resources = flatten(&tree_path, tmp.path()).unwrap();
        assert_eq!(stream_names(&resources), vec!["Gallery"]);
    }
}
