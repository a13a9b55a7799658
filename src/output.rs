//! CLI output formatting for the pipeline stages.
//!
//! Output is information-centric: every album leads with its positional
//! index and display name; filesystem detail (leaf manifest paths, photo
//! counts) follows as context. Each stage has a `format_*` function
//! (returns `Vec<String>`) for testability and a `print_*` wrapper that
//! writes to stdout. Format functions are pure — no I/O, no side effects.
//!
//! ## Build
//!
//! ```text
//! Albums
//! Gallery (1 photo)
//!     001 Landscapes → ./_data/albums/Landscapes.json
//!     002 Travel (1 photo)
//!         001 Japan → ./_data/albums/Travel-Japan.json
//! ```
//!
//! ## Stream
//!
//! ```text
//! Stream
//! 001 Gallery (1 photo)
//! 002 Travel/Japan (2 photos)
//! Flattened 2 resources, 3 photos
//! ```

use crate::album::Survey;
use crate::types::{AlbumNode, Node, Resource};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn photo_count_suffix(count: usize) -> String {
    match count {
        0 => String::new(),
        1 => " (1 photo)".to_string(),
        n => format!(" ({n} photos)"),
    }
}

// ============================================================================
// Stage 1: Build output
// ============================================================================

/// Format the album tree produced by the build stage.
pub fn format_tree_output(root: &AlbumNode) -> Vec<String> {
    let mut lines = vec!["Albums".to_string()];
    push_album_lines(root, 0, None, &mut lines);
    lines
}

fn push_album_lines(
    node: &AlbumNode,
    depth: usize,
    position: Option<usize>,
    lines: &mut Vec<String>,
) {
    let prefix = match position {
        Some(pos) => format!("{} ", format_index(pos)),
        None => String::new(),
    };

    match node {
        AlbumNode::Leaf(leaf) => {
            lines.push(format!(
                "{}{}{} \u{2192} {}",
                indent(depth),
                prefix,
                leaf.name,
                leaf.path
            ));
        }
        AlbumNode::Composite(album) => {
            let photos = album
                .items
                .ordered()
                .into_iter()
                .filter(|n| matches!(n, Node::Photo(_)))
                .count();
            lines.push(format!(
                "{}{}{}{}",
                indent(depth),
                prefix,
                album.name,
                photo_count_suffix(photos)
            ));

            let mut child_position = 0;
            for child in album.items.ordered() {
                if let Node::Album(sub) = child {
                    child_position += 1;
                    push_album_lines(sub, depth + 1, Some(child_position), lines);
                }
            }
        }
    }
}

/// Print build output to stdout.
pub fn print_tree_output(root: &AlbumNode) {
    for line in format_tree_output(root) {
        println!("{}", line);
    }
}

// ============================================================================
// Stage 2: Stream output
// ============================================================================

/// Format the flattened photo stream.
pub fn format_stream_output(resources: &[Resource]) -> Vec<String> {
    let mut lines = vec!["Stream".to_string()];
    let mut total_photos = 0;

    for (i, resource) in resources.iter().enumerate() {
        match resource {
            Resource::Photos(stream) => {
                total_photos += stream.list.len();
                let label = if stream.parents.is_empty() {
                    stream.name.clone()
                } else {
                    stream.parents.join("/")
                };
                lines.push(format!(
                    "{} {}{}",
                    format_index(i + 1),
                    label,
                    photo_count_suffix(stream.list.len())
                ));
            }
            Resource::Album(album) => {
                lines.push(format!("{} {}", format_index(i + 1), album.name));
            }
        }
    }

    lines.push(format!(
        "Flattened {} resources, {} photos",
        resources.len(),
        total_photos
    ));
    lines
}

/// Print stream output to stdout.
pub fn print_stream_output(resources: &[Resource]) {
    for line in format_stream_output(resources) {
        println!("{}", line);
    }
}

// ============================================================================
// Check output
// ============================================================================

/// Format the read-only survey report.
pub fn format_check_output(survey: &Survey) -> Vec<String> {
    vec![format!(
        "{} albums, {} photos, {} derivatives, {} other files",
        survey.albums, survey.photos, survey.derivatives, survey.ignored
    )]
}

/// Print check output to stdout.
pub fn print_check_output(survey: &Survey) {
    for line in format_check_output(survey) {
        println!("{}", line);
    }
}
