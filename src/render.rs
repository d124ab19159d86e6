//! Index artifact rendering.
//!
//! Produces one `dirview.html` per directory: a table with a row per
//! subdirectory (linking to that subdirectory's own index) and a row per
//! file (linking to the file itself, with an inline preview image when an
//! artifact exists on disk at render time).
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating:
//! malformed markup is a build error and all interpolation is auto-escaped,
//! so hostile file names cannot inject markup into the listing.
//!
//! This module makes no decisions — it runs only when the change detector
//! said the directory differs from its snapshot, and renders exactly what
//! the walker computed.

use crate::config::INDEX_FILENAME;
use crate::types::DirectoryListing;
use maud::{DOCTYPE, Markup, html};
use std::fs;
use std::io;
use std::path::Path;

const STYLE: &str = "table, th, td {\n  border: 1px solid black;\n  padding: 15px\n}";

/// `file://` URL for an absolute path.
fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// One table row: entry kind, a (possibly linked) label, and an optional
/// inline preview image.
fn entry_row(kind: &str, label: &str, href: Option<String>, thumbnail: Option<String>) -> Markup {
    html! {
        tr {
            td { (kind) }
            td {
                @if let Some(href) = href {
                    a href=(href) { (label) }
                } @else {
                    (label)
                }
            }
            td {
                @if let Some(thumb) = thumbnail {
                    img src=(thumb);
                }
            }
        }
    }
}

/// Render the listing for one directory.
///
/// `with_parent_link` is false at the tree root, which has no parent index
/// to link back to.
pub fn render_index(dir: &Path, listing: &DirectoryListing, with_parent_link: bool) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                title { "Listing of " (dir.display()) }
                style { (STYLE) }
            }
            body {
                p { "Index of files for directory: " (dir.display()) }
                table {
                    @if with_parent_link {
                        (entry_row(
                            "Folder",
                            "Parent directory",
                            Some(format!("../{INDEX_FILENAME}")),
                            None,
                        ))
                    }
                    @for name in &listing.subdirs {
                        (entry_row(
                            "Folder",
                            name,
                            Some(format!("{name}/{INDEX_FILENAME}")),
                            None,
                        ))
                    }
                    @for (name, record) in &listing.files {
                        (entry_row(
                            "File",
                            name,
                            Some(file_url(&record.abs_path)),
                            // Probe at render time: a recorded artifact that
                            // vanished since must not leave a broken image.
                            record
                                .preview_path
                                .exists()
                                .then(|| file_url(&record.preview_path)),
                        ))
                    }
                }
            }
        }
    }
}

/// Render and write `<dir>/dirview.html`.
pub fn write_index(dir: &Path, listing: &DirectoryListing, with_parent_link: bool) -> io::Result<()> {
    let markup = render_index(dir, listing, with_parent_link);
    fs::write(dir.join(INDEX_FILENAME), markup.into_string())
}
