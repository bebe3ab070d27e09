//! Zip archive fixtures.

use std::io::{Cursor, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// One entry of a fixture archive.
#[derive(Debug, Clone, Copy)]
pub enum ZipItem<'a> {
    /// File entry with its content. Parent directories are not added.
    File(&'a str, &'a [u8]),
    /// Explicit directory entry.
    Dir(&'a str),
}

/// Build an archive in memory.
///
/// # Panics
///
/// When the zip writer rejects an entry name.
#[must_use]
pub fn zip_bytes(items: &[ZipItem<'_>]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for item in items {
        match *item {
            ZipItem::File(name, content) => {
                writer.start_file(name, options).expect("start zip entry");
                writer.write_all(content).expect("write zip entry");
            }
            ZipItem::Dir(name) => {
                writer.add_directory(name, options).expect("add zip directory");
            }
        }
    }

    writer.finish().expect("finish zip").into_inner()
}

/// Write an archive built by [`zip_bytes`] to `path`.
///
/// # Panics
///
/// When the archive cannot be written.
pub fn build_zip(path: &Path, items: &[ZipItem<'_>]) {
    std::fs::write(path, zip_bytes(items)).expect("write zip fixture");
}
