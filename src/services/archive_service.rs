//! Project archive extraction
//!
//! Turns a ZIP archive into the ordered candidate list the diff engine
//! consumes. Archives produced by "download project" buttons usually wrap
//! everything in one folder (`project/...`); that shared root is removed so
//! paths line up with the repository root.

use std::io::{Read, Seek};
use std::path::Path;

use crate::error::Result;
use crate::models::{FileContent, FileEntry};

/// Extract the archive at `path`
pub fn extract_zip_file(path: &Path) -> Result<Vec<FileEntry>> {
    let file = std::fs::File::open(path)?;
    extract_zip(std::io::BufReader::new(file))
}

/// Extract every file entry of a ZIP archive.
///
/// Directory entries and entries whose names escape the archive root are
/// skipped. File contents that are valid UTF-8 become text, everything
/// else stays binary. Entry order is preserved.
pub fn extract_zip<R: Read + Seek>(reader: R) -> Result<Vec<FileEntry>> {
    let mut archive = zip::ZipArchive::new(reader)?;
    let mut files = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        if entry.enclosed_name().is_none() {
            tracing::warn!(name = %entry.name(), "skipping archive entry outside the archive root");
            continue;
        }

        let name = entry.name().replace('\\', "/");
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        files.push((name, bytes));
    }

    let names: Vec<&str> = files.iter().map(|(name, _)| name.as_str()).collect();
    let root = common_root(&names).map(str::to_string);
    if let Some(root) = &root {
        tracing::debug!(%root, "stripping shared archive root");
    }

    let entries: Vec<FileEntry> = files
        .into_iter()
        .filter_map(|(name, bytes)| {
            let path = match &root {
                Some(root) => name.strip_prefix(root.as_str()).unwrap_or(&name).to_string(),
                None => name,
            };
            if path.is_empty() {
                return None;
            }
            Some(FileEntry {
                path,
                content: Some(FileContent::from_bytes(bytes)),
                is_directory: false,
            })
        })
        .collect();

    tracing::info!(files = entries.len(), "extracted archive");
    Ok(entries)
}

/// The `folder/` prefix shared by every path, judged from the first path's
/// leading component
pub fn common_root<'a>(paths: &[&'a str]) -> Option<&'a str> {
    let first = paths.first()?;
    let (folder, rest) = first.split_once('/')?;
    if folder.is_empty() || rest.is_empty() {
        return None;
    }
    let root = &first[..folder.len() + 1];
    paths.iter().all(|p| p.starts_with(root)).then_some(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            match content {
                Some(bytes) => {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(bytes).unwrap();
                }
                None => zip.add_directory(*name, options).unwrap(),
            }
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_common_root() {
        assert_eq!(common_root(&["project/a.txt", "project/src/b.rs"]), Some("project/"));
        assert_eq!(common_root(&["project/a.txt", "other/b.rs"]), None);
        assert_eq!(common_root(&["a.txt", "project/b.rs"]), None);
        assert_eq!(common_root(&[]), None);
    }

    #[test]
    fn test_extract_strips_shared_root_and_skips_directories() {
        let bytes = build_zip(&[
            ("project/", None),
            ("project/src/", None),
            ("project/README.md", Some(b"# Demo".as_slice())),
            ("project/src/main.rs", Some(b"fn main() {}".as_slice())),
        ]);

        let files = extract_zip(Cursor::new(bytes)).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/main.rs"]);
        assert_eq!(files[0].content, Some(FileContent::Text("# Demo".to_string())));
        assert!(files.iter().all(|f| !f.is_directory));
    }

    #[test]
    fn test_extract_keeps_paths_without_shared_root() {
        let bytes = build_zip(&[
            ("index.html", Some(b"<html></html>".as_slice())),
            ("assets/app.css", Some(b"body {}".as_slice())),
        ]);
        let files = extract_zip(Cursor::new(bytes)).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "assets/app.css"]);
    }

    #[test]
    fn test_binary_content_detected() {
        let png: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0xff, 0x00];
        let bytes = build_zip(&[("logo.png", Some(png))]);
        let files = extract_zip(Cursor::new(bytes)).unwrap();
        assert_eq!(files[0].content, Some(FileContent::Binary(png.to_vec())));
    }

    #[test]
    fn test_invalid_archive() {
        let result = extract_zip(Cursor::new(b"not a zip".to_vec()));
        assert!(matches!(result, Err(crate::error::RepoPushError::Archive(_))));
    }

    #[test]
    fn test_extract_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("upload.zip");
        std::fs::write(&path, build_zip(&[("site/index.html", Some(b"hi".as_slice()))])).unwrap();
        let files = extract_zip_file(&path).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "index.html");
    }
}
