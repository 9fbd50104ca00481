//! Reading of single-entry FB2 containers (`.fbz`, `.fb2.zip`).

use crate::errors::{ArchiveError, ArchiveResult};
use std::io;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Signatures a zip archive may begin with: a local file header, or the
/// end of central directory record of an empty archive.
const ZIP_MAGIC: [&[u8]; 2] = [b"PK\x03\x04", b"PK\x05\x06"];

/// Returns `true` if `bytes` start with a zip signature.
pub(crate) fn is_zip(bytes: &[u8]) -> bool {
    ZIP_MAGIC.iter().any(|magic| bytes.starts_with(magic))
}

/// Reads the one entry of the archive `bytes`.
///
/// `name` identifies the archive in error messages.
pub(crate) fn read_single_entry(name: &str, bytes: &[u8]) -> ArchiveResult<Vec<u8>> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|error| ArchiveError::UnreadableArchive {
            source: io::Error::from(error),
            name: name.to_owned(),
        })?;

    if archive.len() != 1 {
        return Err(ArchiveError::NotAFbz {
            entries: archive.len(),
            name: name.to_owned(),
        });
    }

    let mut entry = archive
        .by_index(0)
        .map_err(|error| ArchiveError::UnreadableArchive {
            source: io::Error::from(error),
            name: name.to_owned(),
        })?;
    let entry_name = entry.name().to_owned();
    let mut buf = Vec::new();

    entry
        .read_to_end(&mut buf)
        .map(|_| buf)
        .map_err(|error| ArchiveError::CannotRead {
            source: error,
            entry: entry_name,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));

        for (name, content) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_is_zip() {
        assert!(is_zip(&zip_of(&[("a.fb2", b"<FictionBook/>")])));
        assert!(!is_zip(b"<?xml version=\"1.0\"?><FictionBook/>"));
        assert!(!is_zip(b"PK"));
        // An archive without entries only holds the end of central directory record
        assert!(is_zip(&zip_of(&[])));
    }

    #[test]
    fn test_read_single_entry() {
        let bytes = zip_of(&[("book.fb2", b"<FictionBook/>")]);

        assert_eq!(b"<FictionBook/>".to_vec(), read_single_entry("book.fbz", &bytes).unwrap());
    }

    #[test]
    fn test_read_not_a_fbz() {
        #[rustfmt::skip]
        let cases: [&[(&str, &[u8])]; 2] = [
            &[],
            &[("a.fb2", b"<FictionBook/>"), ("b.fb2", b"<FictionBook/>")],
        ];

        for entries in cases {
            let bytes = zip_of(entries);

            match read_single_entry("multi.fbz", &bytes) {
                Err(ArchiveError::NotAFbz { entries: count, name }) => {
                    assert_eq!(entries.len(), count);
                    assert_eq!("multi.fbz", name);
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn test_read_corrupt_archive() {
        let result = read_single_entry("broken.fbz", b"PK\x03\x04garbage");

        assert!(matches!(result, Err(ArchiveError::UnreadableArchive { .. })));
    }
}
