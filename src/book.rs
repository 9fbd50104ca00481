//! Assembly of the merged book.
//!
//! A [`BookCreator`] accumulates one section per source document in
//! [`BookKey`] order. [`BookCreator::finish`] consumes the creator, running
//! the finishing pass exactly once and producing a serializable [`MergedBook`].

mod finish;

use crate::datetime::DateTime;
use crate::dom::{Document, NodeId};
use crate::errors::MergeResult;
use crate::fb2::consts;
use crate::merge::MergeOptions;
use crate::section;
use crate::stats::BookStats;
use crate::validate::{ValidationOutcome, Validator};
use crate::writer::xml::XmlWriter;
use crate::writer::zip::{self, EntryWriter};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The publication year of a book.
///
/// [`Unknown`](Self::Unknown) sorts after every known year.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Year {
    Known(i32),
    Unknown,
}

/// Sort key of a book within the merged body.
///
/// Keys compare by year, then sequence number (absent first), then title.
///
/// # Examples
/// ```
/// # use fb2merge::book::{BookKey, Year};
/// let dune = BookKey::new(Year::Known(1965), None, "Dune".to_owned());
/// let messiah = BookKey::new(Year::Known(1969), None, "Dune Messiah".to_owned());
/// let unknown = BookKey::new(Year::Unknown, None, "A".to_owned());
///
/// assert!(dune < messiah);
/// assert!(messiah < unknown);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BookKey {
    year: Year,
    sequence: Option<u32>,
    title: String,
}

impl BookKey {
    pub fn new(year: Year, sequence: Option<u32>, title: String) -> Self {
        Self {
            year,
            sequence,
            title,
        }
    }

    pub fn year(&self) -> Year {
        self.year
    }

    pub fn sequence(&self) -> Option<u32> {
        self.sequence
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

/// The key of a processed document and the reference targets it emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookInfo {
    key: BookKey,
    refs: HashSet<String>,
}

impl BookInfo {
    pub fn new(key: BookKey, refs: impl IntoIterator<Item = String>) -> Self {
        Self {
            key,
            refs: refs.into_iter().collect(),
        }
    }

    pub fn key(&self) -> &BookKey {
        &self.key
    }

    /// Returns `true` if the document references the (rebuilt) identifier `id`.
    pub fn refers(&self, id: &str) -> bool {
        self.refs.contains(id)
    }
}

/// A merged book that is still accumulating sections.
#[derive(Clone, Debug)]
pub struct BookCreator {
    document: Document,
    description: NodeId,
    main: NodeId,
    title: String,
    keys: Vec<BookKey>,
    /// Detached notes of each book, parallel to `keys`.
    notes: Vec<Vec<NodeId>>,
}

impl BookCreator {
    /// Creates an empty book; the main body is titled `title`.
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        let mut document = Document::new(consts::FICTION_BOOK);
        let root = document.root();
        let description = document.create_element(consts::DESCRIPTION);
        let main = document.create_element(consts::BODY);
        let main_title = section::new_title(&mut document, &title);

        document.append(root, description);
        document.append(root, main);
        document.append(main, main_title);

        Self {
            document,
            description,
            main,
            title,
            keys: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// The number of inserted books.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The keys of the inserted books, in order.
    pub fn keys(&self) -> &[BookKey] {
        &self.keys
    }

    /// Imports `section` and `notes` from `source`, placing the section
    /// after every book with a key less than or equal to `key`.
    ///
    /// Returns the zero-based position of the inserted book.
    pub fn insert_book(
        &mut self,
        key: BookKey,
        source: &Document,
        section: NodeId,
        notes: &[NodeId],
    ) -> usize {
        let position = self.keys.partition_point(|existing| *existing <= key);
        let section = self.import(source, section);
        let notes = notes.iter().map(|&note| self.import(source, note)).collect();

        self.keys.insert(position, key);
        // The body title precedes every section
        self.document.insert(self.main, position + 1, section);
        self.notes.insert(position, notes);
        position
    }

    /// Imports `binary` from `source` as the last child of the root.
    pub fn add_binary(&mut self, source: &Document, binary: NodeId) {
        let binary = self.import(source, binary);
        let root = self.document.root();
        self.document.append(root, binary);
    }

    fn import(&mut self, source: &Document, node: NodeId) -> NodeId {
        let copy = self.document.import(source, node);
        self.document.set_tail(copy, None);
        copy
    }

    /// Finishes the book using [`MergeOptions::default`].
    pub fn finish(self, stats: &BookStats) -> MergedBook {
        self.finish_with(stats, &MergeOptions::default())
    }

    /// Runs the finishing pass:
    /// 1. The merged `title-info` (and `src-title-info`) open the description.
    /// 2. A new `document-info` closes the description.
    /// 3. Notes are renumbered in book order.
    /// 4. References within the main body are renumbered (notes) or
    ///    removed when their target no longer exists.
    /// 5. Unreferenced identifiers are stripped from the main body.
    /// 6. Notes are placed in `<body name="notes">` after the main body.
    ///
    /// # Panics
    /// If an unreferenced identifier remains on an element that cannot
    /// lose it (see [`consts::STRIPPABLE_ID`]).
    pub fn finish_with(self, stats: &BookStats, options: &MergeOptions) -> MergedBook {
        let (finished_at, timestamp) = match options.config().timestamp {
            Some(timestamp) => (DateTime::from_unix(timestamp), timestamp),
            None => DateTime::now(),
        };
        let mut finisher = finish::Finisher::new(self);

        finisher.add_title_info(stats);
        finisher.add_document_info(stats, options, finished_at, timestamp);
        finisher.number_notes();
        finisher.resolve_references();
        finisher.strip_ids();

        MergedBook {
            document: finisher.into_document(),
            finished_at,
        }
    }
}

/// A finished merged book.
#[derive(Clone, Debug)]
pub struct MergedBook {
    document: Document,
    finished_at: DateTime,
}

impl MergedBook {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn validate(&self, validator: &dyn Validator) -> ValidationOutcome {
        validator.validate(&self.document)
    }

    /// Writes the book as pretty-printed UTF-8 XML to `writer`.
    pub fn write<W: Write>(&self, writer: W) -> MergeResult<W> {
        let mut writer = XmlWriter::new(writer);
        writer
            .write_utf8_declaration()?
            .write_document(&self.document)?;
        Ok(writer.into_inner())
    }

    /// Generates the XML as a byte [`Vec`].
    pub fn to_vec(&self) -> MergeResult<Vec<u8>> {
        self.write(Vec::new())
    }

    /// Writes the book as a single-entry zip archive to `writer`.
    ///
    /// The entry name and compression level are taken from `options`.
    pub fn write_zip<W: Write>(&self, writer: W, options: &MergeOptions) -> MergeResult<W> {
        let config = options.config();
        let entry_options = zip::entry_options(config.compression, self.finished_at);
        let mut entry = EntryWriter::start(writer, &config.entry_name, entry_options)?;

        self.write(&mut entry)?;
        entry.finish()
    }

    /// Saves the book to `path`, returning the path written to.
    ///
    /// The extension (`.fb2`, or `.fb2.zip` when [`MergeOptions::zip`] is set)
    /// is appended unless `path` already ends with it.
    pub fn save(&self, path: impl AsRef<Path>, options: &MergeOptions) -> MergeResult<PathBuf> {
        const TEMP: &str = "fb2merge.tmp";

        let path = output_path(path.as_ref(), options.is_zip());
        let temp = path.with_extension(TEMP);

        let write_result = (|| {
            let file = std::fs::File::create(&temp)?;
            let mut buf = std::io::BufWriter::new(file);

            if options.is_zip() {
                self.write_zip(&mut buf, options)?;
            } else {
                self.write(&mut buf)?;
            }

            // Write the remaining bytes to file
            buf.flush()?;
            std::fs::rename(&temp, &path)?;
            Ok(())
        })();

        if let Err(error) = write_result {
            // Attempt to remove the temp file
            let _ = std::fs::remove_file(&temp);
            // Original error takes precedence
            return Err(error);
        }
        Ok(path)
    }
}

fn output_path(path: &Path, zip: bool) -> PathBuf {
    let extension = if zip { ".fb2.zip" } else { ".fb2" };

    if path.to_string_lossy().ends_with(extension) {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_owned();
    name.push(extension);
    PathBuf::from(name)
}
