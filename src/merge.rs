//! Driving a merge from source documents to a finished book.

use crate::book::{BookCreator, MergedBook};
use crate::dom::NodeId;
use crate::errors::{MergeError, MergeResult};
use crate::fb2::{Fb2Source, consts};
use crate::section::{FrontMatter, Section};
use crate::stats::BookStats;
use crate::validate::{StructuralValidator, ValidationOutcome, Validator};
use log::{debug, error, info, warn};
use std::path::Path;

/// Configuration of a merge and of the saved output.
///
/// # Examples
/// ```
/// # use fb2merge::MergeOptions;
/// let mut options = MergeOptions::default();
///
/// options
///     .user("librarian")
///     .zip(true)
///     .compression(9);
///
/// assert!(options.is_zip());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeOptions {
    config: MergeConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MergeConfig {
    pub(crate) user: String,
    pub(crate) program_name: String,
    pub(crate) timestamp: Option<i64>,
    pub(crate) validate_sources: bool,
    pub(crate) zip: bool,
    pub(crate) compression: u8,
    pub(crate) entry_name: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            user: "anonymous".to_owned(),
            program_name: consts::PROGRAM_NAME.to_owned(),
            timestamp: None,
            validate_sources: false,
            zip: false,
            compression: 6,
            entry_name: "book.fb2".to_owned(),
        }
    }
}

impl MergeOptions {
    pub(crate) fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Returns `true` if the book is saved as a zip archive.
    pub fn is_zip(&self) -> bool {
        self.config.zip
    }

    /// Returns `true` if sources are validated before they are merged.
    pub fn is_validating_sources(&self) -> bool {
        self.config.validate_sources
    }

    /// Sets the nickname recorded as the author of `document-info`.
    ///
    /// Default: `anonymous`
    pub fn user(&mut self, user: impl Into<String>) -> &mut Self {
        self.config.user = user.into();
        self
    }

    /// Sets the value of `document-info/program-used`.
    ///
    /// Default: `fb2merge`
    pub fn program_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.config.program_name = name.into();
        self
    }

    /// Sets the UNIX timestamp (seconds) recorded as the finishing time,
    /// which determines `document-info/date` and `document-info/version`.
    ///
    /// Default: [`None`] (the current time)
    pub fn timestamp(&mut self, timestamp: Option<i64>) -> &mut Self {
        self.config.timestamp = timestamp;
        self
    }

    /// When set to `true`, every source document must pass validation
    /// before it is merged; invalid sources are skipped.
    ///
    /// Default: `false`
    pub fn validate_sources(&mut self, validate: bool) -> &mut Self {
        self.config.validate_sources = validate;
        self
    }

    /// When set to `true`, the book is saved as a single-entry zip archive
    /// (`.fb2.zip`).
    ///
    /// Default: `false`
    pub fn zip(&mut self, zip: bool) -> &mut Self {
        self.config.zip = zip;
        self
    }

    /// Sets the *deflate* compression level of a zipped book.
    ///
    /// The given compression level must be within the range `[0, 9]`.
    /// If the level is greater than the maximum bound, it is set to `9`.
    /// A compression level of `0` equates to no compression.
    ///
    /// Default: `6`
    pub fn compression(&mut self, level: u8) -> &mut Self {
        self.config.compression = level.min(9);
        self
    }

    /// Sets the name of the archive entry holding a zipped book.
    ///
    /// Default: `book.fb2`
    pub fn entry_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.config.entry_name = name.into();
        self
    }
}

/// Merges source documents one at a time into a single book.
///
/// Sources that are malformed or structurally unsuitable are logged and
/// skipped; see [`MergeError::is_skippable`].
///
/// # Examples
/// ```no_run
/// # use fb2merge::{Merger, MergeOptions};
/// # fn main() -> fb2merge::errors::MergeResult<()> {
/// let mut merger = Merger::new("Collected Stories", MergeOptions::default());
///
/// for path in ["one.fb2", "two.fbz"] {
///     merger.add_file(path)?;
/// }
///
/// let (book, outcome) = merger.finish();
/// if outcome.is_valid() {
///     book.save("collected", &MergeOptions::default())?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Merger {
    options: MergeOptions,
    validator: Box<dyn Validator>,
    creator: BookCreator,
    stats: BookStats,
    /// The position assigned to the next source.
    ordinal: usize,
    skipped: usize,
}

impl Merger {
    /// Creates a merger for a book titled `title`, validating with
    /// [`StructuralValidator`].
    pub fn new(title: impl Into<String>, options: MergeOptions) -> Self {
        Self {
            options,
            validator: Box::new(StructuralValidator),
            creator: BookCreator::new(title),
            stats: BookStats::new(),
            ordinal: 0,
            skipped: 0,
        }
    }

    /// Replaces the validator used for sources and for the finished book.
    pub fn validator(&mut self, validator: impl Validator + 'static) -> &mut Self {
        self.validator = Box::new(validator);
        self
    }

    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// The number of merged sources.
    pub fn merged(&self) -> usize {
        self.creator.len()
    }

    /// The number of skipped sources.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Reads and merges the file at `path`.
    ///
    /// Returns `false` if the file was skipped.
    ///
    /// # Errors
    /// - [`MergeError::Io`]: The file cannot be read.
    /// - [`MergeError::MissingMetadata`]: See [`Self::add_source`].
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> MergeResult<bool> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;

        self.add_bytes(path.display().to_string(), &bytes)
    }

    /// Reads and merges `bytes` (plain XML or a single-entry zip archive).
    ///
    /// Returns `false` if the source was skipped.
    pub fn add_bytes(&mut self, name: impl Into<String>, bytes: &[u8]) -> MergeResult<bool> {
        let name = name.into();

        match Fb2Source::read(name.as_str(), bytes) {
            Ok(source) => self.add_source(source),
            Err(error) if error.is_skippable() => {
                self.skip(&name, &error);
                Ok(false)
            }
            Err(error) => Err(error),
        }
    }

    /// Merges `source`.
    ///
    /// Returns `false` if the source was skipped because of its structure
    /// (see [`StructureError`](crate::errors::StructureError)) or because it
    /// failed validation.
    ///
    /// # Errors
    /// [`MergeError::MissingMetadata`] if `source` lacks `title-info` or a
    /// book title.
    pub fn add_source(&mut self, mut source: Fb2Source) -> MergeResult<bool> {
        let ordinal = self.ordinal;
        self.ordinal += 1;

        let bodies = match source.check_structure().and_then(|bodies| {
            Section::check(source.document(), bodies.main).map(|_| bodies)
        }) {
            Ok(bodies) => bodies,
            Err(error) => {
                self.skip(source.name(), &MergeError::from(error));
                return Ok(false);
            }
        };

        if self.options.config().validate_sources
            && let Err(error) = self.validator.validate_strict(source.document())
        {
            for issue in error.issues() {
                debug!("{}: {issue}", source.name());
            }
            self.skip(source.name(), &MergeError::from(error));
            return Ok(false);
        }

        let book_info = self.stats.process(&mut source, ordinal)?;
        let front = FrontMatter::from_source(&source);
        let section = Section::parse(source.document(), bodies.main)?
            .rebuild_section(source.document_mut(), &front)?;
        let notes = bodies
            .notes
            .map(|notes| self.collect_notes(&source, notes))
            .unwrap_or_default();

        let position = self
            .creator
            .insert_book(book_info.key().clone(), source.document(), section, &notes);

        for binary in source.binaries() {
            let id = source.document().attribute(binary, consts::ID).unwrap_or_default();

            if book_info.refers(id) {
                self.creator.add_binary(source.document(), binary);
            } else {
                info!("Skipping binary {id} of {}", source.name());
            }
        }

        debug!(
            "Merged {} as book #{ordinal} at position {position}: {:?}",
            source.name(),
            book_info.key(),
        );
        Ok(true)
    }

    /// The note sections of the notes body.
    ///
    /// A leading `<title>` is ignored; any other non-section child is
    /// reported and ignored.
    fn collect_notes(&self, source: &Fb2Source, notes: NodeId) -> Vec<NodeId> {
        let doc = source.document();

        doc.children(notes)
            .iter()
            .enumerate()
            .filter(|&(position, &child)| {
                let tag = doc.tag(child);
                let is_section = tag == consts::SECTION;

                if !is_section && (position > 0 || tag != consts::TITLE) {
                    warn!("Wrong note: <{tag}> in {}", source.name());
                }
                is_section
            })
            .map(|(_, &child)| child)
            .collect()
    }

    fn skip(&mut self, name: &str, error: &MergeError) {
        match error {
            MergeError::Structure(_) => error!("Skipping {name}: {error}"),
            _ => warn!("Skipping {name}: {error}"),
        }
        self.skipped += 1;
    }

    /// Finishes the book, returning it along with its validation outcome.
    pub fn finish(self) -> (MergedBook, ValidationOutcome) {
        info!(
            "Finishing book with {} merged and {} skipped sources",
            self.merged(),
            self.skipped,
        );

        let book = self.creator.finish_with(&self.stats, &self.options);
        let outcome = book.validate(self.validator.as_ref());
        (book, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::validate::ValidationIssue;

    #[test]
    fn test_options() {
        let mut options = MergeOptions::default();

        options
            .user("tester")
            .program_name("merge-test")
            .timestamp(Some(0))
            .validate_sources(true)
            .zip(true)
            .compression(20)
            .entry_name("merged.fb2");

        let config = options.config();
        assert_eq!("tester", config.user);
        assert_eq!("merge-test", config.program_name);
        assert_eq!(Some(0), config.timestamp);
        assert_eq!(9, config.compression);
        assert_eq!("merged.fb2", config.entry_name);
        assert!(options.is_zip());
        assert!(options.is_validating_sources());
    }

    #[test]
    fn test_skip_malformed() {
        let mut merger = Merger::new("Omnibus", MergeOptions::default());

        #[rustfmt::skip]
        let inputs: [&[u8]; 4] = [
            b"<FictionBook><body>",
            b"<html/>",
            b"PK\x03\x04broken",
            b"<FictionBook><description><title-info><book-title>T</book-title></title-info></description></FictionBook>",
        ];

        for (i, bytes) in inputs.into_iter().enumerate() {
            assert!(!merger.add_bytes(format!("{i}.fb2"), bytes).unwrap());
        }
        assert_eq!(4, merger.skipped());
        assert_eq!(0, merger.merged());
    }

    struct RejectAll;

    impl Validator for RejectAll {
        fn validate(&self, _document: &Document) -> ValidationOutcome {
            ValidationOutcome::Invalid(vec![ValidationIssue::new("/FictionBook", "rejected")])
        }
    }

    #[test]
    fn test_skip_invalid_source() {
        let source = b"<FictionBook><description><title-info><book-title>T</book-title></title-info></description><body><section><p>x</p></section></body></FictionBook>";
        let mut options = MergeOptions::default();
        options.validate_sources(true);

        let mut merger = Merger::new("Omnibus", options);
        merger.validator(RejectAll);

        assert!(!merger.add_bytes("rejected.fb2", source).unwrap());
        assert_eq!(1, merger.skipped());
        assert_eq!(0, merger.merged());
    }

    #[test]
    fn test_invalid_is_skippable() {
        let error = RejectAll
            .validate_strict(&Document::new("FictionBook"))
            .unwrap_err();

        assert!(MergeError::from(error).is_skippable());
        assert!(!MergeError::MissingMetadata("title-info").is_skippable());
    }

    #[test]
    fn test_missing_title_info_propagates() {
        let mut merger = Merger::new("Omnibus", MergeOptions::default());
        let result = merger.add_bytes("no-title.fb2", b"<FictionBook><body><p>x</p></body></FictionBook>");

        assert!(matches!(result, Err(MergeError::MissingMetadata("title-info"))));
    }
}
