//! Error-related types for merging FB2 documents.

pub use crate::validate::ValidationError;
use std::error::Error;
use std::io;
use std::str::Utf8Error;

/// Alias for `Result<T, MergeError>`.
pub type MergeResult<T> = Result<T, MergeError>;

/// Alias for `Result<T, FormatError>`.
pub type FormatResult<T> = Result<T, FormatError>;

/// Alias for `Result<T, ArchiveError>`.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Unified error type.
///
/// # Skipping
/// When a merge is driven by [`Merger`](crate::Merger), documents failing with
/// [`Archive`](MergeError::Archive), [`Format`](MergeError::Format),
/// [`Structure`](MergeError::Structure) or, when sources are validated,
/// [`Invalid`](MergeError::Invalid) are logged and skipped.
/// Every other variant is propagated to the caller.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum MergeError {
    /// An input container (`.fbz`, `.fb2.zip`) is malformed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// An input document is not well-formed XML.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// An input document does not have the shape required for merging.
    #[error(transparent)]
    Structure(#[from] StructureError),

    /// A required metadata block (e.g., `<title-info>`) is absent.
    #[error("Required metadata block is missing: <{0}>")]
    MissingMetadata(&'static str),

    /// A document does not pass validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// An IO exception occurred during reading or writing.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl MergeError {
    /// Returns `true` if the error concerns a single malformed input document
    /// that can be skipped without affecting the rest of a merge.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            Self::Archive(_) | Self::Format(_) | Self::Structure(_) | Self::Invalid(_)
        )
    }
}

/// Possible errors when reading XML content.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    /// Content unexpectedly causes an internal parser error.
    ///
    /// This originates from malformed content, such as improper XML.
    #[error(transparent)]
    Unparsable(#[from] Box<dyn Error + Send + Sync + 'static>),

    /// Content is not valid UTF-8.
    #[error("Content is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] Utf8Error),

    /// The content contains no root element.
    #[error("Document contains no root element")]
    NoRootElement,

    /// The root element is not `<FictionBook>`.
    #[error("Unexpected root element <{0}>; expected <FictionBook>")]
    UnexpectedRoot(String),
}

/// Possible errors from an input container.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    /// The archive itself is unreadable due to an unsupported or malformed state.
    #[error("[UnreadableArchive - `{name}`]: {source}")]
    UnreadableArchive {
        /// The root cause of this error.
        source: io::Error,
        /// The source name responsible for triggering the error.
        name: String,
    },

    /// The archive does not hold exactly one entry.
    #[error("[NotAFbz - `{name}`]: expected exactly one archive entry, found {entries}")]
    NotAFbz {
        /// The number of entries found.
        entries: usize,
        /// The source name responsible for triggering the error.
        name: String,
    },

    /// The single entry exists, although is unable to be read.
    #[error("[CannotRead - `{entry}`]: {source}")]
    CannotRead {
        /// The root cause of the error.
        source: io::Error,
        /// The entry responsible for triggering the error.
        entry: String,
    },
}

/// Possible structural mismatches of an input document.
#[non_exhaustive]
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum StructureError {
    /// A document must contain one or two `<body>` elements.
    #[error("Document has {0} bodies; expected 1 or 2")]
    BodyCount(usize),

    /// The second `<body>` of a document is not the notes body.
    #[error("Second body is not [notes] (name = {0:?})")]
    UnnamedNotes(Option<String>),

    /// The leading structural prefix of a section holds more than one `<title>`.
    #[error("Section prefix contains {0} titles; expected at most 1")]
    MultipleTitles(usize),

    /// A section cannot be rebuilt without a title.
    #[error("Cannot rebuild a section without a title")]
    MissingTitle,
}
