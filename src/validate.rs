//! Validation of FB2 documents.
//!
//! A [`Validator`] reports every problem it finds as a [`ValidationIssue`]
//! instead of stopping at the first one.
//! [`StructuralValidator`] checks the parts of the FictionBook schema that
//! merging relies on; it is not a complete XSD validator.

use crate::dom::{Document, NodeId};
use crate::fb2::consts;
use std::collections::HashSet;
use std::fmt::Display;

/// A single problem found within a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    path: String,
    message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The location of the offending element (e.g., `/FictionBook/description`).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The result of [`Validator::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    /// Contains at least one issue.
    Invalid(Vec<ValidationIssue>),
}

impl ValidationOutcome {
    /// [`Valid`](Self::Valid) if `issues` is empty.
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        if issues.is_empty() {
            Self::Valid
        } else {
            Self::Invalid(issues)
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            Self::Valid => &[],
            Self::Invalid(issues) => issues,
        }
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(issues) => Err(ValidationError { issues }),
        }
    }
}

/// A document does not pass validation.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Document is invalid: {}", summarize(.issues))]
pub struct ValidationError {
    issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    match issues {
        [] => "no issues".to_owned(),
        [issue] => issue.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}

/// Capability to check a [`Document`].
pub trait Validator {
    fn validate(&self, document: &Document) -> ValidationOutcome;

    /// Same as [`Self::validate`], with an invalid outcome as an error.
    fn validate_strict(&self, document: &Document) -> Result<(), ValidationError> {
        self.validate(document).into_result()
    }
}

/// Checks the required FB2 structure:
/// - `<FictionBook>` root
/// - `description/title-info` with `genre`, `author`, `book-title` and `lang`
/// - `description/document-info` with `author`, `program-used`, `date`, `id` and `version`
/// - at least one `<body>`
/// - unique `id` attributes
/// - every `#` reference resolves to an `id`
///
/// # Examples
/// ```
/// # use fb2merge::parser::xml::parse;
/// use fb2merge::validate::{StructuralValidator, Validator};
///
/// let document = parse(b"<FictionBook><body/></FictionBook>")?;
/// let outcome = StructuralValidator.validate(&document);
///
/// assert!(!outcome.is_valid());
/// assert_eq!("/FictionBook", outcome.issues()[0].path());
/// # Ok::<(), fb2merge::errors::FormatError>(())
/// ```
#[derive(Copy, Clone, Debug, Default)]
pub struct StructuralValidator;

impl StructuralValidator {
    fn check_required(
        document: &Document,
        node: Option<NodeId>,
        path: &str,
        children: &[&str],
        issues: &mut Vec<ValidationIssue>,
    ) {
        let Some(node) = node else {
            return;
        };
        for &child in children {
            if document.find_child(node, child).is_none() {
                issues.push(ValidationIssue::new(path, format!("missing <{child}>")));
            }
        }
    }
}

impl Validator for StructuralValidator {
    fn validate(&self, document: &Document) -> ValidationOutcome {
        let mut issues = Vec::new();
        let root = document.root();
        let root_path = format!("/{}", document.tag(root));

        if !document.is(root, consts::FICTION_BOOK) {
            issues.push(ValidationIssue::new(&root_path, "root element is not <FictionBook>"));
        }

        let description = document.find_child(root, consts::DESCRIPTION);
        let description_path = format!("{root_path}/{}", consts::DESCRIPTION);
        if let Some(description) = description {
            for (tag, children) in [
                (
                    consts::TITLE_INFO,
                    &[consts::GENRE, consts::AUTHOR, consts::BOOK_TITLE, consts::LANG][..],
                ),
                (
                    consts::DOCUMENT_INFO,
                    &[
                        consts::AUTHOR,
                        consts::PROGRAM_USED,
                        consts::DATE,
                        consts::DOCUMENT_ID,
                        consts::VERSION,
                    ][..],
                ),
            ] {
                let block = document.find_child(description, tag);
                let block_path = format!("{description_path}/{tag}");

                if block.is_none() {
                    issues.push(ValidationIssue::new(&description_path, format!("missing <{tag}>")));
                }
                Self::check_required(document, block, &block_path, children, &mut issues);
            }
        } else {
            issues.push(ValidationIssue::new(&root_path, "missing <description>"));
        }

        if document.find_child(root, consts::BODY).is_none() {
            issues.push(ValidationIssue::new(&root_path, "missing <body>"));
        }

        let mut ids = HashSet::new();
        for node in document.descendants(root) {
            if let Some(id) = document.attribute(node, consts::ID)
                && !ids.insert(id)
            {
                issues.push(ValidationIssue::new(
                    format!("<{}>", document.tag(node)),
                    format!("duplicate id `{id}`"),
                ));
            }
        }
        for node in document.descendants(root) {
            if let Some(target) = document
                .attribute(node, consts::HREF)
                .and_then(|href| href.strip_prefix('#'))
                && !ids.contains(target)
            {
                issues.push(ValidationIssue::new(
                    format!("<{}>", document.tag(node)),
                    format!("reference to missing id `{target}`"),
                ));
            }
        }
        for binary in document.find_children(root, consts::BINARY) {
            if document.attribute(binary, consts::ID).is_none() {
                issues.push(ValidationIssue::new(
                    format!("{root_path}/{}", consts::BINARY),
                    "missing `id` attribute",
                ));
            }
        }

        ValidationOutcome::from_issues(issues)
    }
}
