//! Access to the parts of a source FB2 document required for merging.

pub(crate) mod consts;

use crate::archive;
use crate::datetime::Date;
use crate::dom::{Document, NodeId};
use crate::errors::{FormatError, MergeResult, StructureError};
use crate::parser::xml;

/// The main body and the optional notes body of a source document.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bodies {
    pub main: NodeId,
    pub notes: Option<NodeId>,
}

/// A parsed FB2 document and the name it was read from.
///
/// # Examples
/// ```
/// # use fb2merge::Fb2Source;
/// let source = Fb2Source::read(
///     "book.fb2",
///     br#"<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0">
///         <description><title-info><book-title>Dune</book-title></title-info></description>
///         <body><section><p>...</p></section></body>
///     </FictionBook>"#,
/// )?;
///
/// assert_eq!(Some("Dune".to_owned()), source.book_title());
/// assert_eq!(1, source.bodies().len());
/// # Ok::<(), fb2merge::errors::MergeError>(())
/// ```
#[derive(Clone, Debug)]
pub struct Fb2Source {
    name: String,
    document: Document,
}

impl Fb2Source {
    /// Reads a source from plain XML `bytes` or a single-entry zip archive.
    ///
    /// `name` identifies the source in logs and error messages
    /// (typically the file path).
    ///
    /// # Errors
    /// - [`ArchiveError`](crate::errors::ArchiveError):
    ///   The zip archive is malformed or does not hold exactly one entry.
    /// - [`FormatError`]: The content is not well-formed XML or the root
    ///   element is not `<FictionBook>`.
    pub fn read(name: impl Into<String>, bytes: &[u8]) -> MergeResult<Self> {
        let name = name.into();

        let document = if archive::is_zip(bytes) {
            xml::parse(&archive::read_single_entry(&name, bytes)?)?
        } else {
            xml::parse(bytes)?
        };

        Ok(Self::from_document(name, document)?)
    }

    /// Wraps an already parsed `document`.
    ///
    /// # Errors
    /// [`FormatError::UnexpectedRoot`] if the root element is not `<FictionBook>`.
    pub fn from_document(name: impl Into<String>, document: Document) -> Result<Self, FormatError> {
        let root_tag = document.tag(document.root());

        if root_tag != consts::FICTION_BOOK {
            return Err(FormatError::UnexpectedRoot(root_tag.to_owned()));
        }
        Ok(Self {
            name: name.into(),
            document,
        })
    }

    /// The name the source was read from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Top-level `<body>` elements in document order.
    pub fn bodies(&self) -> Vec<NodeId> {
        self.top_level(consts::BODY)
    }

    /// Top-level `<binary>` elements in document order.
    pub fn binaries(&self) -> Vec<NodeId> {
        self.top_level(consts::BINARY)
    }

    fn top_level(&self, tag: &str) -> Vec<NodeId> {
        let doc = &self.document;
        doc.find_children(doc.root(), tag).collect()
    }

    /// Checks that the source holds a main body optionally followed by a
    /// notes body (`<body name="notes">`).
    pub fn check_structure(&self) -> Result<Bodies, StructureError> {
        match self.bodies()[..] {
            [main] => Ok(Bodies { main, notes: None }),
            [main, notes] => match self.document.attribute(notes, consts::NAME) {
                Some(consts::NOTES) => Ok(Bodies {
                    main,
                    notes: Some(notes),
                }),
                name => Err(StructureError::UnnamedNotes(name.map(str::to_owned))),
            },
            ref bodies => Err(StructureError::BodyCount(bodies.len())),
        }
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Metadata
    ////////////////////////////////////////////////////////////////////////////////

    pub fn title_info(&self) -> Option<NodeId> {
        self.description(&[consts::TITLE_INFO])
    }

    fn description(&self, path: &[&str]) -> Option<NodeId> {
        let doc = &self.document;
        let description = doc.find_child(doc.root(), consts::DESCRIPTION)?;
        doc.select_first(description, path)
    }

    /// The text of `title-info/book-title`.
    pub fn book_title(&self) -> Option<String> {
        self.description(&[consts::TITLE_INFO, consts::BOOK_TITLE])
            .map(|title| self.document.text_content(title).trim().to_owned())
    }

    /// The `title-info/annotation` element.
    pub fn annotation(&self) -> Option<NodeId> {
        self.description(&[consts::TITLE_INFO, consts::ANNOTATION])
    }

    /// The first `title-info/coverpage/image` element.
    pub fn cover(&self) -> Option<NodeId> {
        self.description(&[consts::TITLE_INFO, consts::COVERPAGE, consts::IMAGE])
    }

    /// The publication year, searched for (in order) within:
    /// 1. `title-info/date@value`
    /// 2. `title-info/date` text
    /// 3. `publish-info/year`
    /// 4. `src-title-info/date` (value, then text)
    pub fn year(&self) -> Option<i32> {
        let doc = &self.document;
        let date_of = |node: NodeId| {
            doc.attribute(node, consts::VALUE)
                .and_then(Date::parse)
                .or_else(|| Date::parse(&doc.text_content(node)))
        };

        self.description(&[consts::TITLE_INFO, consts::DATE])
            .and_then(date_of)
            .or_else(|| {
                self.description(&[consts::PUBLISH_INFO, consts::YEAR])
                    .and_then(|year| Date::parse(&doc.text_content(year)))
            })
            .or_else(|| {
                self.description(&[consts::SRC_TITLE_INFO, consts::DATE])
                    .and_then(date_of)
            })
            .map(|date| date.year() as i32)
    }

    /// The number of the first `title-info/sequence`.
    pub fn sequence_number(&self) -> Option<u32> {
        let sequence = self.description(&[consts::TITLE_INFO, consts::SEQUENCE])?;

        self.document
            .attribute(sequence, consts::NUMBER)?
            .trim()
            .parse()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ArchiveError, MergeError};

    fn source(description: &str, bodies: &str) -> Fb2Source {
        let xml = format!(
            r#"<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink">
                <description>{description}</description>{bodies}
            </FictionBook>"#
        );
        Fb2Source::read("test.fb2", xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_read_unexpected_root() {
        let result = Fb2Source::read("test.xhtml", b"<html><body/></html>");

        assert!(matches!(
            result,
            Err(MergeError::Format(FormatError::UnexpectedRoot(root))) if root == "html"
        ));
    }

    #[test]
    fn test_read_empty_archive() {
        // End of central directory record with no entries
        let mut empty = b"PK\x05\x06".to_vec();
        empty.resize(22, 0);

        let result = Fb2Source::read("empty.fbz", &empty);

        assert!(matches!(
            result,
            Err(MergeError::Archive(ArchiveError::NotAFbz { entries: 0, .. }))
        ));
    }

    #[test]
    fn test_check_structure() {
        #[rustfmt::skip]
        let expected = [
            (Ok(None), "<body/>"),
            (Ok(Some(())), r#"<body/><body name="notes"/>"#),
            (Err(StructureError::BodyCount(0)), ""),
            (Err(StructureError::BodyCount(3)), "<body/><body/><body/>"),
            (Err(StructureError::UnnamedNotes(None)), "<body/><body/>"),
            (Err(StructureError::UnnamedNotes(Some("comments".to_owned()))), r#"<body/><body name="comments"/>"#),
        ];

        for (expected, bodies) in expected {
            let source = source("", bodies);
            let result = source.check_structure().map(|bodies| bodies.notes.map(|_| ()));

            assert_eq!(expected, result, "{bodies}");
        }
    }

    #[test]
    fn test_metadata() {
        let source = source(
            r##"<title-info>
                <book-title> Dune </book-title>
                <annotation><p>Desert planet</p></annotation>
                <coverpage><image l:href="#cover.jpg"/></coverpage>
                <sequence name="Dune" number="2"/>
            </title-info>"##,
            "<body/>",
        );
        let doc = source.document();

        assert_eq!(Some("Dune".to_owned()), source.book_title());
        assert_eq!(Some(2), source.sequence_number());
        assert_eq!("annotation", doc.tag(source.annotation().unwrap()));
        assert_eq!(Some("#cover.jpg"), doc.attribute(source.cover().unwrap(), consts::HREF));
    }

    #[test]
    fn test_year() {
        #[rustfmt::skip]
        let expected = [
            (Some(1965), r#"<title-info><date value="1965-08-01">August 1965</date></title-info>"#),
            (Some(1965), "<title-info><date>1965</date></title-info>"),
            (Some(1984), "<title-info/><publish-info><year>1984</year></publish-info>"),
            (Some(1984), r#"<title-info><date>unknown</date></title-info><publish-info><year>1984</year></publish-info>"#),
            (Some(1899), "<title-info/><src-title-info><date>1899</date></src-title-info>"),
            (None, "<title-info><date>n/a</date></title-info>"),
            (None, ""),
        ];

        for (expected, description) in expected {
            assert_eq!(expected, source(description, "<body/>").year(), "{description}");
        }
    }
}
