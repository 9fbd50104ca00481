//! Accumulation of the metadata of every merged document.
//!
//! Each [`Collector`] folds one metadata block of a document
//! (e.g., `<title-info>`) into a de-duplicated running set,
//! later written out as a single merged block.

mod sources;
mod title_info;

use crate::book::{BookInfo, BookKey, Year};
use crate::dom::{Document, NodeId};
use crate::errors::{MergeError, MergeResult};
use crate::fb2::{Fb2Source, consts};
use crate::rebind;
use sources::Sources;
use title_info::TitleInfo;

const TITLE_INFO: &[&str] = &[consts::DESCRIPTION, consts::TITLE_INFO];
const SRC_TITLE_INFO: &[&str] = &[consts::DESCRIPTION, consts::SRC_TITLE_INFO];
const SRC_URL: &[&str] = &[consts::DESCRIPTION, consts::DOCUMENT_INFO, consts::SRC_URL];
const SRC_OCR: &[&str] = &[consts::DESCRIPTION, consts::DOCUMENT_INFO, consts::SRC_OCR];

#[derive(Clone, Debug)]
enum CollectorKind {
    TitleInfo(TitleInfo),
    SourceUrl(Sources),
    SourceOcr(Sources),
}

/// Folds one metadata block of each added document.
///
/// A *required* collector fails when the block is absent from a document;
/// an optional one skips the document.
#[derive(Clone, Debug)]
pub struct Collector {
    path: &'static [&'static str],
    required: bool,
    count: usize,
    /// Owns copies of the collected nodes, as source documents do not outlive a merge step.
    store: Document,
    kind: CollectorKind,
}

impl Collector {
    fn new(path: &'static [&'static str], required: bool, kind: CollectorKind) -> Self {
        Self {
            path,
            required,
            count: 0,
            store: Document::new("store"),
            kind,
        }
    }

    /// Collects `description/title-info` (required).
    pub fn title_info() -> Self {
        Self::new(TITLE_INFO, true, CollectorKind::TitleInfo(TitleInfo::default()))
    }

    /// Collects `description/src-title-info`.
    pub fn src_title_info() -> Self {
        Self::new(SRC_TITLE_INFO, false, CollectorKind::TitleInfo(TitleInfo::default()))
    }

    /// Collects `description/document-info/src-url`.
    pub fn src_url() -> Self {
        Self::new(SRC_URL, false, CollectorKind::SourceUrl(Sources::default()))
    }

    /// Collects `description/document-info/src-ocr`.
    pub fn src_ocr() -> Self {
        Self::new(SRC_OCR, false, CollectorKind::SourceOcr(Sources::default()))
    }

    /// The name of the collected block (e.g., `title-info`).
    pub fn tag(&self) -> &'static str {
        self.path.last().copied().unwrap_or_default()
    }

    /// Returns `true` if no document contributed to this collector.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Folds the block of `document` into this collector.
    ///
    /// # Errors
    /// [`MergeError::MissingMetadata`] if the collector is required and the
    /// block is absent.
    pub fn add(&mut self, document: &Document) -> MergeResult<()> {
        let found = document.select(document.root(), self.path);

        let Some(&first) = found.first() else {
            return match self.required {
                true => Err(MergeError::MissingMetadata(self.tag())),
                false => Ok(()),
            };
        };

        self.count += 1;

        match &mut self.kind {
            CollectorKind::TitleInfo(info) => {
                for &child in document.children(first) {
                    info.process(&mut self.store, document, child);
                }
            }
            CollectorKind::SourceUrl(sources) | CollectorKind::SourceOcr(sources) => {
                for node in found {
                    sources.process(&mut self.store, document, node);
                }
            }
        }
        Ok(())
    }

    /// Creates the merged nodes within `target`, returned detached.
    ///
    /// Nothing is created when no document contributed.
    pub fn write(&self, target: &mut Document, book_title: &str) -> Vec<NodeId> {
        if self.is_empty() {
            return Vec::new();
        }

        match &self.kind {
            CollectorKind::TitleInfo(info) => {
                vec![info.write(&self.store, target, self.tag(), book_title)]
            }
            CollectorKind::SourceUrl(sources) => sources.write_each(&self.store, target),
            CollectorKind::SourceOcr(sources) => sources
                .write_joined(&self.store, target)
                .into_iter()
                .collect(),
        }
    }
}

/// The metadata collectors of a merge.
#[derive(Clone, Debug)]
pub struct BookStats {
    title_info: Collector,
    src_title_info: Collector,
    src_url: Collector,
    src_ocr: Collector,
}

impl BookStats {
    pub fn new() -> Self {
        Self {
            title_info: Collector::title_info(),
            src_title_info: Collector::src_title_info(),
            src_url: Collector::src_url(),
            src_ocr: Collector::src_ocr(),
        }
    }

    /// Records the metadata of `source` and then [rebinds](rebind::rebind)
    /// its identifiers for position `ordinal`.
    ///
    /// # Errors
    /// [`MergeError::MissingMetadata`] if `source` lacks `title-info` or
    /// `title-info/book-title`. Nothing is recorded in that case.
    pub fn process(&mut self, source: &mut Fb2Source, ordinal: usize) -> MergeResult<BookInfo> {
        if source.title_info().is_none() {
            return Err(MergeError::MissingMetadata(consts::TITLE_INFO));
        }
        let title = source
            .book_title()
            .ok_or(MergeError::MissingMetadata(consts::BOOK_TITLE))?;

        self.title_info.add(source.document())?;
        self.src_title_info.add(source.document())?;
        self.src_url.add(source.document())?;
        self.src_ocr.add(source.document())?;

        let key = BookKey::new(
            source.year().map_or(Year::Unknown, Year::Known),
            source.sequence_number(),
            title,
        );
        let refs = rebind::rebind(source.document_mut(), ordinal);

        Ok(BookInfo::new(key, refs))
    }

    pub fn title_info(&self) -> &Collector {
        &self.title_info
    }

    pub fn src_title_info(&self) -> &Collector {
        &self.src_title_info
    }

    pub fn src_url(&self) -> &Collector {
        &self.src_url
    }

    pub fn src_ocr(&self) -> &Collector {
        &self.src_ocr
    }
}

impl Default for BookStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Hash identifying an element (such as `<author>`) by the text of its
/// children regardless of their order.
///
/// Children are stably sorted by tag; the direct text of each
/// (`"|"` when empty) is fed to MD5.
pub(crate) fn content_hash(document: &Document, node: NodeId) -> String {
    let mut children = document.children(node).to_vec();
    children.sort_by(|a, b| document.tag(*a).cmp(document.tag(*b)));

    let mut context = md5::Context::new();
    for child in children {
        match document.text(child).filter(|text| !text.is_empty()) {
            Some(text) => context.consume(text),
            None => context.consume("|"),
        }
    }
    format!("{:x}", context.compute())
}

/// Copies `node` from `source` into `store` without its tail.
fn keep(store: &mut Document, source: &Document, node: NodeId) -> NodeId {
    let copy = store.import(source, node);
    store.set_tail(copy, None);
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xml::parse;

    fn document(description: &str) -> Document {
        parse(
            format!("<FictionBook><description>{description}</description><body/></FictionBook>")
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_content_hash() {
        let doc = parse(
            b"<authors>\
                <author><first-name>Frank</first-name><last-name>Herbert</last-name></author>\
                <author><last-name>Herbert</last-name><first-name>Frank</first-name></author>\
                <author><first-name>Brian</first-name><last-name>Herbert</last-name></author>\
                <author><first-name/><last-name>Herbert</last-name></author>\
            </authors>",
        )
        .unwrap();
        let [a, b, c, d] = doc.children(doc.root()) else {
            panic!("expected four authors");
        };

        assert_eq!(content_hash(&doc, *a), content_hash(&doc, *b));
        assert_ne!(content_hash(&doc, *a), content_hash(&doc, *c));
        assert_ne!(content_hash(&doc, *a), content_hash(&doc, *d));
        // "first-name" sorts before "last-name"
        assert_eq!(
            format!("{:x}", md5::compute("FrankHerbert")),
            content_hash(&doc, *b),
        );
        assert_eq!(format!("{:x}", md5::compute("|Herbert")), content_hash(&doc, *d));
    }

    #[test]
    fn test_required_collector() {
        let mut collector = Collector::title_info();
        let result = collector.add(&document(""));

        assert!(matches!(result, Err(MergeError::MissingMetadata("title-info"))));
        assert!(collector.is_empty());
    }

    #[test]
    fn test_optional_collector_skips() {
        let mut collector = Collector::src_title_info();
        let mut target = Document::new("description");

        collector.add(&document("<title-info/>")).unwrap();

        assert!(collector.is_empty());
        assert!(collector.write(&mut target, "Title").is_empty());
    }

    #[test]
    fn test_src_url() {
        let mut collector = Collector::src_url();
        let mut target = Document::new("document-info");

        collector
            .add(&document(
                "<document-info><src-url>http://a</src-url><src-url>http://b</src-url></document-info>",
            ))
            .unwrap();
        collector.add(&document("<document-info/>")).unwrap();
        collector
            .add(&document("<document-info><src-url>http://a</src-url></document-info>"))
            .unwrap();

        let urls: Vec<_> = collector
            .write(&mut target, "")
            .into_iter()
            .map(|node| target.text_content(node))
            .collect();

        assert_eq!(vec!["http://a", "http://b"], urls);
    }

    #[test]
    fn test_src_ocr() {
        let mut collector = Collector::src_ocr();
        let mut target = Document::new("document-info");

        for ocr in ["Scanned", "Proofread", "Scanned"] {
            collector
                .add(&document(&format!("<document-info><src-ocr>{ocr}</src-ocr></document-info>")))
                .unwrap();
        }

        let written = collector.write(&mut target, "");

        assert_eq!(1, written.len());
        assert_eq!("src-ocr", target.tag(written[0]));
        assert_eq!("Scanned. Proofread", target.text_content(written[0]));
    }

    #[test]
    fn test_process_missing_title() {
        let mut stats = BookStats::new();
        let mut source = Fb2Source::read(
            "untitled.fb2",
            b"<FictionBook><description><title-info/></description><body/></FictionBook>",
        )
        .unwrap();

        let result = stats.process(&mut source, 0);

        assert!(matches!(result, Err(MergeError::MissingMetadata("book-title"))));
        assert!(stats.title_info().is_empty());
    }
}
