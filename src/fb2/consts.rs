// Namespaces
pub(crate) const FB2_NAMESPACE: &str = "http://www.gribuser.ru/xml/fictionbook/2.0";
pub(crate) const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
pub(crate) const XLINK_PREFIX: &str = "xlink";

// Program identity
pub(crate) const PROGRAM_NAME: &str = "fb2merge";

// General attributes
pub(crate) const ID: &str = "id";
pub(crate) const HREF: &str = "xlink:href";
pub(crate) const NAME: &str = "name";
pub(crate) const VALUE: &str = "value";
pub(crate) const MATCH: &str = "match";
pub(crate) const NUMBER: &str = "number";

// Attribute values
pub(crate) const NOTES: &str = "notes";

// Document elements
pub(crate) const FICTION_BOOK: &str = "FictionBook";
pub(crate) const DESCRIPTION: &str = "description";
pub(crate) const BODY: &str = "body";
pub(crate) const BINARY: &str = "binary";

// Description elements
pub(crate) const TITLE_INFO: &str = "title-info";
pub(crate) const SRC_TITLE_INFO: &str = "src-title-info";
pub(crate) const DOCUMENT_INFO: &str = "document-info";
pub(crate) const PUBLISH_INFO: &str = "publish-info";
pub(crate) const GENRE: &str = "genre";
pub(crate) const AUTHOR: &str = "author";
pub(crate) const TRANSLATOR: &str = "translator";
pub(crate) const BOOK_TITLE: &str = "book-title";
pub(crate) const COVERPAGE: &str = "coverpage";
pub(crate) const LANG: &str = "lang";
pub(crate) const SRC_LANG: &str = "src-lang";
pub(crate) const SEQUENCE: &str = "sequence";
pub(crate) const DATE: &str = "date";
pub(crate) const YEAR: &str = "year";
pub(crate) const NICKNAME: &str = "nickname";
pub(crate) const PROGRAM_USED: &str = "program-used";
pub(crate) const SRC_URL: &str = "src-url";
pub(crate) const SRC_OCR: &str = "src-ocr";
pub(crate) const DOCUMENT_ID: &str = "id";
pub(crate) const VERSION: &str = "version";

// Content elements
pub(crate) const SECTION: &str = "section";
pub(crate) const TITLE: &str = "title";
pub(crate) const EPIGRAPH: &str = "epigraph";
pub(crate) const ANNOTATION: &str = "annotation";
pub(crate) const IMAGE: &str = "image";
pub(crate) const P: &str = "p";

/// Elements that may silently lose an unreferenced `id` when a merged book is finished.
pub(crate) const STRIPPABLE_ID: &[&str] = &[
    "p",
    "v",
    "subtitle",
    "section",
    "title",
    "epigraph",
    "poem",
    "stanza",
    "cite",
    "text-author",
    "image",
    "table",
    "tr",
    "td",
    "th",
    "empty-line",
    "annotation",
    "style",
    "strong",
    "emphasis",
    "code",
    "sub",
    "sup",
    "strikethrough",
];

/// Elements whose content model is mixed (text interleaved with inline markup).
///
/// Their content is serialized verbatim, never re-indented.
pub(crate) const MIXED_CONTENT: &[&str] = &[
    "p",
    "v",
    "subtitle",
    "text-author",
    "td",
    "th",
    "a",
    "strong",
    "emphasis",
    "style",
    "strikethrough",
    "sub",
    "sup",
    "code",
    "binary",
];
