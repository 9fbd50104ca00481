//! Conversion of a source body into one section of a merged book.

use crate::dom::{Document, NodeId};
use crate::errors::StructureError;
use crate::fb2::{Fb2Source, consts};

/// Separator between the paragraphs of a multi-line title.
const TITLE_SEPARATOR: &str = ". ";

/// Front matter placed ahead of the content of a rebuilt section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrontMatter {
    /// The merged section title (required to rebuild).
    pub title: Option<String>,
    /// Epigraphs placed before the epigraphs of the section itself.
    pub epigraphs: Vec<NodeId>,
    pub cover: Option<NodeId>,
    pub annotation: Option<NodeId>,
}

impl FrontMatter {
    /// Front matter derived from the `title-info` of `source`:
    /// the book title, the cover image and the annotation.
    pub fn from_source(source: &Fb2Source) -> Self {
        Self {
            title: source.book_title(),
            epigraphs: Vec::new(),
            cover: source.cover(),
            annotation: source.annotation(),
        }
    }
}

/// The leading structure of a body or section and the content that follows.
///
/// The structural prefix consists of images, a title, epigraphs and
/// annotations. Titles, epigraphs and annotations only belong to the prefix
/// when they have child elements. The first child outside the prefix begins
/// the content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    node: NodeId,
    title: Option<String>,
    images: Vec<NodeId>,
    epigraphs: Vec<NodeId>,
    annotations: Vec<NodeId>,
    content: Vec<NodeId>,
}

impl Section {
    /// Scans the children of `node` within `document`.
    ///
    /// # Errors
    /// [`StructureError::MultipleTitles`] if the prefix holds more than one title.
    pub fn parse(document: &Document, node: NodeId) -> Result<Self, StructureError> {
        let children = document.children(node);
        let mut images = Vec::new();
        let mut titles = Vec::new();
        let mut epigraphs = Vec::new();
        let mut annotations = Vec::new();
        let mut split = children.len();

        for (i, &child) in children.iter().enumerate() {
            let has_children = document.has_children(child);

            match document.tag(child) {
                consts::IMAGE => images.push(child),
                consts::TITLE if has_children => titles.push(child),
                consts::EPIGRAPH if has_children => epigraphs.push(child),
                consts::ANNOTATION if has_children => annotations.push(child),
                _ => {
                    split = i;
                    break;
                }
            }
        }

        let title = match titles[..] {
            [] => None,
            [title] => normalize_title(document, title),
            _ => return Err(StructureError::MultipleTitles(titles.len())),
        };

        Ok(Self {
            node,
            title,
            images,
            epigraphs,
            annotations,
            content: children[split..].to_vec(),
        })
    }

    /// Checks that the body or section `node` parses, including the nested
    /// section [`Self::rebuild_section`] would unwrap.
    pub fn check(document: &Document, node: NodeId) -> Result<(), StructureError> {
        let section = Self::parse(document, node)?;

        if section.is_simple(document) {
            Self::parse(document, section.content[0])?;
        }
        Ok(())
    }

    /// The element this section was parsed from.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The normalized title, if present and meaningful.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn images(&self) -> &[NodeId] {
        &self.images
    }

    pub fn epigraphs(&self) -> &[NodeId] {
        &self.epigraphs
    }

    pub fn annotations(&self) -> &[NodeId] {
        &self.annotations
    }

    pub fn content(&self) -> &[NodeId] {
        &self.content
    }

    /// Returns `true` if the content is exactly one nested `<section>`.
    fn is_simple(&self, document: &Document) -> bool {
        matches!(self.content[..], [only] if document.is(only, consts::SECTION))
    }

    /// Builds a detached `<section>` within `document` containing, in order:
    /// 1. `title/p` holding the merged title of `front`
    /// 2. the external epigraphs of `front`
    /// 3. the epigraphs of this section
    /// 4. the cover image of `front`
    /// 5. the annotation of `front`
    /// 6. the content of this section
    ///
    /// When the content is a single nested section, that section is
    /// unwrapped: its content is used and its epigraphs follow the outer
    /// ones, while its title and images are dropped.
    ///
    /// Front matter nodes are copied; epigraphs and content of the section
    /// are moved.
    ///
    /// # Errors
    /// - [`StructureError::MissingTitle`]: `front` has no title.
    /// - [`StructureError::MultipleTitles`]: The nested section has more than one title.
    pub fn rebuild_section(
        self,
        document: &mut Document,
        front: &FrontMatter,
    ) -> Result<NodeId, StructureError> {
        let title = front.title.as_deref().ok_or(StructureError::MissingTitle)?;

        let parsed = if self.is_simple(document) {
            let mut inner = Section::parse(document, self.content[0])?;
            inner.epigraphs = self.epigraphs.into_iter().chain(inner.epigraphs).collect();
            inner
        } else {
            self
        };

        let section = document.create_element(consts::SECTION);
        let title = new_title(document, title);
        document.append(section, title);

        for &epigraph in &front.epigraphs {
            append_copy(document, section, epigraph);
        }
        for epigraph in parsed.epigraphs {
            document.append(section, epigraph);
        }
        for node in [front.cover, front.annotation].into_iter().flatten() {
            append_copy(document, section, node);
        }
        for node in parsed.content {
            document.append(section, node);
        }

        Ok(section)
    }
}

fn append_copy(document: &mut Document, parent: NodeId, node: NodeId) {
    let copy = document.duplicate(node);
    document.set_tail(copy, None);
    document.append(parent, copy);
}

/// Creates a detached `<title><p>text</p></title>`.
pub(crate) fn new_title(document: &mut Document, text: &str) -> NodeId {
    let title = document.create_element(consts::TITLE);
    let p = document.create_text_element(consts::P, text);
    document.append(title, p);
    title
}

/// Joins the trimmed text of every `p` within `title` with `". "`.
///
/// Returns [`None`] for titles consisting only of `*` and spaces.
fn normalize_title(document: &Document, title: NodeId) -> Option<String> {
    let normalized = document
        .find_children(title, consts::P)
        .map(|p| document.text_content(p).trim().to_owned())
        .collect::<Vec<_>>()
        .join(TITLE_SEPARATOR);

    let is_filler = normalized.chars().all(|c| matches!(c, '*' | ' '));
    (!is_filler).then_some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xml::parse;

    fn body(content: &str) -> (Document, NodeId) {
        let doc = parse(format!("<body>{content}</body>").as_bytes()).unwrap();
        let root = doc.root();
        (doc, root)
    }

    fn front(title: &str) -> FrontMatter {
        FrontMatter {
            title: Some(title.to_owned()),
            ..FrontMatter::default()
        }
    }

    /// `tag` or `tag:text` for each child of `node`.
    fn outline(doc: &Document, node: NodeId) -> Vec<String> {
        doc.children(node)
            .iter()
            .map(|&child| match doc.text_content(child).trim() {
                "" => doc.tag(child).to_owned(),
                text => format!("{}:{text}", doc.tag(child)),
            })
            .collect()
    }

    #[test]
    fn test_parse_prefix() {
        let (doc, root) = body(
            "<image/><title><p>Part</p><p>One</p></title><epigraph><p>e</p></epigraph>\
             <annotation><p>a</p></annotation><title/><p>text</p>",
        );
        let section = Section::parse(&doc, root).unwrap();

        assert_eq!(Some("Part. One"), section.title());
        assert_eq!(1, section.images().len());
        assert_eq!(1, section.epigraphs().len());
        assert_eq!(1, section.annotations().len());
        // An empty title is not part of the prefix
        assert_eq!(2, section.content().len());
        assert_eq!("title", doc.tag(section.content()[0]));
    }

    #[test]
    fn test_parse_prefix_only() {
        let (doc, root) = body("<image/><epigraph><p>e</p></epigraph>");
        let section = Section::parse(&doc, root).unwrap();

        assert!(section.content().is_empty());
    }

    #[test]
    fn test_parse_multiple_titles() {
        let (doc, root) = body("<title><p>A</p></title><title><p>B</p></title><p>text</p>");

        assert_eq!(
            Err(StructureError::MultipleTitles(2)),
            Section::parse(&doc, root),
        );
    }

    #[test]
    fn test_normalize_title() {
        #[rustfmt::skip]
        let expected = [
            (Some("Chapter 1. The Beginning"), "<p> Chapter 1 </p><p>The <emphasis>Begin</emphasis>ning</p>"),
            (Some("Alone"), "<p>Alone</p><empty-line/>"),
            (None, "<p>* * *</p>"),
            (None, "<p> * ** </p>"),
            (None, "<p></p>"),
            (None, "<subtitle>no paragraphs</subtitle>"),
        ];

        for (expected, title) in expected {
            let (doc, root) = body(&format!("<title>{title}</title><p>text</p>"));
            let section = Section::parse(&doc, root).unwrap();

            assert_eq!(expected, section.title(), "{title}");
        }
    }

    #[test]
    fn test_rebuild_order() {
        let (mut doc, root) = body(
            "<image/><title><p>Old</p></title><epigraph><p>inner</p></epigraph><p>one</p><p>two</p>",
        );
        let cover = doc.create_text_element("image", "");
        let annotation = doc.create_text_element("annotation", "about");
        let external = doc.create_text_element("epigraph", "external");
        let front = FrontMatter {
            title: Some("Book".to_owned()),
            epigraphs: vec![external],
            cover: Some(cover),
            annotation: Some(annotation),
        };

        let section = Section::parse(&doc, root).unwrap();
        let rebuilt = section.rebuild_section(&mut doc, &front).unwrap();

        #[rustfmt::skip]
        let expected = [
            "title:Book",
            "epigraph:external",
            "epigraph:inner",
            "image",
            "annotation:about",
            "p:one",
            "p:two",
        ];
        assert_eq!(expected.to_vec(), outline(&doc, rebuilt));
        // Front matter is copied
        assert_ne!(annotation, doc.children(rebuilt)[4]);
        assert_eq!(None, doc.parent(annotation));
    }

    #[test]
    fn test_rebuild_unwraps_single_section() {
        let (mut doc, root) = body(
            "<epigraph><p>outer</p></epigraph>\
             <section><title><p>Inner</p></title><image/><epigraph><p>inner</p></epigraph><p>text</p></section>",
        );
        let section = Section::parse(&doc, root).unwrap();
        let rebuilt = section.rebuild_section(&mut doc, &front("Book")).unwrap();

        #[rustfmt::skip]
        let expected = [
            "title:Book",
            "epigraph:outer",
            "epigraph:inner",
            "p:text",
        ];
        assert_eq!(expected.to_vec(), outline(&doc, rebuilt));
    }

    #[test]
    fn test_check() {
        #[rustfmt::skip]
        let expected = [
            (Ok(()), "<title><p>A</p></title><p>text</p>"),
            (Ok(()), "<section><title><p>A</p></title><p>text</p></section>"),
            (Err(StructureError::MultipleTitles(2)), "<title><p>A</p></title><title><p>B</p></title>"),
            (Err(StructureError::MultipleTitles(2)), "<section><title><p>A</p></title><title><p>B</p></title></section>"),
        ];

        for (expected, content) in expected {
            let (doc, root) = body(content);
            assert_eq!(expected, Section::check(&doc, root), "{content}");
        }
    }

    #[test]
    fn test_rebuild_missing_title() {
        let (mut doc, root) = body("<p>text</p>");
        let section = Section::parse(&doc, root).unwrap();

        assert_eq!(
            Err(StructureError::MissingTitle),
            section.rebuild_section(&mut doc, &FrontMatter::default()),
        );
    }
}
