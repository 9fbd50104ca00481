use crate::book::BookCreator;
use crate::datetime::DateTime;
use crate::dom::{Document, NodeId};
use crate::fb2::consts;
use crate::merge::MergeOptions;
use crate::section;
use crate::stats::BookStats;
use std::collections::HashSet;

/// The finishing pass over a [`BookCreator`].
pub(super) struct Finisher {
    document: Document,
    description: NodeId,
    main: NodeId,
    title: String,
    notes: Vec<NodeId>,
    note_ids: Vec<String>,
    /// Targets of the references that survive the pass.
    referred: HashSet<String>,
}

impl Finisher {
    pub(super) fn new(creator: BookCreator) -> Self {
        Self {
            document: creator.document,
            description: creator.description,
            main: creator.main,
            title: creator.title,
            notes: creator.notes.into_iter().flatten().collect(),
            note_ids: Vec::new(),
            referred: HashSet::new(),
        }
    }

    pub(super) fn add_title_info(&mut self, stats: &BookStats) {
        let blocks = [stats.title_info(), stats.src_title_info()]
            .into_iter()
            .flat_map(|collector| collector.write(&mut self.document, &self.title))
            .collect::<Vec<_>>();

        for (i, block) in blocks.into_iter().enumerate() {
            self.document.insert(self.description, i, block);
        }
    }

    pub(super) fn add_document_info(
        &mut self,
        stats: &BookStats,
        options: &MergeOptions,
        finished_at: DateTime,
        timestamp: i64,
    ) {
        let config = options.config();
        let doc = &mut self.document;
        let document_info = doc.create_element(consts::DOCUMENT_INFO);
        let date = finished_at.date();

        let author = doc.create_element(consts::AUTHOR);
        let nickname = doc.create_text_element(consts::NICKNAME, config.user.as_str());
        doc.append(author, nickname);

        let program_used = doc.create_text_element(consts::PROGRAM_USED, config.program_name.as_str());
        let date_node = doc.create_text_element(consts::DATE, date.to_long_string());
        doc.set_attribute(date_node, consts::VALUE, date.to_string());

        let mut children = vec![author, program_used, date_node];
        children.extend(stats.src_url().write(doc, &self.title));
        children.extend(stats.src_ocr().write(doc, &self.title));
        children.push(doc.create_text_element(consts::DOCUMENT_ID, uuid::Uuid::new_v4().to_string()));
        children.push(doc.create_text_element(consts::VERSION, timestamp.to_string()));

        for child in children {
            doc.append(document_info, child);
        }
        doc.append(self.description, document_info);
    }

    /// Records the id of every note and numbers the title of each by its
    /// 1-based position across all books.
    pub(super) fn number_notes(&mut self) {
        for (position, &note) in self.notes.iter().enumerate() {
            if let Some(id) = self.document.attribute(note, consts::ID) {
                self.note_ids.push(id.to_owned());
            }

            let first = self.document.children(note).first().copied();
            if let Some(title) = first.filter(|&first| self.document.is(first, consts::TITLE)) {
                let number = section::new_title(&mut self.document, &(position + 1).to_string());
                self.document.replace(title, number);
            }
        }
    }

    /// Walks the references of the main body in document order:
    /// - A note reference is kept and labeled `[n]` by encounter order.
    /// - A reference to an element of the book is kept.
    /// - Any other reference is removed, preserving its tail text.
    ///
    /// References outside the main body are kept as they are.
    pub(super) fn resolve_references(&mut self) {
        let root = self.document.root();
        let existing: HashSet<String> = self
            .document
            .descendants(root)
            .filter_map(|node| self.document.attribute(node, consts::ID))
            .map(str::to_owned)
            .collect();
        let references: Vec<_> = self
            .document
            .descendants(self.main)
            .filter(|&node| self.target(node).is_some())
            .collect();
        let mut note_number = 1;

        for reference in references {
            let Some(target) = self.target(reference).map(str::to_owned) else {
                continue;
            };

            if self.note_ids.contains(&target) {
                self.document
                    .set_text(reference, Some(format!("[{note_number}]")));
                note_number += 1;
            } else if !existing.contains(&target) {
                self.remove_reference(reference);
                continue;
            }
            self.referred.insert(target);
        }

        // References elsewhere (description, notes) survive untouched
        let outside = [self.description]
            .into_iter()
            .chain(self.notes.iter().copied())
            .flat_map(|node| self.document.descendants(node))
            .filter_map(|node| self.target(node).map(str::to_owned))
            .collect::<Vec<_>>();
        self.referred.extend(outside);
    }

    fn target(&self, node: NodeId) -> Option<&str> {
        self.document
            .attribute(node, consts::HREF)
            .and_then(|href| href.strip_prefix('#'))
    }

    fn remove_reference(&mut self, reference: NodeId) {
        let doc = &mut self.document;
        let tail = doc.tail(reference).map(str::to_owned);

        if let Some(tail) = tail {
            match (doc.previous_sibling(reference), doc.parent(reference)) {
                (Some(previous), _) => doc.append_tail(previous, &tail),
                (None, Some(parent)) => doc.append_text(parent, &tail),
                (None, None) => {}
            }
        }
        doc.detach(reference);
    }

    /// Removes every `id` within the main body that no surviving reference targets.
    pub(super) fn strip_ids(&mut self) {
        let unreferenced: Vec<_> = self
            .document
            .descendants(self.main)
            .filter(|&node| {
                self.document
                    .attribute(node, consts::ID)
                    .is_some_and(|id| !self.referred.contains(id))
            })
            .collect();

        for node in unreferenced {
            let tag = self.document.tag(node);
            assert!(
                consts::STRIPPABLE_ID.contains(&tag),
                "unreferenced id on <{tag}> cannot be stripped",
            );
            self.document.remove_attribute(node, consts::ID);
        }
    }

    /// Wraps the notes in `<body name="notes">` following the main body.
    pub(super) fn into_document(mut self) -> Document {
        if !self.notes.is_empty() {
            let doc = &mut self.document;
            let root = doc.root();
            let notes_body = doc.create_element(consts::BODY);
            doc.set_attribute(notes_body, consts::NAME, consts::NOTES);

            for &note in &self.notes {
                doc.append(notes_body, note);
            }
            doc.insert(root, 2, notes_body);
        }
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xml::parse;

    /// A creator holding one book with the given main-body section and notes.
    fn finisher(section: &str, notes: &[&str]) -> Finisher {
        let notes = notes.concat();
        let source = parse(
            format!(
                r#"<src xmlns:l="http://www.w3.org/1999/xlink">{section}<notes>{notes}</notes></src>"#
            )
            .as_bytes(),
        )
        .unwrap();
        let root = source.root();
        let section = source.children(root)[0];
        let notes: Vec<_> = source.children(source.children(root)[1]).to_vec();
        let mut creator = BookCreator::new("Omnibus");

        creator.insert_book(
            crate::book::BookKey::new(crate::book::Year::Unknown, None, "Book".to_owned()),
            &source,
            section,
            &notes,
        );
        Finisher::new(creator)
    }

    fn main_section(finisher: &Finisher) -> NodeId {
        finisher.document.children(finisher.main)[1]
    }

    #[test]
    fn test_note_numbering() {
        let mut finisher = finisher(
            r##"<section><p>a<a l:href="#n2">x</a>b<a l:href="#n1">y</a>c<a l:href="#n2">z</a></p></section>"##,
            &[
                r#"<section id="n1"><title><p>Note one</p></title><p>1</p></section>"#,
                r#"<section id="n2"><p>2</p></section>"#,
            ],
        );
        finisher.number_notes();
        finisher.resolve_references();

        let doc = &finisher.document;
        let p = doc.children(main_section(&finisher))[0];
        let labels: Vec<_> = doc
            .children(p)
            .iter()
            .map(|&a| doc.text_content(a))
            .collect();
        let first_note_title = doc.children(finisher.notes[0])[0];

        assert_eq!(vec!["[1]", "[2]", "[3]"], labels);
        assert_eq!(vec!["n1", "n2"], finisher.note_ids);
        assert_eq!("1", doc.text_content(first_note_title));
    }

    #[test]
    fn test_dangling_reference_removed() {
        #[rustfmt::skip]
        let expected = [
            ("Hello world!", r##"<p>Hello <a l:href="#gone">x</a>world!</p>"##),
            ("Hello world!", r##"<p><a l:href="#gone">x</a>Hello world!</p>"##),
            ("Hello big world", r##"<p>Hello <b>big</b><a l:href="#gone">x</a> world</p>"##),
            ("Hello", r##"<p>Hello<a l:href="#gone">x</a></p>"##),
        ];

        for (expected, paragraph) in expected {
            let mut finisher = finisher(&format!("<section>{paragraph}</section>"), &[]);
            finisher.resolve_references();

            let doc = &finisher.document;
            let p = doc.children(main_section(&finisher))[0];

            assert_eq!(expected, doc.text_content(p), "{paragraph}");
            assert!(doc.find_child(p, "a").is_none());
        }
    }

    #[test]
    fn test_internal_reference_kept() {
        let mut finisher = finisher(
            r##"<section><p id="here">x</p><p id="unused">y</p><p><a l:href="#here">back</a></p></section>"##,
            &[],
        );
        finisher.resolve_references();
        finisher.strip_ids();

        let doc = &finisher.document;
        let ids: Vec<_> = doc
            .descendants(finisher.main)
            .filter_map(|node| doc.attribute(node, consts::ID))
            .collect();

        assert_eq!(vec!["here"], ids);
        assert_eq!("back", doc.text_content(doc.children(main_section(&finisher))[2]));
    }

    #[test]
    #[should_panic(expected = "unreferenced id on <a> cannot be stripped")]
    fn test_strip_unstrippable_id() {
        let mut finisher = finisher(r#"<section><p><a id="x">y</a></p></section>"#, &[]);
        finisher.resolve_references();
        finisher.strip_ids();
    }

    #[test]
    fn test_notes_body() {
        let finisher = finisher(
            "<section><p>x</p></section>",
            &[r#"<section id="n1"><p>1</p></section>"#],
        );
        let doc = finisher.into_document();
        let root = doc.root();
        let tags: Vec<_> = doc.children(root).iter().map(|&node| doc.tag(node)).collect();

        assert_eq!(vec!["description", "body", "body"], tags);
        assert_eq!(Some("notes"), doc.attribute(doc.children(root)[2], consts::NAME));
    }
}
