use crate::dom::{Document, NodeId};
use crate::fb2::consts;
use crate::stats;
use std::collections::{BTreeMap, HashSet};

/// Genre confidence assumed when the `match` attribute is absent.
const DEFAULT_MATCH: u32 = 100;

/// Merged `<title-info>` (or `<src-title-info>`) entries.
#[derive(Clone, Debug, Default)]
pub(super) struct TitleInfo {
    /// Genre name → highest confidence.
    genres: BTreeMap<String, u32>,
    authors: UniqueNodes,
    translators: UniqueNodes,
    langs: Tally,
    src_langs: Tally,
    sequences: Vec<NodeId>,
}

impl TitleInfo {
    pub(super) fn process(&mut self, store: &mut Document, document: &Document, node: NodeId) {
        match document.tag(node) {
            consts::GENRE => {
                let genre = document.text_content(node).trim().to_owned();
                let confidence = document
                    .attribute(node, consts::MATCH)
                    .and_then(|value| value.trim().parse().ok())
                    .unwrap_or(DEFAULT_MATCH);

                self.genres
                    .entry(genre)
                    .and_modify(|max| *max = (*max).max(confidence))
                    .or_insert(confidence);
            }
            consts::AUTHOR => self.authors.insert(store, document, node),
            consts::TRANSLATOR => self.translators.insert(store, document, node),
            consts::LANG => self.langs.count(document.text_content(node).trim()),
            consts::SRC_LANG => self.src_langs.count(document.text_content(node).trim()),
            consts::SEQUENCE => self.sequences.push(stats::keep(store, document, node)),
            _ => {}
        }
    }

    /// Creates the merged `<block_tag>` element within `target`.
    ///
    /// Children are written in the order required by the FB2 schema:
    /// genres (by name), authors, the book title, the language,
    /// the source language, translators, and sequences.
    pub(super) fn write(
        &self,
        store: &Document,
        target: &mut Document,
        block_tag: &str,
        book_title: &str,
    ) -> NodeId {
        let block = target.create_element(block_tag);

        for (genre, &confidence) in &self.genres {
            let node = target.create_text_element(consts::GENRE, genre.as_str());
            if confidence < DEFAULT_MATCH {
                target.set_attribute(node, consts::MATCH, confidence.to_string());
            }
            target.append(block, node);
        }
        for &author in &self.authors.nodes {
            let node = target.import(store, author);
            target.append(block, node);
        }

        let title = target.create_text_element(consts::BOOK_TITLE, book_title);
        target.append(block, title);

        for (tag, tally) in [(consts::LANG, &self.langs), (consts::SRC_LANG, &self.src_langs)] {
            if let Some(lang) = tally.least_frequent() {
                let node = target.create_text_element(tag, lang);
                target.append(block, node);
            }
        }
        for &node in self.translators.nodes.iter().chain(&self.sequences) {
            let node = target.import(store, node);
            target.append(block, node);
        }

        block
    }
}

/// Nodes de-duplicated by [content hash](stats::content_hash); the first one wins.
#[derive(Clone, Debug, Default)]
struct UniqueNodes {
    hashes: HashSet<String>,
    nodes: Vec<NodeId>,
}

impl UniqueNodes {
    fn insert(&mut self, store: &mut Document, document: &Document, node: NodeId) {
        if self.hashes.insert(stats::content_hash(document, node)) {
            self.nodes.push(stats::keep(store, document, node));
        }
    }
}

/// Occurrence counts in first-seen order.
#[derive(Clone, Debug, Default)]
struct Tally(Vec<(String, usize)>);

impl Tally {
    fn count(&mut self, value: &str) {
        if value.is_empty() {
            return;
        }
        match self.0.iter_mut().find(|(seen, _)| seen == value) {
            Some((_, count)) => *count += 1,
            None => self.0.push((value.to_owned(), 1)),
        }
    }

    /// The least frequent value; ties resolve to the one seen first.
    fn least_frequent(&self) -> Option<&str> {
        self.0
            .iter()
            .min_by_key(|(_, count)| *count)
            .map(|(value, _)| value.as_str())
    }
}
