use crate::dom::{Document, NodeId};
use crate::stats;

/// Unique `src-url` / `src-ocr` entries keyed by their text, in first-seen order.
#[derive(Clone, Debug, Default)]
pub(super) struct Sources {
    entries: Vec<(String, NodeId)>,
}

impl Sources {
    pub(super) fn process(&mut self, store: &mut Document, document: &Document, node: NodeId) {
        let text = document.text_content(node).trim().to_owned();

        if text.is_empty() || self.entries.iter().any(|(seen, _)| *seen == text) {
            return;
        }
        self.entries.push((text, stats::keep(store, document, node)));
    }

    /// One node per unique entry.
    pub(super) fn write_each(&self, store: &Document, target: &mut Document) -> Vec<NodeId> {
        self.entries
            .iter()
            .map(|&(_, node)| target.import(store, node))
            .collect()
    }

    /// A single node (named after the first entry) joining every unique entry with `". "`.
    pub(super) fn write_joined(&self, store: &Document, target: &mut Document) -> Option<NodeId> {
        let (_, first) = self.entries.first()?;
        let joined = self
            .entries
            .iter()
            .map(|(text, _)| text.as_str())
            .collect::<Vec<_>>()
            .join(". ");

        Some(target.create_text_element(store.tag(*first), joined))
    }
}
