//! Renaming of element identifiers so that documents can be concatenated
//! without collisions.
//!
//! Every `id` and every same-document reference (`xlink:href="#..."`) is
//! rewritten to [`rebuild_id`] of its original value and the zero-based
//! position (ordinal) of the document within the merge.

use crate::dom::Document;
use crate::fb2::consts;

/// Prefix of every rebuilt identifier.
const ID_PREFIX: &str = "id-";

/// Returns the identifier replacing `old` within the document at `ordinal`.
///
/// The result is a pure function of both arguments:
/// `"id-"` followed by the lowercase hex MD5 digest of the decimal `ordinal`
/// concatenated with `old`.
///
/// # Examples
/// ```
/// # use fb2merge::rebind::rebuild_id;
/// let id = rebuild_id("n1", 0);
///
/// assert_eq!(id, rebuild_id("n1", 0));
/// assert_ne!(id, rebuild_id("n1", 1));
/// assert!(id.starts_with("id-"));
/// assert_eq!(35, id.len());
/// ```
pub fn rebuild_id(old: &str, ordinal: usize) -> String {
    let mut context = md5::Context::new();
    context.consume(ordinal.to_string());
    context.consume(old);

    format!("{ID_PREFIX}{:x}", context.compute())
}

/// Rewrites all identifiers and same-document references of `document`.
///
/// Returns the rebuilt reference targets in document order
/// (including duplicates).
pub fn rebind(document: &mut Document, ordinal: usize) -> Vec<String> {
    let nodes: Vec<_> = document.descendants(document.root()).collect();

    for &node in &nodes {
        if let Some(old) = document.attribute(node, consts::ID) {
            let new = rebuild_id(old, ordinal);
            document.set_attribute(node, consts::ID, new);
        }
    }

    let mut targets = Vec::new();

    for &node in &nodes {
        let Some(target) = document
            .attribute(node, consts::HREF)
            .and_then(|href| href.strip_prefix('#'))
        else {
            continue;
        };
        let new = rebuild_id(target, ordinal);

        document.set_attribute(node, consts::HREF, format!("#{new}"));
        targets.push(new);
    }

    targets
}
