//! Parsing of XML content into a [`Document`].
//!
//! Element names bound to the FictionBook namespace are stored by their local
//! name, and attributes bound to the XLink namespace are normalized to the
//! `xlink:` prefix regardless of the prefix used in the source
//! (`l:href`, `xlink:href`, ...).
//! Declarations of those two namespaces are dropped, as the serializer
//! declares them on the root element.

use crate::dom::{Attribute, Document, NodeId};
use crate::errors::FormatError;
use crate::fb2::consts;
use crate::parser::ParserResult;
use encoding_rs::{Encoding, UTF_8};
use quick_xml::Reader;
use quick_xml::escape;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;
use std::str;

pub(crate) type ByteReader<'a> = Reader<&'a [u8]>;

const XMLNS: &str = "xmlns";

/// Parses `bytes` into a [`Document`].
///
/// The character encoding is taken from a byte order mark or the XML
/// declaration (e.g., `windows-1251`), defaulting to UTF-8.
pub fn parse(bytes: &[u8]) -> ParserResult<Document> {
    let content = decode(bytes)?;
    let mut reader = ByteReader::from_str(&content);
    let mut builder = TreeBuilder::default();

    loop {
        match reader.read_event().map_err(unparsable)? {
            Event::Start(start) => builder.start(&start, false)?,
            Event::Empty(start) => builder.start(&start, true)?,
            Event::End(_) => builder.end(),
            Event::Text(text) => {
                let raw = str::from_utf8(text.as_ref())?;
                builder.text(&escape::unescape(raw).map_err(unparsable)?);
            }
            Event::CData(cdata) => builder.text(str::from_utf8(cdata.as_ref())?),
            Event::GeneralRef(reference) => {
                let name = str::from_utf8(reference.as_ref())?;
                let entity = format!("&{name};");
                builder.text(&escape::unescape(&entity).map_err(unparsable)?);
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes are not retained
            _ => {}
        }
    }

    builder.finish()
}

fn unparsable(error: impl std::error::Error + Send + Sync + 'static) -> FormatError {
    FormatError::Unparsable(Box::new(error))
}

fn decode(bytes: &[u8]) -> ParserResult<Cow<'_, str>> {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| declared_encoding(bytes))
        .unwrap_or(UTF_8);

    if encoding == UTF_8 {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        return Ok(Cow::Borrowed(str::from_utf8(bytes)?));
    }

    let (decoded, _, _) = encoding.decode(bytes);
    Ok(decoded)
}

/// The encoding named by the `encoding` pseudo-attribute of the XML declaration.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    // The declaration is ASCII-compatible for every supported encoding
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
    let declaration = head
        .trim_start_matches('\u{feff}')
        .trim_start()
        .strip_prefix("<?xml")?;
    let declaration = &declaration[..declaration.find("?>")?];

    let (_, rest) = declaration.split_once("encoding")?;
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let label = rest[1..].split(quote).next()?;

    Encoding::for_label(label.trim().as_bytes())
}

#[derive(Default)]
struct TreeBuilder {
    document: Option<Document>,
    /// Currently open elements paired with the namespace bindings they declare.
    stack: Vec<(NodeId, Vec<(String, String)>)>,
}

impl TreeBuilder {
    fn resolve<'a>(&'a self, bindings: &'a [(String, String)], prefix: &str) -> Option<&'a str> {
        bindings
            .iter()
            .chain(self.stack.iter().rev().flat_map(|(_, scope)| scope.iter()))
            .find(|(bound, _)| bound == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn start(&mut self, start: &BytesStart, is_empty: bool) -> ParserResult<()> {
        let raw_name = str::from_utf8(start.name().as_ref())?.to_owned();
        let mut bindings = Vec::new();
        let mut attributes = Vec::new();

        for attribute in start.attributes() {
            let attribute = attribute.map_err(unparsable)?;
            let key = str::from_utf8(attribute.key.as_ref())?.to_owned();
            let raw_value = str::from_utf8(&attribute.value)?;
            let value = escape::unescape(raw_value).map_err(unparsable)?.into_owned();

            if key == XMLNS {
                continue;
            }
            if let Some(prefix) = key.strip_prefix("xmlns:") {
                let is_known = value == consts::FB2_NAMESPACE || value == consts::XLINK_NAMESPACE;
                bindings.push((prefix.to_owned(), value.clone()));

                if is_known {
                    continue;
                }
            }
            attributes.push((key, value));
        }

        let tag = match raw_name.split_once(':') {
            Some((prefix, local)) if self.resolve(&bindings, prefix) == Some(consts::FB2_NAMESPACE) => {
                local.to_owned()
            }
            _ => raw_name.clone(),
        };

        let attributes: Vec<_> = attributes
            .into_iter()
            .map(|(key, value)| {
                let name = match key.split_once(':') {
                    Some((prefix, local))
                        if self.resolve(&bindings, prefix) == Some(consts::XLINK_NAMESPACE) =>
                    {
                        format!("{}:{local}", consts::XLINK_PREFIX)
                    }
                    _ => key.clone(),
                };
                Attribute::new(name, value)
            })
            .collect();

        let parent = self.stack.last().map(|&(parent, _)| parent);
        if parent.is_none() && self.document.is_some() {
            return Err(FormatError::Unparsable(
                "content contains more than one root element".into(),
            ));
        }
        let document = self
            .document
            .get_or_insert_with(|| Document::new(tag.as_str()));
        let node = match parent {
            Some(parent) => {
                let node = document.create_element(tag);
                document.append(parent, node);
                node
            }
            None => document.root(),
        };

        for attribute in attributes {
            document.push_attribute(node, attribute);
        }
        if !is_empty {
            self.stack.push((node, bindings));
        }
        Ok(())
    }

    fn end(&mut self) {
        self.stack.pop();
    }

    fn text(&mut self, text: &str) {
        // Character data outside the root element (whitespace)
        let (Some(&(parent, _)), Some(document)) = (self.stack.last(), self.document.as_mut()) else {
            return;
        };

        match document.children(parent).last().copied() {
            Some(last_child) => document.append_tail(last_child, text),
            None => document.append_text(parent, text),
        }
    }

    fn finish(self) -> ParserResult<Document> {
        if !self.stack.is_empty() {
            return Err(FormatError::Unparsable(
                "unexpected end of content; unclosed elements remain".into(),
            ));
        }
        self.document.ok_or(FormatError::NoRootElement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_and_tails() {
        let doc = parse(b"<?xml version=\"1.0\"?>\n<p>Hello <strong>big</strong> world<empty-line/>!</p>").unwrap();
        let root = doc.root();
        let strong = doc.children(root)[0];
        let empty = doc.children(root)[1];

        assert_eq!("p", doc.tag(root));
        assert_eq!(Some("Hello "), doc.text(root));
        assert_eq!(Some("big"), doc.text(strong));
        assert_eq!(Some(" world"), doc.tail(strong));
        assert_eq!(Some("!"), doc.tail(empty));
        assert_eq!("Hello big world!", doc.text_content(root));
    }

    #[test]
    fn test_parse_entities() {
        let doc = parse(b"<p a=\"1 &lt; 2\">Tom &amp; Jerry &#8212; &#x41;<![CDATA[<raw>]]></p>").unwrap();
        let root = doc.root();

        assert_eq!(Some("1 < 2"), doc.attribute(root, "a"));
        assert_eq!("Tom & Jerry \u{2014} A<raw>", doc.text_content(root));
    }

    #[test]
    fn test_parse_namespaces() {
        let doc = parse(
            br##"<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink" xmlns:x="urn:other">
                <body><p>See <a l:href="#n1" type="note" x:extra="1">1</a></p></body>
            </FictionBook>"##,
        )
        .unwrap();
        let root = doc.root();
        let link = doc.descendants(root).find(|&n| doc.is(n, "a")).unwrap();

        assert_eq!(Some("#n1"), doc.attribute(link, "xlink:href"));
        assert_eq!(Some("note"), doc.attribute(link, "type"));
        assert_eq!(Some("1"), doc.attribute(link, "x:extra"));
        // Unknown namespaces stay declared
        assert_eq!(Some("urn:other"), doc.attribute(root, "xmlns:x"));
        assert_eq!(None, doc.attribute(root, "xmlns:l"));
        assert_eq!(None, doc.attribute(root, "xmlns"));
    }

    #[test]
    fn test_parse_prefixed_elements() {
        let doc = parse(
            br#"<fb:FictionBook xmlns:fb="http://www.gribuser.ru/xml/fictionbook/2.0"><fb:body/></fb:FictionBook>"#,
        )
        .unwrap();
        let root = doc.root();

        assert_eq!("FictionBook", doc.tag(root));
        assert_eq!("body", doc.tag(doc.children(root)[0]));
    }

    #[test]
    fn test_parse_declared_encoding() {
        // "Привет" in windows-1251
        let mut bytes = b"<?xml version=\"1.0\" encoding=\"windows-1251\"?><p>".to_vec();
        bytes.extend_from_slice(&[0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2]);
        bytes.extend_from_slice(b"</p>");

        let doc = parse(&bytes).unwrap();
        assert_eq!(Some("Привет"), doc.text(doc.root()));
    }

    #[test]
    fn test_parse_utf8_bom() {
        let doc = parse(b"\xEF\xBB\xBF<p>x</p>").unwrap();
        assert_eq!(Some("x"), doc.text(doc.root()));
    }

    #[test]
    fn test_parse_fail() {
        #[rustfmt::skip]
        let malformed: [&[u8]; 5] = [
            b"",
            b"<p>unclosed",
            b"<p/><p/>",
            b"<p></q>",
            b"<p>&unknown;</p>",
        ];

        for bytes in malformed {
            assert!(parse(bytes).is_err(), "{:?}", String::from_utf8_lossy(bytes));
        }
    }
}
