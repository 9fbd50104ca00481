use crate::dom::{Document, NodeId};
use crate::fb2::consts;
use crate::writer::WriterResult;
use quick_xml::escape::partial_escape;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::io::Write;

const INDENT: &str = "  ";

/// Serializes a [`Document`] as pretty-printed UTF-8 XML.
///
/// Element-only content is indented; mixed content
/// (see [`consts::MIXED_CONTENT`]) is written verbatim so no whitespace is
/// introduced between text and inline markup.
pub(crate) struct XmlWriter<W> {
    writer: quick_xml::Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            writer: quick_xml::Writer::new(writer),
        }
    }

    /// Writes `<?xml version="1.0" encoding="UTF-8"?>` on its own line.
    pub(crate) fn write_utf8_declaration(&mut self) -> WriterResult<&mut Self> {
        let declaration = BytesDecl::new("1.0", Some("UTF-8"), None);

        self.writer.write_event(Event::Decl(declaration))?;
        self.write_raw_text("\n")?;
        Ok(self)
    }

    /// Writes the root element of `document` (and everything within),
    /// declaring the FictionBook and XLink namespaces on it.
    pub(crate) fn write_document(&mut self, document: &Document) -> WriterResult<&mut Self> {
        let root = document.root();
        let mut start = BytesStart::new(document.tag(root));
        start.push_attribute(new_escaped_attribute("xmlns", consts::FB2_NAMESPACE));
        start.push_attribute(new_escaped_attribute(
            "xmlns:xlink",
            consts::XLINK_NAMESPACE,
        ));

        self.write_element(document, root, start, 0)?;
        self.write_raw_text("\n")?;
        Ok(self)
    }

    pub(crate) fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_node(&mut self, document: &Document, node: NodeId, depth: usize) -> WriterResult<()> {
        let start = BytesStart::new(document.tag(node));
        self.write_element(document, node, start, depth)
    }

    fn write_element(
        &mut self,
        document: &Document,
        node: NodeId,
        mut start: BytesStart<'_>,
        depth: usize,
    ) -> WriterResult<()> {
        start.extend_attributes(
            document
                .attributes(node)
                .iter()
                .map(|attribute| new_escaped_attribute(attribute.name(), attribute.value())),
        );

        let children = document.children(node);
        let text = document.text(node).unwrap_or_default();

        if children.is_empty() && text.is_empty() {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        let end = start.to_end().into_owned();
        self.writer.write_event(Event::Start(start))?;

        if is_indentable(document, node) {
            for &child in children {
                self.write_indent(depth + 1)?;
                self.write_node(document, child, depth + 1)?;
            }
            self.write_indent(depth)?;
        } else {
            self.write_text(text)?;

            for &child in children {
                self.write_node(document, child, depth + 1)?;
                self.write_text(document.tail(child).unwrap_or_default())?;
            }
        }

        self.writer.write_event(Event::End(end))?;
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> WriterResult<()> {
        if !text.is_empty() {
            self.writer
                .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
        }
        Ok(())
    }

    fn write_indent(&mut self, depth: usize) -> WriterResult<()> {
        let mut indent = String::with_capacity(1 + depth * INDENT.len());
        indent.push('\n');
        indent.push_str(&INDENT.repeat(depth));
        self.write_raw_text(&indent)
    }

    fn write_raw_text(&mut self, text: &str) -> WriterResult<()> {
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(text)))?;
        Ok(())
    }
}

/// Returns `true` if the content of `node` consists only of child elements
/// separated by insignificant whitespace.
fn is_indentable(document: &Document, node: NodeId) -> bool {
    fn is_blank(text: Option<&str>) -> bool {
        text.is_none_or(|text| text.trim().is_empty())
    }

    document.has_children(node)
        && !consts::MIXED_CONTENT.contains(&document.tag(node))
        && is_blank(document.text(node))
        && document
            .children(node)
            .iter()
            .all(|&child| is_blank(document.tail(child)))
}

fn new_escaped_attribute<'a>(name: &'a str, value: &'a str) -> Attribute<'a> {
    Attribute {
        key: quick_xml::name::QName(name.as_bytes()),
        value: match escape(value) {
            Cow::Borrowed(borrowed) => Cow::Borrowed(borrowed.as_bytes()),
            Cow::Owned(owned) => Cow::Owned(owned.into_bytes()),
        },
    }
}

/// Escapes attribute values, including whitespace that
/// attribute-value normalization would otherwise collapse.
fn escape(input: &str) -> Cow<'_, str> {
    if !input.chars().any(|c| entity(c).is_some()) {
        return Cow::Borrowed(input);
    }

    let mut escaped = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match entity(c) {
            Some(entity) => escaped.push_str(entity),
            None => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

fn entity(c: char) -> Option<&'static str> {
    Some(match c {
        '<' => "&lt;",
        '>' => "&gt;",
        '"' => "&quot;",
        '&' => "&amp;",
        '\'' => "&apos;",
        '\t' => "&#9;",
        '\n' => "&#10;",
        '\r' => "&#13;",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::xml::parse;

    fn to_string(document: &Document) -> String {
        let mut writer = XmlWriter::new(Vec::new());
        writer
            .write_utf8_declaration()
            .unwrap()
            .write_document(document)
            .unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_escape() {
        #[rustfmt::skip]
        let expected = [
            ("&lt;&gt;&apos;&quot;&amp;&#13;&#10;&#9;", "<>'\"&\r\n\t"),
            ("abc xyz", "abc xyz"),
            ("1 &lt; 2 &amp; 3", "1 < 2 & 3"),
            ("#id-0a1b", "#id-0a1b"),
        ];

        for (expected_escaped, original) in expected {
            assert_eq!(expected_escaped, super::escape(original));
        }
    }

    #[test]
    fn test_write_pretty() {
        let document = parse(
            br##"<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink"><body>
            <section><p>Tom &amp; <a l:href="#n">Jerry</a> run</p><empty-line/></section></body></FictionBook>"##,
        )
        .unwrap();

        #[rustfmt::skip]
        let expected = concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<FictionBook xmlns=\"http://www.gribuser.ru/xml/fictionbook/2.0\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">\n",
            "  <body>\n",
            "    <section>\n",
            "      <p>Tom &amp; <a xlink:href=\"#n\">Jerry</a> run</p>\n",
            "      <empty-line/>\n",
            "    </section>\n",
            "  </body>\n",
            "</FictionBook>\n",
        );

        assert_eq!(expected, to_string(&document));
    }

    #[test]
    fn test_write_then_parse() {
        let source = parse(
            br#"<FictionBook><description><title-info><book-title>A &lt;B&gt;</book-title></title-info></description></FictionBook>"#,
        )
        .unwrap();
        let written = to_string(&source);
        let reparsed = parse(written.as_bytes()).unwrap();
        let title = reparsed
            .select_first(reparsed.root(), &["description", "title-info", "book-title"])
            .unwrap();

        assert_eq!(Some("A <B>"), reparsed.text(title));
    }
}
