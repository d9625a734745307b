//! XML rendering built on `quick-xml`.
//!
//! Element name is the kind name. Attributes come in a fixed order: `Tag`
//! (placeholder kinds only), `Name`, `Value`. Childless nodes are
//! self-closing. Newlines, carriage returns and tabs in attribute values are
//! written as numeric character references so they survive a round trip.

use std::borrow::Cow;
use std::io::{self, Write};

use blt_tree::{Node, NodeKind, NodeRef, Tree, TreeBuilder};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TextError, TextResult};
use crate::format::{TextCodec, TextFormat};

const ATTR_TAG: &[u8] = b"Tag";
const ATTR_NAME: &[u8] = b"Name";
const ATTR_VALUE: &[u8] = b"Value";

/// XML writer settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlConfig {
    /// Spaces per nesting level; 0 writes everything on one line.
    pub indent: usize,
    /// Emit the `<?xml ...?>` declaration.
    pub declaration: bool,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            indent: 2,
            declaration: true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct XmlCodec {
    config: XmlConfig,
}

impl XmlCodec {
    pub fn new(config: XmlConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &XmlConfig {
        &self.config
    }
}

impl TextCodec for XmlCodec {
    fn format(&self) -> TextFormat {
        TextFormat::Xml
    }

    fn write(&self, tree: &Tree, sink: &mut dyn Write) -> TextResult<()> {
        let mut writer = if self.config.indent > 0 {
            Writer::new_with_indent(&mut *sink, b' ', self.config.indent)
        } else {
            Writer::new(&mut *sink)
        };

        if self.config.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
                .map_err(write_err)?;
        }

        // (node, start tag already written)
        let mut stack: Vec<(NodeRef<'_>, bool)> = vec![(tree.root(), false)];
        while let Some((node, opened)) = stack.pop() {
            let name = node.kind().as_str();
            if opened {
                writer
                    .write_event(Event::End(BytesEnd::new(name)))
                    .map_err(write_err)?;
                continue;
            }
            let start = start_tag(node);
            if node.has_children() {
                writer.write_event(Event::Start(start)).map_err(write_err)?;
                stack.push((node, true));
                stack.extend(node.children().rev().map(|c| (c, false)));
            } else {
                writer.write_event(Event::Empty(start)).map_err(write_err)?;
            }
        }
        writer.get_mut().write_all(b"\n")?;
        Ok(())
    }

    fn read(&self, source: &str) -> TextResult<Tree> {
        let mut reader = Reader::from_str(source);
        let mut builder = TreeBuilder::new();

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| malformed(format!("at byte {position}: {e}")))?;
            match event {
                Event::Start(e) => {
                    let node = parse_element(&e)?;
                    builder.start(node).map_err(|e| malformed(e.to_string()))?;
                }
                Event::Empty(e) => {
                    let node = parse_element(&e)?;
                    builder.leaf(node).map_err(|e| malformed(e.to_string()))?;
                }
                Event::End(_) => {
                    builder.end().map_err(|e| malformed(e.to_string()))?;
                }
                Event::Text(text) => {
                    if !text.iter().all(u8::is_ascii_whitespace) {
                        return Err(malformed(format!(
                            "unexpected text content at byte {position}"
                        )));
                    }
                }
                Event::CData(_) => {
                    return Err(malformed(format!("unexpected CDATA at byte {position}")));
                }
                Event::Eof => break,
                // Declaration, comments, processing instructions, doctype.
                _ => {}
            }
        }

        let tree = builder.finish().map_err(|e| malformed(e.to_string()))?;
        debug!(nodes = tree.len(), "xml parsed");
        Ok(tree)
    }
}

fn start_tag(node: NodeRef<'_>) -> BytesStart<'static> {
    let kind = node.kind();
    let mut start = BytesStart::new(kind.as_str());
    if let NodeKind::Unknown(tag) = kind {
        let tag = tag.to_string();
        start.push_attribute((ATTR_TAG, tag.as_bytes()));
    }
    if let Some(name) = node.name() {
        start.push_attribute((ATTR_NAME, escape_attr(name).as_bytes()));
    }
    if let Some(value) = node.value() {
        start.push_attribute((ATTR_VALUE, escape_attr(value).as_bytes()));
    }
    start
}

fn parse_element(e: &BytesStart<'_>) -> TextResult<Node> {
    let element = std::str::from_utf8(e.name().as_ref())
        .map_err(|_| malformed("element name is not valid UTF-8"))?
        .to_string();

    let mut tag = None;
    let mut name = None;
    let mut value = None;
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(format!("<{element}>: {err}")))?;
        let text = attr
            .unescape_value()
            .map_err(|err| malformed(format!("<{element}>: {err}")))?
            .into_owned();
        match attr.key.as_ref() {
            ATTR_TAG => {
                let parsed = text
                    .parse::<u8>()
                    .map_err(|err| malformed(format!("<{element}> Tag {text:?}: {err}")))?;
                tag = Some(parsed);
            }
            ATTR_NAME => name = Some(text),
            ATTR_VALUE => value = Some(text),
            other => {
                return Err(malformed(format!(
                    "<{element}> has unexpected attribute {}",
                    String::from_utf8_lossy(other)
                )))
            }
        }
    }

    let kind = NodeKind::from_text(&element, tag)
        .ok_or_else(|| malformed(format!("unknown element <{element}> (tag {tag:?})")))?;
    let mut node = Node::new(kind);
    node.name = name;
    node.value = value;
    Ok(node)
}

/// Escape an attribute value, including whitespace that XML would
/// otherwise normalize.
fn escape_attr(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'', '\n', '\r', '\t']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn malformed(reason: impl Into<String>) -> TextError {
    TextError::malformed(TextFormat::Xml, reason)
}

fn write_err(e: impl std::fmt::Display) -> TextError {
    TextError::Io(io::Error::other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blt_tree::testing::arb_tree;
    use blt_tree::NodeId;
    use proptest::prelude::*;

    fn sample() -> Tree {
        let mut tree = Tree::new(Node::new(NodeKind::Build));
        let project = tree.add_child(NodeId::ROOT, Node::named(NodeKind::Project, "a&b.proj"));
        tree.add_child(project, Node::named(NodeKind::Target, "Build").with_value("x\ny\tz"));
        tree.add_child(NodeId::ROOT, Node::new(NodeKind::Unknown(201)));
        tree
    }

    #[test]
    fn renders_elements_and_attributes() {
        let text = XmlCodec::default().render(&sample()).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(text.contains("\n<Build>\n"));
        assert!(text.contains("\n  <Project Name=\"a&amp;b.proj\">\n"));
        assert!(text.contains("\n    <Target Name=\"Build\" Value=\"x&#10;y&#9;z\"/>\n"));
        assert!(text.contains("\n  <Unknown Tag=\"201\"/>\n"));
        assert!(text.ends_with("</Build>\n"));
    }

    #[test]
    fn parses_rendering() {
        let tree = sample();
        let codec = XmlCodec::default();
        assert_eq!(codec.read(&codec.render(&tree).unwrap()).unwrap(), tree);
    }

    #[test]
    fn compact_output_without_declaration() {
        let codec = XmlCodec::new(XmlConfig {
            indent: 0,
            declaration: false,
        });
        let text = codec.render(&sample()).unwrap();
        assert!(text.starts_with("<Build><Project"));
        assert_eq!(text.lines().count(), 1);
        assert_eq!(codec.read(&text).unwrap(), sample());
    }

    #[test]
    fn accepts_comments_and_whitespace() {
        let text = "<?xml version=\"1.0\"?>\n<!-- captured -->\n<Build>\n  <Message Value='hi'/>\n</Build>\n";
        let tree = XmlCodec::default().read(text).unwrap();
        assert_eq!(tree.root().child(0).unwrap().value(), Some("hi"));
    }

    #[test]
    fn rejects_malformed_input() {
        let cases = [
            "",
            "<Build>",
            "<Build></Project>",
            "<Build/><Build/>",
            "<Widget/>",
            "<Unknown/>",
            "<Unknown Tag=\"2\"/>",
            "<Build Tag=\"200\"/>",
            "<Build Colour=\"red\"/>",
            "<Build Name=\"a\" Name=\"b\"/>",
            "<Build>text</Build>",
            "<Build><![CDATA[x]]></Build>",
        ];
        let codec = XmlCodec::default();
        for text in cases {
            let err = codec.read(text).unwrap_err();
            assert!(err.is_malformed(), "{text:?} gave {err}");
        }
    }

    #[test]
    fn config_defaults_from_partial_json() {
        let config: XmlConfig = serde_json::from_str(r#"{"indent": 4}"#).unwrap();
        assert_eq!(config.indent, 4);
        assert!(config.declaration);
    }

    proptest! {
        #[test]
        fn roundtrip(tree in arb_tree()) {
            let codec = XmlCodec::default();
            let text = codec.render(&tree).unwrap();
            let back = codec.read(&text).unwrap();
            prop_assert_eq!(codec.render(&back).unwrap(), text);
            prop_assert_eq!(back, tree);
        }
    }
}
