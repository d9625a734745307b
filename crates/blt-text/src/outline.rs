//! Indented one-node-per-line rendering.
//!
//! ```text
//! Build Value="Succeeded"
//!     Project Name="app.proj"
//!         Target Name="Build"
//!             Message Value="line one\nline two"
//!         Unknown Tag=200 Name="future"
//! ```
//!
//! Four spaces per depth level. Quoted strings use backslash escapes for
//! `\\`, `\"`, `\n`, `\r` and `\t`, so every node stays on one line.

use std::io::Write;

use blt_tree::{Node, NodeKind, NodeRef, Tree, TreeBuilder};
use tracing::debug;

use crate::error::{TextError, TextResult};
use crate::format::{TextCodec, TextFormat};

const INDENT: &str = "    ";

#[derive(Clone, Copy, Debug, Default)]
pub struct OutlineCodec;

impl TextCodec for OutlineCodec {
    fn format(&self) -> TextFormat {
        TextFormat::Outline
    }

    fn write(&self, tree: &Tree, sink: &mut dyn Write) -> TextResult<()> {
        let mut line = String::new();
        for node in tree.iter() {
            line.clear();
            format_line(&mut line, node);
            sink.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    fn read(&self, source: &str) -> TextResult<Tree> {
        let mut builder = TreeBuilder::new();
        for (index, line) in source.lines().enumerate() {
            let lineno = index + 1;
            if line.trim().is_empty() {
                continue;
            }
            let (depth, rest) = split_indent(line).map_err(|r| malformed(lineno, r))?;
            while builder.depth() > depth {
                builder.end().map_err(|e| malformed(lineno, e.to_string()))?;
            }
            if builder.depth() != depth {
                return Err(malformed(
                    lineno,
                    format!("indentation jumps to depth {depth} under depth {}", builder.depth()),
                ));
            }
            let node = parse_node(rest).map_err(|r| malformed(lineno, r))?;
            builder
                .start(node)
                .map_err(|e| malformed(lineno, e.to_string()))?;
        }
        while builder.depth() > 0 {
            builder
                .end()
                .map_err(|e| TextError::malformed(TextFormat::Outline, e.to_string()))?;
        }
        let tree = builder
            .finish()
            .map_err(|e| TextError::malformed(TextFormat::Outline, e.to_string()))?;
        debug!(nodes = tree.len(), "outline parsed");
        Ok(tree)
    }
}

/// Render a tree as an outline string.
pub fn render(tree: &Tree) -> String {
    let mut out = String::new();
    for node in tree.iter() {
        format_line(&mut out, node);
    }
    out
}

fn format_line(out: &mut String, node: NodeRef<'_>) {
    for _ in 0..node.depth() {
        out.push_str(INDENT);
    }
    let kind = node.kind();
    out.push_str(kind.as_str());
    if let NodeKind::Unknown(tag) = kind {
        out.push_str(&format!(" Tag={tag}"));
    }
    if let Some(name) = node.name() {
        out.push_str(" Name=");
        push_quoted(out, name);
    }
    if let Some(value) = node.value() {
        out.push_str(" Value=");
        push_quoted(out, value);
    }
    out.push('\n');
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn malformed(line: usize, reason: impl std::fmt::Display) -> TextError {
    TextError::malformed(TextFormat::Outline, format!("line {line}: {reason}"))
}

fn split_indent(line: &str) -> Result<(usize, &str), String> {
    let rest = line.trim_start_matches(' ');
    let spaces = line.len() - rest.len();
    if rest.starts_with('\t') {
        return Err("tabs are not valid indentation".into());
    }
    if spaces % INDENT.len() != 0 {
        return Err(format!("indentation of {spaces} spaces is not a multiple of {}", INDENT.len()));
    }
    Ok((spaces / INDENT.len(), rest))
}

fn parse_node(line: &str) -> Result<Node, String> {
    let (kind_name, mut rest) = line.split_once(' ').unwrap_or((line, ""));
    let mut tag = None;
    let mut name = None;
    let mut value = None;

    while !rest.is_empty() {
        let (key, after) = rest
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, found {rest:?}"))?;
        match key {
            "Tag" if tag.is_none() => {
                let end = after.find(' ').unwrap_or(after.len());
                let parsed = after[..end]
                    .parse::<u8>()
                    .map_err(|e| format!("invalid Tag {:?}: {e}", &after[..end]))?;
                tag = Some(parsed);
                rest = &after[end..];
            }
            "Name" if name.is_none() => {
                let (text, tail) = parse_quoted(after)?;
                name = Some(text);
                rest = tail;
            }
            "Value" if value.is_none() => {
                let (text, tail) = parse_quoted(after)?;
                value = Some(text);
                rest = tail;
            }
            other => return Err(format!("unexpected or repeated attribute {other:?}")),
        }
        rest = match rest.strip_prefix(' ') {
            Some(tail) if !tail.is_empty() => tail,
            Some(_) => return Err("trailing space".into()),
            None if rest.is_empty() => rest,
            None => return Err(format!("expected space before {rest:?}")),
        };
    }

    let kind = NodeKind::from_text(kind_name, tag)
        .ok_or_else(|| format!("unknown kind {kind_name:?} (tag {tag:?})"))?;
    let mut node = Node::new(kind);
    node.name = name;
    node.value = value;
    Ok(node)
}

/// Parse a `"…"` string at the start of `s`; returns the text and the rest.
fn parse_quoted(s: &str) -> Result<(String, &str), String> {
    let body = s
        .strip_prefix('"')
        .ok_or_else(|| format!("expected quoted string, found {s:?}"))?;
    let mut out = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, &body[i + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => out.push('\\'),
                Some((_, '"')) => out.push('"'),
                Some((_, 'n')) => out.push('\n'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, 't')) => out.push('\t'),
                Some((_, other)) => return Err(format!("unknown escape \\{other}")),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err("unterminated string".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blt_tree::testing::arb_tree;
    use blt_tree::NodeId;
    use proptest::prelude::*;

    fn sample() -> Tree {
        let mut tree = Tree::new(Node::new(NodeKind::Build).with_value("Succeeded"));
        let project = tree.add_child(NodeId::ROOT, Node::named(NodeKind::Project, "app.proj"));
        let target = tree.add_child(project, Node::named(NodeKind::Target, "Build"));
        tree.add_child(target, Node::new(NodeKind::Message).with_value("line one\nline two"));
        tree.add_child(project, Node::named(NodeKind::Unknown(200), "future"));
        tree
    }

    #[test]
    fn renders_indented_lines() {
        let expected = "Build Value=\"Succeeded\"\n\
                        \x20   Project Name=\"app.proj\"\n\
                        \x20       Target Name=\"Build\"\n\
                        \x20           Message Value=\"line one\\nline two\"\n\
                        \x20       Unknown Tag=200 Name=\"future\"\n";
        assert_eq!(render(&sample()), expected);
        assert_eq!(OutlineCodec.render(&sample()).unwrap(), expected);
    }

    #[test]
    fn parses_rendering() {
        let tree = sample();
        assert_eq!(OutlineCodec.read(&render(&tree)).unwrap(), tree);
    }

    #[test]
    fn tolerates_crlf_and_blank_lines() {
        let text = "Build\r\n\r\n    Target Name=\"a\"\r\n";
        let tree = OutlineCodec.read(text).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.root().child(0).unwrap().name(), Some("a"));
    }

    #[test]
    fn empty_name_and_escapes() {
        let text = "Build Name=\"\" Value=\"a\\\"b\\\\c\\td\"\n";
        let tree = OutlineCodec.read(text).unwrap();
        assert_eq!(tree.root().name(), Some(""));
        assert_eq!(tree.root().value(), Some("a\"b\\c\td"));
    }

    #[test]
    fn rejects_malformed_input() {
        let cases = [
            "",
            "Bogus\n",
            "Build\n        Target\n",
            "Build\n  Target\n",
            "Build\nBuild\n",
            "Build Name=\"open\n",
            "Build Name=x\n",
            "Build Size=\"1\"\n",
            "Build Name=\"a\" Name=\"b\"\n",
            "Build Name=\"a\"Value=\"b\"\n",
            "Build Value=\"\\q\"\n",
            "Unknown Name=\"no tag\"\n",
            "Unknown Tag=3\n",
            "Unknown Tag=300\n",
            "Build Tag=200\n",
            "\tBuild\n",
        ];
        for text in cases {
            let err = OutlineCodec.read(text).unwrap_err();
            assert!(err.is_malformed(), "{text:?} gave {err}");
        }
    }

    proptest! {
        #[test]
        fn roundtrip(tree in arb_tree()) {
            let text = render(&tree);
            let back = OutlineCodec.read(&text).unwrap();
            prop_assert_eq!(render(&back), text);
            prop_assert_eq!(back, tree);
        }
    }
}
