use std::io::Write;

use blt_tree::{Node, NodeKind, NodeRef, Tree, TreeBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TextError, TextResult};
use crate::format::{TextCodec, TextFormat};

/// Pretty-printed JSON: the nodes in document order, each carrying its
/// depth below the root.
///
/// ```json
/// { "nodes": [ { "depth": 0, "kind": "Build" }, { "depth": 1, "kind": "Unknown", "tag": 200 } ] }
/// ```
///
/// Records are flat, so reading and writing do not nest with the tree.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonDocument {
    nodes: Vec<JsonRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct JsonRecord {
    depth: usize,
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

impl JsonRecord {
    fn from_ref(node: NodeRef<'_>, depth: usize) -> Self {
        let kind = node.kind();
        Self {
            depth,
            kind: kind.as_str().to_string(),
            tag: kind.is_unknown().then(|| kind.tag()),
            name: node.name().map(str::to_string),
            value: node.value().map(str::to_string),
        }
    }

    fn into_node(self, index: usize) -> TextResult<Node> {
        let kind = NodeKind::from_text(&self.kind, self.tag).ok_or_else(|| {
            malformed(format!(
                "node {index}: unknown kind {:?} (tag {:?})",
                self.kind, self.tag
            ))
        })?;
        let mut node = Node::new(kind);
        node.name = self.name;
        node.value = self.value;
        Ok(node)
    }
}

fn malformed(reason: impl Into<String>) -> TextError {
    TextError::malformed(TextFormat::Json, reason)
}

impl TextCodec for JsonCodec {
    fn format(&self) -> TextFormat {
        TextFormat::Json
    }

    fn write(&self, tree: &Tree, sink: &mut dyn Write) -> TextResult<()> {
        let mut nodes = Vec::with_capacity(tree.len());
        let mut stack = vec![(tree.root(), 0)];
        while let Some((node, depth)) = stack.pop() {
            nodes.push(JsonRecord::from_ref(node, depth));
            stack.extend(node.children().rev().map(|c| (c, depth + 1)));
        }
        let doc = JsonDocument { nodes };
        serde_json::to_writer_pretty(&mut *sink, &doc).map_err(std::io::Error::from)?;
        sink.write_all(b"\n")?;
        Ok(())
    }

    fn read(&self, source: &str) -> TextResult<Tree> {
        let doc: JsonDocument =
            serde_json::from_str(source).map_err(|e| malformed(e.to_string()))?;
        let mut builder = TreeBuilder::new();

        for (index, record) in doc.nodes.into_iter().enumerate() {
            let depth = record.depth;
            if index > 0 && depth == 0 {
                return Err(malformed(format!("node {index}: second root")));
            }
            // Open nodes sit at depths 0..builder.depth().
            if depth > builder.depth() {
                return Err(malformed(format!(
                    "node {index}: depth {depth} skips a level (parent depth {})",
                    builder.depth().saturating_sub(1)
                )));
            }
            while builder.depth() > depth {
                builder.end().map_err(structural)?;
            }
            builder.start(record.into_node(index)?).map_err(structural)?;
        }
        while builder.depth() > 0 {
            builder.end().map_err(structural)?;
        }

        let tree = builder.finish().map_err(structural)?;
        debug!(nodes = tree.len(), "json parsed");
        Ok(tree)
    }
}

fn structural(e: blt_tree::TreeError) -> TextError {
    malformed(e.to_string())
}
