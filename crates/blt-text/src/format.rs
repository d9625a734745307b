use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use blt_tree::{NodeKind, Tree};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{TextError, TextResult};
use crate::json::JsonCodec;
use crate::outline::OutlineCodec;
use crate::xml::XmlCodec;

/// A textual encoding of a tree.
///
/// Writers are deterministic: the same tree always renders to the same
/// bytes. `read` is the inverse of `write` for every tree.
pub trait TextCodec {
    fn format(&self) -> TextFormat;

    fn write(&self, tree: &Tree, sink: &mut dyn Write) -> TextResult<()>;

    fn read(&self, source: &str) -> TextResult<Tree>;

    /// Render to an in-memory string.
    fn render(&self, tree: &Tree) -> TextResult<String> {
        let mut buf = Vec::new();
        self.write(tree, &mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| TextError::malformed(self.format(), format!("writer produced {e}")))
    }
}

/// The supported text formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextFormat {
    Xml,
    Json,
    Outline,
}

impl TextFormat {
    /// Every text format, in a stable order.
    pub const ALL: [TextFormat; 3] = [TextFormat::Xml, TextFormat::Json, TextFormat::Outline];

    /// A codec with default settings.
    pub fn codec(self) -> Box<dyn TextCodec> {
        match self {
            Self::Xml => Box::new(XmlCodec::default()),
            Self::Json => Box::new(JsonCodec),
            Self::Outline => Box::new(OutlineCodec),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Xml => "xml",
            Self::Json => "json",
            Self::Outline => "outline",
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        self.name()
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Guess the format from the first significant character.
    pub fn detect(source: &str) -> Option<Self> {
        let trimmed = source.trim_start_matches('\u{feff}').trim_start();
        match trimmed.chars().next()? {
            '<' => Some(Self::Xml),
            '{' => Some(Self::Json),
            _ => {
                let word = trimmed.split(|c: char| c.is_whitespace()).next()?;
                let known = word == NodeKind::Unknown(0).as_str() || word.parse::<NodeKind>().is_ok();
                known.then_some(Self::Outline)
            }
        }
    }
}

impl fmt::Display for TextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a document in a known format.
pub fn read_str(format: TextFormat, source: &str) -> TextResult<Tree> {
    format.codec().read(source)
}

/// Parse a document whose format is sniffed from its content.
pub fn read_detected(source: &str) -> TextResult<Tree> {
    let format = TextFormat::detect(source)
        .ok_or_else(|| TextError::UnknownFormat("document content".into()))?;
    read_str(format, source)
}

/// Read a file, choosing the format by extension and falling back to
/// sniffing the content.
pub fn read_file(path: &Path) -> TextResult<Tree> {
    let source = fs::read_to_string(path)?;
    let format = TextFormat::from_path(path)
        .or_else(|| TextFormat::detect(&source))
        .ok_or_else(|| TextError::UnknownFormat(path.display().to_string()))?;
    debug!(path = %path.display(), %format, "reading text document");
    read_str(format, &source)
}

/// Write a tree to a file in the format implied by its extension.
pub fn write_file(tree: &Tree, path: &Path) -> TextResult<()> {
    let format = TextFormat::from_path(path)
        .ok_or_else(|| TextError::UnknownFormat(path.display().to_string()))?;
    write_file_as(tree, path, format)
}

/// Write a tree to a file in `format`, whatever the extension.
pub fn write_file_as(tree: &Tree, path: &Path, format: TextFormat) -> TextResult<()> {
    write_file_with(tree, path, format.codec().as_ref())
}

/// Write a document with a configured codec, creating missing parent
/// directories.
pub fn write_file_with(tree: &Tree, path: &Path, codec: &dyn TextCodec) -> TextResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut sink = BufWriter::new(fs::File::create(path)?);
    codec.write(tree, &mut sink)?;
    sink.flush()?;
    let format = codec.format();
    debug!(path = %path.display(), %format, nodes = tree.len(), "text document written");
    Ok(())
}
