//! Node kinds: the closed set of record types in a build log.
//!
//! Every kind has a stable one-byte tag used by the binary codec and a stable
//! text name used by the textual codecs. Tags not known to this version are
//! carried as [`NodeKind::Unknown`] so that files written by newer producers
//! still load.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kind of a node in the build-log tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// The whole build; usually the root.
    Build,
    /// A project evaluated during the build.
    Project,
    /// A target executed within a project.
    Target,
    /// A task executed within a target.
    Task,
    /// An informational message.
    Message,
    /// A warning diagnostic.
    Warning,
    /// An error diagnostic.
    Error,
    /// A name/value property.
    Property,
    /// An item (file or other input) with optional metadata children.
    Item,
    /// A name/value metadata entry attached to an item.
    Metadata,
    /// A named grouping folder (e.g. "Properties", "Items").
    Folder,
    /// A node with no more specific kind.
    Generic,
    /// Placeholder for a tag introduced by a newer format version.
    ///
    /// The raw tag is preserved so the node is written back unchanged.
    Unknown(u8),
}

/// Reserved binary tag marking the end of a child list.
pub const END_OF_CHILDREN_TAG: u8 = 0;

/// Every kind this version understands, in tag order.
pub const KNOWN_KINDS: [NodeKind; 12] = [
    NodeKind::Build,
    NodeKind::Project,
    NodeKind::Target,
    NodeKind::Task,
    NodeKind::Message,
    NodeKind::Warning,
    NodeKind::Error,
    NodeKind::Property,
    NodeKind::Item,
    NodeKind::Metadata,
    NodeKind::Folder,
    NodeKind::Generic,
];

impl NodeKind {
    /// The one-byte tag used in the binary encoding.
    pub fn tag(self) -> u8 {
        match self {
            Self::Build => 1,
            Self::Project => 2,
            Self::Target => 3,
            Self::Task => 4,
            Self::Message => 5,
            Self::Warning => 6,
            Self::Error => 7,
            Self::Property => 8,
            Self::Item => 9,
            Self::Metadata => 10,
            Self::Folder => 11,
            Self::Generic => 12,
            Self::Unknown(tag) => tag,
        }
    }

    /// Resolve a binary tag. Returns `None` only for the reserved
    /// end-of-children tag; unrecognized tags become [`NodeKind::Unknown`].
    pub fn from_tag(tag: u8) -> Option<Self> {
        let kind = match tag {
            END_OF_CHILDREN_TAG => return None,
            1 => Self::Build,
            2 => Self::Project,
            3 => Self::Target,
            4 => Self::Task,
            5 => Self::Message,
            6 => Self::Warning,
            7 => Self::Error,
            8 => Self::Property,
            9 => Self::Item,
            10 => Self::Metadata,
            11 => Self::Folder,
            12 => Self::Generic,
            other => Self::Unknown(other),
        };
        Some(kind)
    }

    /// The stable text name used as the element / kind name in text formats.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "Build",
            Self::Project => "Project",
            Self::Target => "Target",
            Self::Task => "Task",
            Self::Message => "Message",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Property => "Property",
            Self::Item => "Item",
            Self::Metadata => "Metadata",
            Self::Folder => "Folder",
            Self::Generic => "Generic",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// Returns `true` for placeholder kinds read from a newer format.
    pub fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Rebuild a kind from its text name and, for placeholders, its raw tag.
    ///
    /// Returns `None` for unrecognized names, for `Unknown` without a tag,
    /// and for a tag that is reserved or belongs to a known kind.
    pub fn from_text(name: &str, tag: Option<u8>) -> Option<Self> {
        match (name, tag) {
            ("Unknown", Some(tag)) => match Self::from_tag(tag)? {
                kind @ Self::Unknown(_) => Some(kind),
                _ => None,
            },
            ("Unknown", None) => None,
            (name, None) => name.parse().ok(),
            (_, Some(_)) => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(tag) => write!(f, "Unknown({tag})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Error returned when parsing a kind name that is not recognized.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownKindName(pub String);

impl fmt::Display for UnknownKindName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node kind name: {}", self.0)
    }
}

impl std::error::Error for UnknownKindName {}

impl FromStr for NodeKind {
    type Err = UnknownKindName;

    /// Parses the names of known kinds. Placeholders cannot be parsed from
    /// a name alone; use [`NodeKind::from_text`] with the raw tag.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KNOWN_KINDS
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownKindName(s.to_string()))
    }
}
