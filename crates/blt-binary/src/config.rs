use serde::{Deserialize, Serialize};

use crate::format::FORMAT_MINOR;

/// How child lists are delimited on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    /// Format major 1: each record is followed by its child count.
    /// Requires the whole tree up front.
    ChildCount,
    /// Format major 2: children are closed by an end marker. Supports
    /// append-only writing while the build is still running.
    #[default]
    EndMarker,
}

impl Framing {
    /// The header major version that selects this framing.
    pub fn major(self) -> u16 {
        match self {
            Self::ChildCount => 1,
            Self::EndMarker => 2,
        }
    }

    pub fn from_major(major: u16) -> Option<Self> {
        match major {
            1 => Some(Self::ChildCount),
            2 => Some(Self::EndMarker),
            _ => None,
        }
    }
}

/// Flush strategy for the streaming writer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Flush after every record so concurrent readers see each node.
    EveryRecord,
    /// Rely on the sink's own buffering; flush on finish.
    #[default]
    OsDefault,
}

/// Configuration for binary log writers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Child-list delimiting; also picks the header major.
    pub framing: Framing,
    /// When the streaming writer flushes.
    pub sync_mode: SyncMode,
    /// Minor version stamped into the header.
    pub minor_version: u16,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            framing: Framing::default(),
            sync_mode: SyncMode::default(),
            minor_version: FORMAT_MINOR,
        }
    }
}

impl WriterConfig {
    /// Configuration for live capture: end-marker framing, flushed per record.
    pub fn live() -> Self {
        Self {
            sync_mode: SyncMode::EveryRecord,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = WriterConfig::default();
        assert_eq!(c.framing, Framing::EndMarker);
        assert_eq!(c.sync_mode, SyncMode::OsDefault);
        assert_eq!(c.minor_version, FORMAT_MINOR);
    }

    #[test]
    fn live_config_flushes_every_record() {
        assert_eq!(WriterConfig::live().sync_mode, SyncMode::EveryRecord);
    }

    #[test]
    fn framing_majors() {
        for framing in [Framing::ChildCount, Framing::EndMarker] {
            assert_eq!(Framing::from_major(framing.major()), Some(framing));
        }
        assert_eq!(Framing::from_major(9), None);
    }

    #[test]
    fn parses_from_toml_with_defaults() {
        let c: WriterConfig = toml::from_str("framing = \"child-count\"").unwrap();
        assert_eq!(c.framing, Framing::ChildCount);
        assert_eq!(c.sync_mode, SyncMode::OsDefault);

        let c: WriterConfig = toml::from_str("sync_mode = \"every-record\"\nminor_version = 7").unwrap();
        assert_eq!(c.framing, Framing::EndMarker);
        assert_eq!(c.sync_mode, SyncMode::EveryRecord);
        assert_eq!(c.minor_version, 7);
    }
}
