//! Textual codecs for build-log trees.
//!
//! Three interchangeable renderings of the same [`Tree`](blt_tree::Tree):
//!
//! - [`XmlCodec`] -- one element per node, used for golden files
//! - [`JsonCodec`] -- nested objects for tooling
//! - [`OutlineCodec`] -- indented one-line-per-node dump, also the input to
//!   line-level reports
//!
//! All writers are deterministic and every reader accepts exactly what its
//! writer produces. [`TextFormat`] picks a codec by name, file extension or
//! content sniffing.

pub mod error;
pub mod format;
pub mod json;
pub mod outline;
pub mod xml;

pub use error::{TextError, TextResult};
pub use format::{read_detected, read_file, read_str, write_file, write_file_as, write_file_with, TextCodec, TextFormat};
pub use json::JsonCodec;
pub use outline::OutlineCodec;
pub use xml::{XmlCodec, XmlConfig};
