//! # Xedit Model
//!
//! The in-memory XML document: an arena of element, attribute and text
//! nodes with parent handles, plus canonical parsing and serialization.
//!
//! ```rust,ignore
//! use xedit_model::{parse_document, ResolveByTagName};
//!
//! let doc = parse_document("<entry><sense>x</sense></entry>", &ResolveByTagName)?;
//! assert_eq!(doc.root().get_text(), "x");
//! assert_eq!(doc.to_xml(), "<entry><sense xml:space='preserve'>x</sense></entry>");
//! ```

pub mod document;
pub mod error;
pub mod id_generator;
pub mod node_ref;
pub mod parser;
pub mod serializer;
pub mod tree;

pub use document::{load_or_placeholder, Document, Namespaces, PLACEHOLDER_DOCUMENT};
pub use error::{ModelError, ModelResult};
pub use id_generator::{IdGenerator, NodeId};
pub use node_ref::{AttributeRef, ElementRef, NodeRef, TextRef};
pub use parser::{parse_document, parse_into, ResolveByTagName, ResolveElementId};
pub use serializer::{escape, serialize_document, serialize_node, Serializer};
pub use tree::{ElementData, NodeData, NodeKind, Tree};
