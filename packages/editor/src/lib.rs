//! # Xedit Editor
//!
//! Structural editing of XML documents under a schema.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ model: XML text ↔ node arena                │
//! └─────────────────────────────────────────────┘
//!                     ↓ render
//! ┌─────────────────────────────────────────────┐
//! │ view: arena + per-node display state        │
//! │  - refresh restores display invariants      │
//! │  - harvest reconstructs model nodes         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: focus, bubble, drag, operations    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **The view is the source of truth**: the XML is harvested from it
//! 2. **Every edit settles**: cache cleared, refresh, validation, notification
//! 3. **Preconditions decline**: a failed precondition changes nothing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xedit_editor::{EditorConfig, EditorSession};
//! use xedit_schema::Schema;
//!
//! let (mut session, _) = EditorSession::load("<a><b/><b/></a>", Schema::default(), EditorConfig::default());
//! let second = session.view().tree().children(session.view().root_id())[1];
//! session.merge_with_previous(second);
//! assert_eq!(session.to_xml(), "<a><b/></a>");
//! ```

pub mod bubble;
pub mod config;
pub mod constraints;
pub mod drop_targets;
pub mod errors;
pub mod focus;
pub mod harvest;
pub mod operations;
pub mod refresh;
pub mod remote;
pub mod render;
pub mod session;
pub mod view;

pub use bubble::{Bubble, BubbleContent, MenuEntry};
pub use config::EditorConfig;
pub use drop_targets::Gap;
pub use errors::{EditorError, EditorResult};
pub use focus::{units, Focus, Key, KeyEvent};
pub use harvest::{Harvest, HarvestCache};
pub use operations::TextSelection;
pub use remote::{RemoteSource, StaticSource};
pub use session::{DragState, EditorSession, KeyResponse, Outcome};
pub use view::{View, ViewState};
