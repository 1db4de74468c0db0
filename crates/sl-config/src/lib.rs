//! Scenario document loading
//!
//! A scenario document bundles everything needed to run a timeline:
//!
//! ```yaml
//! config:
//!   loop: false
//!   vibration_mode: once
//!   mode: auto
//! initial_values:
//!   opacity: 0
//! blocks:
//!   pulse:
//!     - { type: move, target: scale, to: 1.2, duration: 100 }
//!     - { type: move, target: scale, to: 1.0, duration: 100 }
//! scenario:
//!   - { type: use, block: pulse }
//!   - { type: move, target: opacity, to: 1, duration: 500 }
//! ```
//!
//! JSON documents load through the same path. Two YAML tags are supported:
//!
//! - `!include path` - Replace the node with the content of another file
//! - `!include_dir_named dir` - Mapping of file stem to file content, handy
//!   for keeping each block in its own file

mod document;
mod error;
mod loader;

pub use document::ScenarioDocument;
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_document, load_document_str, DocumentLoader};
