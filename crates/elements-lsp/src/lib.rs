#![warn(missing_docs)]
//! `elements-lsp` - the document core of the elements language server.
//!
//! - [`DocumentStore`] tracks open documents and keeps their syntax trees current, locking per URI
//! - [`LanguageHandler`]s create HTML, TypeScript and TSX documents and pool their parsers
//! - [`CompletionContextAnalyzer`] classifies what the cursor is completing, including inside
//!   `html` tagged templates
//! - [`elements`] finds custom elements and import insertion points
//!
//! Parse decisions are delegated to [`elements_treesitter::IncrementalParser`].

pub mod completion;
pub mod config;
pub mod document;
pub mod elements;
pub mod handler;
pub mod logging;
pub mod script;
pub mod store;
mod syntax;
pub mod template;

pub use completion::{
    CompletionContext, CompletionContextAnalyzer, CompletionKind, is_custom_element_tag,
};
pub use config::{ConfigError, IncrementalConfig, ServerConfig};
pub use document::{Document, DocumentKind, DocumentSnapshot, MarkupMetadata};
pub use elements::{AttributeMatch, CustomElementMatch};
pub use handler::{HandlerError, HandlerKind, LanguageHandler, MAX_POOLED_PARSERS};
pub use script::{ImportKind, ImportMap, ImportStatement, ScriptTag};
pub use store::DocumentStore;
pub use template::{TemplateParser, TemplateRegion};

pub use elements_core::{ChangeEvent, LanguageId, Position, Range};
pub use elements_treesitter::ParseStrategy;
