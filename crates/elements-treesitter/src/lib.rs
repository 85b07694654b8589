#![warn(missing_docs)]
//! `elements-treesitter` - incremental Tree-sitter parsing for the elements language server.
//!
//! This crate keeps a document's syntax tree current as change batches arrive:
//!
//! - [`ChangeAnalyzer`] decides whether a batch is small enough for incremental reparsing
//! - [`replay_edits`] turns a batch into tree-sitter [`tree_sitter::InputEdit`]s
//! - [`IncrementalParser`] reparses, validates the result, and falls back to a full parse
//!
//! An incremental result that does not cover the whole content, or that contains error nodes, is
//! never returned.

mod analyzer;
mod edit;
mod incremental;

pub use analyzer::{ChangeAnalyzer, ChangeSummary, DEFAULT_MAX_CHANGE_SIZE, DEFAULT_MAX_CHANGES};
pub use edit::{EditReplay, input_edit, replay_edits, shift_offset};
pub use incremental::{
    IncrementalParser, ParseError, ParseOutcome, ParseStrategy, SyntaxTarget, first_error_node,
    validate_tree,
};
