#![warn(missing_docs)]
//! `elements-core` - document coordinates and change events for the elements language server.
//!
//! This crate has no parser dependency. It provides:
//!
//! - LSP-style [`Position`] / [`Range`] values and clamping conversions to byte offsets
//! - [`ChangeEvent`] batches and sequential application to text
//! - [`LanguageId`] detection from document URIs

pub mod change;
pub mod language;
pub mod position;
pub mod uri;

pub use change::{ChangeEvent, apply_change, apply_changes};
pub use language::LanguageId;
pub use position::{
    Position, Range, advance_point, byte_to_position, bytes_to_range, line_at, point_for_byte,
    position_to_byte, range_to_bytes,
};
pub use uri::{uri_extension, uri_path};
