//! bookprep core - Document tree, TOC generation and code line wrapping
//!
//! This crate prepares a rendered book (XHTML) for print:
//! - Arena-backed document tree parsed with quick-xml
//! - Selector matching for headings and code blocks
//! - Table of contents generation into an insertion point
//! - Soft line breaks for long lines in code blocks
//! - Configuration management

pub mod config;
pub mod dom;
pub mod run;
pub mod selector;
pub mod toc;
pub mod tree;
pub mod wrap;

// Re-export commonly used types
pub use config::Config;
pub use dom::Document;
pub use run::{run, RunReport};
pub use tree::BookTree;
