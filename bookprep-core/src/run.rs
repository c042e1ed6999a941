//! Single entry point running both passes over a ready document

use anyhow::{Context, Result};

use crate::config::Config;
use crate::toc::{self, TocEntry};
use crate::tree::BookTree;
use crate::wrap::{self, WrapStats};

/// What a run changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub toc_entries: Vec<TocEntry>,
    pub wrap: WrapStats,
}

/// Build the table of contents, then wrap long code lines.
///
/// Call once the host has a fully parsed tree. Disabled passes are skipped.
pub fn run<T: BookTree>(config: &Config, tree: &mut T) -> Result<RunReport> {
    let mut report = RunReport::default();

    if config.toc.enabled {
        report.toc_entries =
            toc::build_toc(&config.toc, tree).context("Failed to build table of contents")?;
        log::info!("Added {} TOC entries", report.toc_entries.len());
    }

    if config.wrap.enabled {
        report.wrap =
            wrap::wrap_code_blocks(&config.wrap, tree).context("Failed to wrap code blocks")?;
        log::info!(
            "Wrapped {} lines across {} code blocks",
            report.wrap.wrapped_lines,
            report.wrap.blocks
        );
    }

    Ok(report)
}
