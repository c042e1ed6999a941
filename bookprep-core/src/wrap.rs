//! Soft line breaks for long lines in preformatted code blocks
//!
//! Lengths are measured in characters, not display columns. A line is only
//! touched when its trimmed length is strictly greater than the width.

use anyhow::{Context, Result};

use crate::config::WrapConfig;
use crate::selector::SelectorList;
use crate::tree::BookTree;

/// Counters reported by [`wrap_code_blocks`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WrapStats {
    pub blocks: usize,
    pub lines: usize,
    pub wrapped_lines: usize,
}

/// Rewrite the content of every code block matched by the configured selector
pub fn wrap_code_blocks<T: BookTree>(config: &WrapConfig, tree: &mut T) -> Result<WrapStats> {
    let selectors =
        SelectorList::parse(&config.code_selector).context("Invalid code block selector")?;
    let blocks = tree.select(&selectors);

    let mut stats = WrapStats::default();
    for block in blocks {
        let content = tree.inner_markup(block);
        let (wrapped, block_stats) = wrap_block(&content, config.width, &config.break_marker);
        log::debug!(
            "Code block {:?}: {} of {} lines wrapped",
            block,
            block_stats.wrapped_lines,
            block_stats.lines
        );
        tree.set_inner_markup(block, wrapped);

        stats.blocks += 1;
        stats.lines += block_stats.lines;
        stats.wrapped_lines += block_stats.wrapped_lines;
    }

    Ok(stats)
}

/// Wrap every line of a block of text.
///
/// Every piece produced by splitting on `\n` is emitted, so a block ending in
/// a newline gains one more. Lines split on characters get no newline after
/// them, which joins them with the following line.
pub fn wrap_block(content: &str, width: usize, marker: &str) -> (String, WrapStats) {
    let mut out = String::with_capacity(content.len() + content.len() / 8);
    let mut stats = WrapStats {
        blocks: 1,
        ..WrapStats::default()
    };

    for line in content.split('\n') {
        stats.lines += 1;
        if wrap_line(line, width, marker, &mut out) {
            stats.wrapped_lines += 1;
        }
    }

    (out, stats)
}

/// Append one line to `out`, wrapped if needed. Returns whether it was wrapped.
pub fn wrap_line(line: &str, width: usize, marker: &str, out: &mut String) -> bool {
    let trimmed = trim_line(line);
    if trimmed.chars().count() <= width {
        out.push_str(line);
        out.push('\n');
        return false;
    }

    if trimmed.contains(' ') {
        wrap_on_spaces(trimmed, width, marker, out);
    } else {
        split_on_chars(trimmed, width, marker, out);
    }
    true
}

/// Strip surrounding whitespace, including a byte order mark
fn trim_line(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

/// Greedy word wrap on single spaces
fn wrap_on_spaces(trimmed: &str, width: usize, marker: &str, out: &mut String) {
    let mut buffer = String::new();
    let mut buffer_len = 0usize;

    for word in trimmed.split(' ') {
        let word_len = word.chars().count();
        if buffer_len + word_len > width {
            buffer.push_str(marker);
            out.push_str(&buffer);
            buffer.clear();
            buffer.push_str(word);
            buffer_len = word_len;
        } else {
            buffer.push(' ');
            buffer.push_str(word);
            buffer_len += 1 + word_len;
        }
    }

    out.push_str(&buffer);
    out.push('\n');
}

/// Hard split for a single token longer than the width.
///
/// A marker follows every full chunk, including the last one.
fn split_on_chars(trimmed: &str, width: usize, marker: &str, out: &mut String) {
    let mut count = 0usize;
    for c in trimmed.chars() {
        out.push(c);
        count += 1;
        if count == width {
            out.push_str(marker);
            count = 0;
        }
    }
}
