//! bookprep - Prepare a rendered XHTML book for print

use anyhow::{Context, Result};
use bookprep_core::{Config, Document};
use clap::{ArgAction, Parser};
use std::io::Write as _;
use std::path::PathBuf;

/// Build the table of contents and wrap long code lines in an XHTML book
#[derive(Parser, Debug)]
#[command(name = "bookprep")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the XHTML document
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long, value_name = "FILE", conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Overwrite the input file
    #[arg(long)]
    in_place: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum characters per code line
    #[arg(long, value_name = "N")]
    width: Option<usize>,

    /// Markup inserted at each wrap point
    #[arg(long, value_name = "MARKUP")]
    break_marker: Option<String>,

    /// Comma-separated selectors for TOC headings
    #[arg(long, value_name = "SELECTORS")]
    toc_selectors: Option<String>,

    /// Do not group the first top-level section as preface
    #[arg(long)]
    no_preface: bool,

    /// Skip table of contents generation
    #[arg(long)]
    no_toc: bool,

    /// Skip code line wrapping
    #[arg(long)]
    no_wrap: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Command line flags take precedence over the config file
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(width) = self.width {
            config.wrap.width = width;
        }
        if let Some(marker) = &self.break_marker {
            config.wrap.break_marker = marker.clone();
        }
        if let Some(selectors) = &self.toc_selectors {
            config.toc.selectors = selectors.clone();
        }
        if self.no_preface {
            config.toc.has_preface = false;
        }
        if self.no_toc {
            config.toc.enabled = false;
        }
        if self.no_wrap {
            config.wrap.enabled = false;
        }
    }

    fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };
    args.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    // Load document
    let mut doc = Document::load(&args.input)
        .with_context(|| format!("Failed to load document: {}", args.input.display()))?;

    let report = bookprep_core::run(&config, &mut doc)?;
    log::info!(
        "{}: {} TOC entries, {} of {} code lines wrapped",
        args.input.display(),
        report.toc_entries.len(),
        report.wrap.wrapped_lines,
        report.wrap.lines
    );

    let target = if args.in_place {
        Some(&args.input)
    } else {
        args.output.as_ref()
    };

    match target {
        Some(path) => doc.save(path)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(doc.to_xml().as_bytes())
                .context("Failed to write to stdout")?;
            stdout.flush()?;
        }
    }

    Ok(())
}
