//! Table of Contents generation from document headings

use anyhow::{Context, Result};
use std::fmt;

use crate::config::TocConfig;
use crate::selector::SelectorList;
use crate::tree::BookTree;

/// Class attribute value marking a heading as an appendix title
pub const APPENDIX_CLASS: &str = "appendix-title";

/// Heading levels eligible for the TOC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingLevel {
    /// Parse a tag name, ignoring case and any namespace prefix
    pub fn from_tag(tag: &str) -> Option<Self> {
        let local = tag.rsplit_once(':').map_or(tag, |(_, local)| local);
        match local.to_ascii_lowercase().as_str() {
            "h1" => Some(Self::H1),
            "h2" => Some(Self::H2),
            "h3" => Some(Self::H3),
            "h4" => Some(Self::H4),
            "h5" => Some(Self::H5),
            "h6" => Some(Self::H6),
            _ => None,
        }
    }

    /// Upper-case tag name, as used in TOC class names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H1 => "H1",
            Self::H2 => "H2",
            Self::H3 => "H3",
            Self::H4 => "H4",
            Self::H5 => "H5",
            Self::H6 => "H6",
        }
    }

    pub fn is_top_level(&self) -> bool {
        *self == Self::H1
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Style grouping of a TOC entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocCategory {
    Preface,
    Appendix,
    Normal,
}

impl TocCategory {
    /// Preface wins over appendix, appendix over normal
    pub fn classify(top_level_seen: usize, has_preface: bool, is_appendix: bool) -> Self {
        if top_level_seen == 1 && has_preface {
            Self::Preface
        } else if is_appendix {
            Self::Appendix
        } else {
            Self::Normal
        }
    }

    fn class_prefix(&self) -> Option<&'static str> {
        match self {
            Self::Preface => Some("toc-preface"),
            Self::Appendix => Some("toc-appendix"),
            Self::Normal => None,
        }
    }
}

/// A generated TOC list item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: HeadingLevel,
    pub id: String,
    pub category: TocCategory,
}

impl TocEntry {
    /// In-document link target
    pub fn href(&self) -> String {
        format!("#{}", self.id)
    }

    /// Class attribute of the list item, e.g. `toc-preface levelH1`
    pub fn class_name(&self) -> String {
        match self.category.class_prefix() {
            Some(prefix) => format!("{prefix} level{}", self.level),
            None => format!("level{}", self.level),
        }
    }
}

/// Append one list item per eligible heading to the insertion point.
///
/// Headings without a non-empty `id` cannot be linked to and are skipped.
/// The insertion point is only looked up once there is something to append.
pub fn build_toc<T: BookTree>(config: &TocConfig, tree: &mut T) -> Result<Vec<TocEntry>> {
    let selectors = SelectorList::parse(&config.selectors).context("Invalid TOC selectors")?;
    let headings = tree.select(&selectors);

    let mut entries = Vec::new();
    let mut container: Option<T::Node> = None;
    let mut top_level_seen = 0usize;

    for heading in headings {
        let Some(id) = tree
            .attribute(heading, "id")
            .filter(|id| !id.is_empty())
            .map(|id| id.into_owned())
        else {
            continue;
        };

        let Some(level) = tree.tag_name(heading).and_then(HeadingLevel::from_tag) else {
            log::debug!(
                "Skipping #{id}: <{}> is not a heading",
                tree.tag_name(heading).unwrap_or_default()
            );
            continue;
        };

        if level.is_top_level() {
            top_level_seen += 1;
        }

        let category = TocCategory::classify(
            top_level_seen,
            config.has_preface,
            tree.attribute(heading, "class").as_deref() == Some(APPENDIX_CLASS),
        );
        let entry = TocEntry {
            level,
            id,
            category,
        };

        let target = match container {
            Some(target) => target,
            None => {
                let target = tree.element_by_id(&config.insert_id).with_context(|| {
                    format!("TOC insertion point #{} not found", config.insert_id)
                })?;
                container = Some(target);
                target
            }
        };

        append_entry(tree, target, heading, &entry);
        log::debug!("TOC entry {} ({})", entry.href(), entry.class_name());
        entries.push(entry);
    }

    if container.is_none() && tree.element_by_id(&config.insert_id).is_none() {
        log::warn!("TOC insertion point #{} not found", config.insert_id);
    }

    Ok(entries)
}

fn append_entry<T: BookTree>(tree: &mut T, target: T::Node, heading: T::Node, entry: &TocEntry) {
    let class_name = entry.class_name();
    let href = entry.href();

    let item = tree.create_element("li", &[("class", class_name.as_str())]);
    let link = tree.create_element("a", &[("href", href.as_str())]);
    tree.copy_children(heading, link);
    tree.append_child(item, link);
    tree.append_child(target, item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    fn config(selectors: &str, has_preface: bool) -> TocConfig {
        TocConfig {
            selectors: selectors.to_string(),
            has_preface,
            ..TocConfig::default()
        }
    }

    fn toc_items(doc: &Document) -> Vec<(String, String)> {
        let toc = doc.element_by_id("insert-toc").unwrap();
        doc.children(toc)
            .iter()
            .map(|&li| {
                let class = doc.attribute(li, "class").unwrap().into_owned();
                (class, doc.inner_markup(li))
            })
            .collect()
    }

    #[test]
    fn test_no_headings_gives_empty_toc() -> Result<()> {
        let mut doc = Document::parse("<body><ul id=\"insert-toc\"/><p>text</p></body>")?;
        let entries = build_toc(&TocConfig::default(), &mut doc)?;
        assert!(entries.is_empty());
        assert!(toc_items(&doc).is_empty());
        Ok(())
    }

    #[test]
    fn test_three_chapters_without_preface() -> Result<()> {
        let mut doc = Document::parse(
            "<body><ul id=\"insert-toc\"></ul>\
             <div class=\"chapter\"><h1 id=\"ch1\">One</h1></div>\
             <div class=\"chapter\"><h1 id=\"ch2\">Two</h1></div>\
             <div class=\"chapter\"><h1 id=\"ch3\">Three</h1></div></body>",
        )?;
        let entries = build_toc(&config(".chapter h1", false), &mut doc)?;

        assert_eq!(entries.len(), 3);
        let hrefs: Vec<_> = entries.iter().map(TocEntry::href).collect();
        assert_eq!(hrefs, vec!["#ch1", "#ch2", "#ch3"]);
        assert!(entries.iter().all(|e| e.category != TocCategory::Preface));

        let items = toc_items(&doc);
        assert_eq!(items[0], ("levelH1".to_string(), "<a href=\"#ch1\">One</a>".to_string()));
        assert!(items.iter().all(|(class, _)| !class.contains("toc-preface")));
        Ok(())
    }

    #[test]
    fn test_skips_headings_without_id() -> Result<()> {
        let mut doc = Document::parse(
            "<body><ul id=\"insert-toc\"/>\
             <div class=\"chapter\"><h1>No id</h1><h1 id=\"\">Empty</h1><h2 id=\"s1\">Sub</h2></div></body>",
        )?;
        let entries = build_toc(&config(".chapter h1,.chapter h2", false), &mut doc)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "s1");
        assert_eq!(entries[0].level, HeadingLevel::H2);
        Ok(())
    }

    #[test]
    fn test_preface_grouping_follows_first_top_level_heading() -> Result<()> {
        let mut doc = Document::parse(
            "<body><ol id=\"insert-toc\"/>\
             <div class=\"preface\"><h1 id=\"pre\">Preface</h1></div>\
             <div class=\"chapter\"><h2 id=\"pre-sub\">Before chapter one</h2>\
             <h1 id=\"ch1\">Chapter</h1><h2 id=\"ch1-sub\">Section</h2></div>\
             <div class=\"appendix\"><h1 id=\"app\" class=\"appendix-title\">Appendix</h1></div></body>",
        )?;
        build_toc(&TocConfig::default(), &mut doc)?;

        let classes: Vec<_> = toc_items(&doc).into_iter().map(|(class, _)| class).collect();
        assert_eq!(
            classes,
            vec![
                "toc-preface levelH1",
                "toc-preface levelH2",
                "levelH1",
                "levelH2",
                "toc-appendix levelH1",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_preface_beats_appendix() -> Result<()> {
        let mut doc = Document::parse(
            "<body><ul id=\"insert-toc\"/>\
             <div class=\"appendix\"><h1 id=\"a\" class=\"appendix-title\">A</h1>\
             <h1 id=\"b\" class=\"appendix-title\">B</h1></div></body>",
        )?;
        let entries = build_toc(&config(".appendix h1", true), &mut doc)?;
        assert_eq!(entries[0].category, TocCategory::Preface);
        assert_eq!(entries[1].category, TocCategory::Appendix);
        Ok(())
    }

    #[test]
    fn test_appendix_requires_exact_class_value() -> Result<()> {
        let mut doc = Document::parse(
            "<body><ul id=\"insert-toc\"/>\
             <div class=\"appendix\"><h1 id=\"p\">P</h1>\
             <h1 id=\"a\" class=\"appendix-title extra\">A</h1>\
             <h1 id=\"b\" class=\"appendix-title\">B</h1></div></body>",
        )?;
        build_toc(&config(".appendix h1", true), &mut doc)?;

        let classes: Vec<_> = toc_items(&doc).into_iter().map(|(class, _)| class).collect();
        assert_eq!(
            classes,
            vec!["toc-preface levelH1", "levelH1", "toc-appendix levelH1"]
        );
        Ok(())
    }

    #[test]
    fn test_link_keeps_inline_markup() -> Result<()> {
        let mut doc = Document::parse(
            "<body><ul id=\"insert-toc\"/>\
             <div class=\"chapter\"><h1 id=\"c\">Using <em>traits</em> &amp; <code>impl</code></h1></div></body>",
        )?;
        build_toc(&config(".chapter h1", false), &mut doc)?;

        let items = toc_items(&doc);
        assert_eq!(
            items[0].1,
            "<a href=\"#c\">Using <em>traits</em> &amp; <code>impl</code></a>"
        );
        // Heading itself is untouched
        let heading = doc.element_by_id("c").unwrap();
        assert_eq!(
            doc.inner_markup(heading),
            "Using <em>traits</em> &amp; <code>impl</code>"
        );
        Ok(())
    }

    #[test]
    fn test_non_heading_matches_are_skipped() -> Result<()> {
        let mut doc = Document::parse(
            "<body><ul id=\"insert-toc\"/>\
             <div class=\"chapter\"><p id=\"p1\">Para</p><h3 id=\"h\">Deep</h3></div></body>",
        )?;
        let entries = build_toc(&config(".chapter *", false), &mut doc)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].class_name(), "levelH3");
        Ok(())
    }

    #[test]
    fn test_missing_insertion_point_errors_only_when_needed() -> Result<()> {
        let mut empty = Document::parse("<body><p>nothing</p></body>")?;
        assert!(build_toc(&TocConfig::default(), &mut empty)?.is_empty());

        let mut doc =
            Document::parse("<body><div class=\"chapter\"><h1 id=\"c\">C</h1></div></body>")?;
        let err = build_toc(&TocConfig::default(), &mut doc).unwrap_err();
        assert!(err.to_string().contains("insert-toc"));
        Ok(())
    }

    #[test]
    fn test_classify_priority() {
        assert_eq!(TocCategory::classify(1, true, true), TocCategory::Preface);
        assert_eq!(TocCategory::classify(1, false, true), TocCategory::Appendix);
        assert_eq!(TocCategory::classify(2, true, true), TocCategory::Appendix);
        assert_eq!(TocCategory::classify(0, true, false), TocCategory::Normal);
    }

    #[test]
    fn test_heading_level_from_tag() {
        assert_eq!(HeadingLevel::from_tag("h1"), Some(HeadingLevel::H1));
        assert_eq!(HeadingLevel::from_tag("H6"), Some(HeadingLevel::H6));
        assert_eq!(HeadingLevel::from_tag("xhtml:h2"), Some(HeadingLevel::H2));
        assert_eq!(HeadingLevel::from_tag("h7"), None);
        assert_eq!(HeadingLevel::from_tag("div"), None);
    }
}
