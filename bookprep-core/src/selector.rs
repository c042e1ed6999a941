//! Minimal CSS selector lists for picking headings and code blocks
//!
//! Supported syntax: type selectors, `*`, `.class`, `#id`, `[attr]`,
//! `[attr=value]`, the descendant combinator (whitespace) and the child
//! combinator (`>`). Selector lists are comma separated, as in CSS.

use anyhow::{bail, Result};
use std::borrow::Cow;

/// Read-only view of an element, as needed for selector matching
pub trait Element: Sized {
    fn local_name(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<Cow<'_, str>>;
    fn parent_element(&self) -> Option<Self>;

    fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// A comma-separated list of selectors; an element matches if any selector does
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Selector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    subject: Compound,
    /// Right-to-left: each entry links to the compound on its left
    ancestors: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeTest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeTest {
    name: String,
    value: Option<String>,
}

impl SelectorList {
    /// Parse a comma-separated selector list
    pub fn parse(input: &str) -> Result<Self> {
        let mut selectors = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                bail!("Empty selector in list: {input:?}");
            }
            selectors.push(parse_selector(part)?);
        }
        Ok(Self { selectors })
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Check whether an element matches any selector in the list
    pub fn matches<E: Element + Clone>(&self, element: &E) -> bool {
        self.selectors.iter().any(|selector| selector.matches(element))
    }
}

impl Selector {
    fn matches<E: Element + Clone>(&self, element: &E) -> bool {
        self.subject.matches(element) && match_ancestors(element, &self.ancestors)
    }
}

fn match_ancestors<E: Element + Clone>(element: &E, rest: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, compound), rest)) = rest.split_first() else {
        return true;
    };

    match combinator {
        Combinator::Child => element
            .parent_element()
            .is_some_and(|parent| compound.matches(&parent) && match_ancestors(&parent, rest)),
        Combinator::Descendant => {
            let mut current = element.parent_element();
            while let Some(ancestor) = current {
                if compound.matches(&ancestor) && match_ancestors(&ancestor, rest) {
                    return true;
                }
                current = ancestor.parent_element();
            }
            false
        }
    }
}

impl Compound {
    fn matches<E: Element>(&self, element: &E) -> bool {
        if let Some(tag) = &self.tag {
            if !element.local_name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.attribute("id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        self.attributes.iter().all(|test| match (&test.value, element.attribute(&test.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => actual == expected.as_str(),
        })
    }
}

fn parse_selector(input: &str) -> Result<Selector> {
    let mut compounds: Vec<Compound> = Vec::new();
    let mut combinators: Vec<Combinator> = Vec::new();
    let mut chars = input.chars().peekable();
    let mut pending: Option<Combinator> = None;

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            if pending.is_none() && !compounds.is_empty() {
                pending = Some(Combinator::Descendant);
            }
            continue;
        }
        if c == '>' {
            chars.next();
            if compounds.is_empty() {
                bail!("Selector {input:?} starts with a combinator");
            }
            pending = Some(Combinator::Child);
            continue;
        }

        if !compounds.is_empty() {
            match pending.take() {
                Some(combinator) => combinators.push(combinator),
                None => bail!("Unexpected {c:?} in selector {input:?}"),
            }
        }
        compounds.push(parse_compound(&mut chars, input)?);
    }

    if pending == Some(Combinator::Child) {
        bail!("Selector {input:?} ends with a combinator");
    }

    let Some(subject) = compounds.pop() else {
        bail!("Empty selector");
    };
    let ancestors = combinators.into_iter().rev().zip(compounds.into_iter().rev()).collect();

    Ok(Selector { subject, ancestors })
}

fn parse_compound(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    input: &str,
) -> Result<Compound> {
    let mut compound = Compound::default();
    let mut empty = true;

    match chars.peek() {
        Some('*') => {
            chars.next();
            empty = false;
        }
        Some(c) if is_ident_char(*c) => {
            compound.tag = Some(take_ident(chars));
            empty = false;
        }
        _ => {}
    }

    while let Some(&c) = chars.peek() {
        match c {
            '.' => {
                chars.next();
                let class = take_ident(chars);
                if class.is_empty() {
                    bail!("Missing class name in selector {input:?}");
                }
                compound.classes.push(class);
            }
            '#' => {
                chars.next();
                let id = take_ident(chars);
                if id.is_empty() {
                    bail!("Missing id in selector {input:?}");
                }
                compound.id = Some(id);
            }
            '[' => {
                chars.next();
                compound.attributes.push(parse_attribute_test(chars, input)?);
            }
            _ => break,
        }
        empty = false;
    }

    if empty {
        bail!("Unsupported selector syntax: {input:?}");
    }
    Ok(compound)
}

fn parse_attribute_test(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    input: &str,
) -> Result<AttributeTest> {
    let name = take_ident(chars);
    if name.is_empty() {
        bail!("Missing attribute name in selector {input:?}");
    }

    match chars.next() {
        Some(']') => Ok(AttributeTest { name, value: None }),
        Some('=') => {
            let value = match chars.peek() {
                Some(&quote @ ('"' | '\'')) => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == quote => break,
                            Some(c) => value.push(c),
                            None => bail!("Unterminated string in selector {input:?}"),
                        }
                    }
                    value
                }
                _ => take_ident(chars),
            };
            if chars.next() != Some(']') {
                bail!("Expected ']' in selector {input:?}");
            }
            Ok(AttributeTest {
                name,
                value: Some(value),
            })
        }
        _ => bail!("Malformed attribute selector in {input:?}"),
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Element fixture: a chain of (tag, attributes) from the element up to the root
    #[derive(Clone)]
    struct Chain<'a> {
        nodes: &'a [(&'a str, &'a [(&'a str, &'a str)])],
    }

    impl Element for Chain<'_> {
        fn local_name(&self) -> &str {
            self.nodes[0].0
        }

        fn attribute(&self, name: &str) -> Option<Cow<'_, str>> {
            self.nodes[0]
                .1
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| Cow::Borrowed(*value))
        }

        fn parent_element(&self) -> Option<Self> {
            let nodes = self.nodes;
            (nodes.len() > 1).then(|| Chain { nodes: &nodes[1..] })
        }
    }

    #[test]
    fn test_parse_list() {
        let list = SelectorList::parse(".preface h1,.chapter h1,.chapter h2,.appendix h1").unwrap();
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_descendant_match() {
        let list = SelectorList::parse(".chapter h1").unwrap();
        let nested = Chain {
            nodes: &[
                ("h1", &[("id", "ch1")]),
                ("section", &[]),
                ("div", &[("class", "chapter intro")]),
                ("body", &[]),
            ],
        };
        assert!(list.matches(&nested));

        let outside = Chain {
            nodes: &[("h1", &[]), ("div", &[("class", "preface")])],
        };
        assert!(!list.matches(&outside));
    }

    #[test]
    fn test_child_combinator() {
        let list = SelectorList::parse("div > h2").unwrap();
        let direct = Chain {
            nodes: &[("h2", &[]), ("div", &[])],
        };
        let indirect = Chain {
            nodes: &[("h2", &[]), ("section", &[]), ("div", &[])],
        };
        assert!(list.matches(&direct));
        assert!(!list.matches(&indirect));
    }

    #[test]
    fn test_code_pre_requires_code_ancestor() {
        let list = SelectorList::parse("code pre").unwrap();
        let inside = Chain {
            nodes: &[("pre", &[]), ("code", &[])],
        };
        let bare = Chain {
            nodes: &[("pre", &[]), ("body", &[])],
        };
        assert!(list.matches(&inside));
        assert!(!list.matches(&bare));
    }

    #[test]
    fn test_id_class_and_attribute() {
        let list = SelectorList::parse("h1#intro.appendix-title[data-kind='x']").unwrap();
        let hit = Chain {
            nodes: &[(
                "H1",
                &[("id", "intro"), ("class", "appendix-title"), ("data-kind", "x")],
            )],
        };
        let miss = Chain {
            nodes: &[("h1", &[("id", "intro"), ("class", "appendix-title")])],
        };
        assert!(list.matches(&hit));
        assert!(!list.matches(&miss));
    }

    #[test]
    fn test_universal_and_presence() {
        let list = SelectorList::parse("*[id]").unwrap();
        assert!(list.matches(&Chain {
            nodes: &[("p", &[("id", "x")])],
        }));
        assert!(!list.matches(&Chain {
            nodes: &[("p", &[])],
        }));
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("h1,,h2").is_err());
        assert!(SelectorList::parse("> h1").is_err());
        assert!(SelectorList::parse("h1 >").is_err());
        assert!(SelectorList::parse("h1:hover").is_err());
        assert!(SelectorList::parse("[id").is_err());
        assert!(SelectorList::parse(".").is_err());
    }
}
