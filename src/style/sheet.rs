//! Stylesheet parsing and simple selector matching.
//!
//! A selector is a conjunction of an optional tag, any number of classes and
//! an optional id (`p.note#intro`), or `*`. Anything involving combinators,
//! attributes or pseudo-classes is kept out of the rule list entirely.

use super::Style;
use crate::markup::Element;
use log::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub id: Option<String>,
}

impl Selector {
    /// Parse one compound selector. `None` for unsupported syntax.
    pub fn parse(text: &str) -> Option<Selector> {
        let text = text.trim();
        if text.is_empty()
            || text
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '>' | '+' | '~' | '[' | ':' | '('))
        {
            return None;
        }

        let mut selector = Selector::default();
        let mut rest = text;
        if let Some(after) = rest.strip_prefix('*') {
            rest = after;
        }
        let tag_end = rest.find(['.', '#']).unwrap_or(rest.len());
        if tag_end > 0 {
            selector.tag = Some(rest[..tag_end].to_ascii_lowercase());
        }
        rest = &rest[tag_end..];

        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return None;
            }
            match marker {
                '.' => selector.classes.push(name.to_string()),
                _ => selector.id = Some(name.to_string()),
            }
            rest = &body[end..];
        }
        Some(selector)
    }

    /// Every listed part must be present on the element.
    pub fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if element.tag != *tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| element.has_class(c))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selectors: Vec<Selector>,
    pub style: Style,
}

impl Rule {
    pub fn matches(&self, element: &Element) -> bool {
        self.selectors.iter().any(|s| s.matches(element))
    }
}

/// Rules in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Stylesheet {
        let css = strip_comments(css);
        let mut rules = Vec::new();
        let mut rest = css.as_str();

        while let Some(open) = rest.find('{') {
            let prelude = rest[..open].trim();
            let after = &rest[open + 1..];

            if prelude.starts_with('@') {
                // At-rules are skipped together with any nested blocks.
                let end = matching_brace(after).unwrap_or(after.len());
                debug!("skipping at-rule {}", prelude);
                rest = after.get(end + 1..).unwrap_or("");
                continue;
            }

            let close = after.find('}').unwrap_or(after.len());
            let body = &after[..close];
            rest = after.get(close + 1..).unwrap_or("");

            let selectors: Vec<Selector> = prelude
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| {
                    let parsed = Selector::parse(s);
                    if parsed.is_none() {
                        debug!("unsupported selector {:?}", s);
                    }
                    parsed
                })
                .collect();
            if selectors.is_empty() {
                continue;
            }
            rules.push(Rule {
                selectors,
                style: Style::parse_declarations(body),
            });
        }

        Stylesheet { rules }
    }

    /// Matching rules for `element`, in source order.
    pub fn matching<'a>(&'a self, element: &'a Element) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |r| r.matches(element))
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = match rest[start + 2..].find("*/") {
            Some(end) => &rest[start + 2 + end + 2..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

/// Index of the `}` closing a block whose `{` was just consumed.
fn matching_brace(body: &str) -> Option<usize> {
    let mut depth = 1;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::tokenizer::parse_attributes;
    use crate::style::values::{Color, Dimension};

    fn element(tag: &str, attrs: &str) -> Element {
        Element {
            tag: tag.to_string(),
            attrs: parse_attributes(attrs),
        }
    }

    #[test]
    fn parses_compound_selectors() {
        let s = Selector::parse("P.note.big#intro").unwrap();
        assert_eq!(s.tag.as_deref(), Some("p"));
        assert_eq!(s.classes, vec!["note", "big"]);
        assert_eq!(s.id.as_deref(), Some("intro"));

        let s = Selector::parse(".a").unwrap();
        assert!(s.tag.is_none());
        assert_eq!(s.classes, vec!["a"]);

        assert_eq!(Selector::parse("*"), Some(Selector::default()));
        assert!(Selector::parse("div p").is_none());
        assert!(Selector::parse("a:hover").is_none());
        assert!(Selector::parse("p.").is_none());
    }

    #[test]
    fn matching_is_conjunctive() {
        let el = element("p", r#"class="note big" id="intro""#);
        assert!(Selector::parse("p").unwrap().matches(&el));
        assert!(Selector::parse(".big.note").unwrap().matches(&el));
        assert!(Selector::parse("#intro").unwrap().matches(&el));
        assert!(Selector::parse("*").unwrap().matches(&el));
        assert!(!Selector::parse("div.note").unwrap().matches(&el));
        assert!(!Selector::parse("p.note.small").unwrap().matches(&el));
        assert!(!Selector::parse("p#other").unwrap().matches(&el));
    }

    #[test]
    fn parses_rules_in_order() {
        let sheet = Stylesheet::parse(
            "p { color: #ff0000; } .big, h1 { font-size: 20px }\n/* note */ div>p { color: #000 }",
        );
        assert_eq!(sheet.rules.len(), 2);
        assert_eq!(sheet.rules[0].style.color, Some(Color::rgba(255, 0, 0, 1.0)));
        assert_eq!(sheet.rules[1].selectors.len(), 2);
        assert_eq!(sheet.rules[1].style.font_size, Some(Dimension::Pt(15.0)));
    }

    #[test]
    fn skips_at_rules_and_comments() {
        let sheet = Stylesheet::parse(
            "@media print { p { color: #fff } } /* p { width: 1pt } */ p { width: 2pt }",
        );
        assert_eq!(sheet.rules.len(), 1);
        assert_eq!(sheet.rules[0].style.width, Some(Dimension::Pt(2.0)));
    }

    #[test]
    fn unterminated_block_is_tolerated() {
        let sheet = Stylesheet::parse("p { color: #00f");
        assert_eq!(sheet.rules.len(), 1);
        assert!(Stylesheet::parse("garbage without braces").rules.is_empty());
    }

    #[test]
    fn matching_iterates_in_source_order() {
        let sheet = Stylesheet::parse(".a { width: 1pt } div { width: 2pt } .b { width: 3pt }");
        let el = element("div", r#"class="a""#);
        let widths: Vec<_> = sheet.matching(&el).map(|r| r.style.width).collect();
        assert_eq!(
            widths,
            vec![Some(Dimension::Pt(1.0)), Some(Dimension::Pt(2.0))]
        );
    }
}
