//! Next-control candidates: parsing and detection.
//!
//! The configured candidate list is comma-separated. Each entry is either a
//! CSS selector or `tag:has-text('Label')`, which matches an element by its
//! visible label. Detection runs against rendered HTML with `scraper` and
//! resolves the winning element to a concrete CSS path the renderer can
//! click.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::sync::LazyLock;

use crate::error::{ConfigError, ConfigResult};

static RE_HAS_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?P<tag>[a-zA-Z][a-zA-Z0-9]*)?:has-text\(\s*["'](?P<label>[^"']+)["']\s*\)$"#)
        .unwrap()
});

static RE_SIMPLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap());

/// One next-control candidate.
#[derive(Debug, Clone)]
pub enum NextControl {
    /// Plain CSS selector
    Css { source: String, selector: Selector },

    /// Element whose visible label equals `label` (case-insensitive,
    /// surrounding arrows and punctuation ignored)
    Text { tag: Option<String>, label: String },
}

impl fmt::Display for NextControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css { source, .. } => f.write_str(source),
            Self::Text { tag, label } => {
                write!(f, "{}:has-text('{}')", tag.as_deref().unwrap_or(""), label)
            }
        }
    }
}

/// A candidate found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedControl {
    /// Index into the candidate list
    pub index: usize,

    /// CSS path of the matched element
    pub click_selector: String,
}

/// Parse a comma-separated candidate list.
///
/// Commas inside quotes, brackets or parentheses do not split.
pub fn parse_next_controls(list: &str) -> ConfigResult<Vec<NextControl>> {
    let controls = split_top_level(list)
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_one)
        .collect::<ConfigResult<Vec<_>>>()?;

    if controls.is_empty() {
        return Err(ConfigError::InvalidSelector {
            selector: list.to_string(),
            reason: "no next-control candidates".to_string(),
        });
    }
    Ok(controls)
}

fn parse_one(entry: &str) -> ConfigResult<NextControl> {
    if let Some(caps) = RE_HAS_TEXT.captures(entry) {
        return Ok(NextControl::Text {
            tag: caps.name("tag").map(|m| m.as_str().to_lowercase()),
            label: caps["label"].trim().to_string(),
        });
    }

    let selector = Selector::parse(entry).map_err(|e| ConfigError::InvalidSelector {
        selector: entry.to_string(),
        reason: e.to_string(),
    })?;
    Ok(NextControl::Css {
        source: entry.to_string(),
        selector,
    })
}

fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth -= 1,
            (None, ',') if depth <= 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}

/// Find the first candidate that is present and enabled on the page.
pub fn detect_next_control(html: &str, controls: &[NextControl]) -> Option<DetectedControl> {
    let document = Html::parse_document(html);
    controls.iter().enumerate().find_map(|(index, control)| {
        locate_in(&document, control).map(|click_selector| DetectedControl {
            index,
            click_selector,
        })
    })
}

/// Locate one specific candidate on a page.
///
/// Used after each click: the traversal sticks with the candidate found on
/// page 1.
pub fn locate_control(html: &str, control: &NextControl) -> Option<String> {
    let document = Html::parse_document(html);
    locate_in(&document, control)
}

fn locate_in(document: &Html, control: &NextControl) -> Option<String> {
    let element = match control {
        NextControl::Css { selector, .. } => document.select(selector).next(),
        NextControl::Text { tag, label } => find_by_label(document, tag.as_deref(), label),
    }?;

    if is_disabled(&element) {
        return None;
    }
    Some(css_path(&element))
}

fn find_by_label<'a>(document: &'a Html, tag: Option<&str>, label: &str) -> Option<ElementRef<'a>> {
    let query = match tag {
        Some(tag) => tag.to_string(),
        None => "a, button".to_string(),
    };
    let selector = Selector::parse(&query).ok()?;
    let wanted = label.to_lowercase();

    document.select(&selector).find(|el| {
        let text = el.text().collect::<String>();
        let trimmed = text.trim_matches(|c: char| !c.is_alphanumeric());
        trimmed.to_lowercase() == wanted
    })
}

fn is_disabled(element: &ElementRef<'_>) -> bool {
    let own = element.value();
    if own.attr("disabled").is_some()
        || own.attr("aria-disabled") == Some("true")
        || own.classes().any(|c| c == "disabled")
    {
        return true;
    }

    // Bootstrap-style lists mark the <li>, not the link
    element
        .parent()
        .and_then(ElementRef::wrap)
        .map(|parent| parent.value().classes().any(|c| c == "disabled"))
        .unwrap_or(false)
}

/// Build a selector that matches exactly this element.
fn css_path(element: &ElementRef<'_>) -> String {
    let mut segments = Vec::new();
    let mut current = Some(*element);

    while let Some(el) = current {
        let value = el.value();
        if let Some(id) = value.id().filter(|id| RE_SIMPLE_ID.is_match(id)) {
            segments.push(format!("#{}", id));
            break;
        }

        let name = value.name();
        let position = 1 + el
            .prev_siblings()
            .filter_map(ElementRef::wrap)
            .filter(|sibling| sibling.value().name() == name)
            .count();
        segments.push(format!("{}:nth-of-type({})", name, position));

        current = el.parent().and_then(ElementRef::wrap);
    }

    segments.reverse();
    segments.join(" > ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::DEFAULT_NEXT_BUTTON_SELECTOR;

    fn controls(list: &str) -> Vec<NextControl> {
        parse_next_controls(list).unwrap()
    }

    #[test]
    fn test_default_list_parses() {
        let parsed = controls(DEFAULT_NEXT_BUTTON_SELECTOR);
        assert_eq!(parsed.len(), 12);
        assert!(matches!(&parsed[2], NextControl::Text { label, .. } if label == "Next"));
        assert!(matches!(&parsed[0], NextControl::Css { source, .. } if source == "[aria-label='Next Page']"));
    }

    #[test]
    fn test_commas_inside_attribute_values_do_not_split() {
        let parsed = controls("a[title='Next, please'], li.next a");
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let err = parse_next_controls("li.next a, a[[[").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { selector, .. } if selector == "a[[["));
    }

    #[test]
    fn test_empty_list_is_config_error() {
        assert!(parse_next_controls(" , ").is_err());
    }

    #[test]
    fn test_detects_rel_next() {
        let html = r#"<html><body><div class="pager">
            <a href="?page=1">1</a><a rel="next" href="?page=2">More</a>
        </div></body></html>"#;
        let found = detect_next_control(html, &controls("li.next a, [rel='next']")).unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(
            found.click_selector,
            "html:nth-of-type(1) > body:nth-of-type(1) > div:nth-of-type(1) > a:nth-of-type(2)"
        );
    }

    #[test]
    fn test_text_label_ignores_arrows_and_case() {
        let html = r#"<nav><a href="/a">Previous</a><a href="/b">next &raquo;</a></nav>"#;
        let found = detect_next_control(html, &controls("a:has-text('Next')")).unwrap();
        assert!(found.click_selector.ends_with("a:nth-of-type(2)"));
    }

    #[test]
    fn test_text_label_does_not_match_longer_text() {
        let html = r#"<a href="/steps">Next Steps for Families</a>"#;
        assert!(detect_next_control(html, &controls("a:has-text('Next')")).is_none());
    }

    #[test]
    fn test_disabled_candidate_is_skipped() {
        let html = r##"<ul class="pagination">
            <li class="next disabled"><a href="#">Next</a></li>
        </ul><a id="more" class="next" href="/p2">More</a>"##;
        let found = detect_next_control(html, &controls("li.next a, a.next")).unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.click_selector, "#more");
    }

    #[test]
    fn test_aria_disabled_means_absent() {
        let html = r#"<button aria-disabled="true">Siguiente</button>"#;
        assert!(detect_next_control(html, &controls("button:has-text('Siguiente')")).is_none());
    }

    #[test]
    fn test_no_candidates_present() {
        let html = "<p>One page only</p>";
        assert!(detect_next_control(html, &controls(DEFAULT_NEXT_BUTTON_SELECTOR)).is_none());
    }

    #[test]
    fn test_resolved_path_selects_the_element() {
        let html = r#"<div><span>x</span><div class="pagination"><a>1</a><a>2</a></div></div>"#;
        let found = detect_next_control(html, &controls(".pagination a:last-child")).unwrap();
        let document = Html::parse_document(html);
        let selector = Selector::parse(&found.click_selector).unwrap();
        let hits: Vec<String> = document
            .select(&selector)
            .map(|el| el.text().collect())
            .collect();
        assert_eq!(hits, vec!["2".to_string()]);
    }

    #[test]
    fn test_locate_sticks_to_one_candidate() {
        let parsed = controls("li.next a, a.next");
        let html = r#"<a class="next" href="/p3">More</a>"#;
        assert!(locate_control(html, &parsed[0]).is_none());
        assert!(locate_control(html, &parsed[1]).is_some());
    }
}
