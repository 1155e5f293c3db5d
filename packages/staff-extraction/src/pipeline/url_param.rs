//! URL-parameter pagination: detection and rewriting.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Query parameters that carry a page number, in priority order.
pub const PAGE_PARAMS: &[&str] = &["page", "page_no", "pageno", "p", "const_page", "pg"];

static RE_PAGE_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)href\s*=\s*["'](?P<href>[^"']*[?&](?:amp;)?(?P<param>page|page_no|pageno|p|const_page|pg)=(?P<num>\d+)[^"']*)["']"#,
    )
    .unwrap()
});

/// A detected page-number parameter and the URL it is rewritten into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlPagination {
    /// Parameter name (e.g. `page`)
    pub param: String,

    /// URL whose parameter is rewritten for each page
    pub template: Url,

    /// Page number of the page already fetched
    pub current: u32,
}

impl UrlPagination {
    /// URL of the page after `current`, or `None` past the last page number.
    pub fn next_url(&self) -> Option<String> {
        let next = self.current.checked_add(1)?;
        Some(with_page(&self.template, &self.param, next).to_string())
    }

    /// Advance to the next page.
    pub fn advance(&mut self) {
        self.current = self.current.saturating_add(1);
    }
}

/// Detect URL-parameter pagination from the page URL or, failing that, from
/// pagination links in page 1's HTML.
///
/// From links, only `href`s on the same host and path with a page number of 2
/// or more count; the fetched URL is then treated as page 1.
pub fn detect_url_pagination(page_url: &str, html: &str) -> Option<UrlPagination> {
    let base = Url::parse(page_url).ok()?;

    if let Some((param, current)) = page_param_in(&base) {
        return Some(UrlPagination {
            param,
            template: base,
            current,
        });
    }

    RE_PAGE_HREF.captures_iter(html).find_map(|caps| {
        let number: u32 = caps["num"].parse().ok()?;
        if number < 2 {
            return None;
        }
        let href = caps["href"].replace("&amp;", "&");
        let template = base.join(&href).ok()?;
        if template.host_str() != base.host_str() || !same_path(&template, &base) {
            return None;
        }
        let (param, _) = page_param_in(&template)?;
        Some(UrlPagination {
            param,
            template,
            current: 1,
        })
    })
}

fn same_path(a: &Url, b: &Url) -> bool {
    a.path().trim_end_matches('/') == b.path().trim_end_matches('/')
}

/// First candidate parameter in the query with a numeric value.
fn page_param_in(url: &Url) -> Option<(String, u32)> {
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    PAGE_PARAMS.iter().find_map(|candidate| {
        pairs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(candidate))
            .and_then(|(key, value)| value.trim().parse().ok().map(|n| (key.clone(), n)))
    })
}

/// Rewrite one query parameter, keeping the others in order.
pub fn with_page(url: &Url, param: &str, page: u32) -> Url {
    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    match pairs.iter_mut().find(|(key, _)| key == param) {
        Some(pair) => pair.1 = page.to_string(),
        None => pairs.push((param.to_string(), page.to_string())),
    }

    let mut rewritten = url.clone();
    rewritten.query_pairs_mut().clear().extend_pairs(pairs);
    rewritten
}
