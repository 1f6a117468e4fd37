//! Page count discovery from rendered markup.
//!
//! The item layout has changed several times, so the count is found by an
//! ordered list of independent strategies. The first one that recognises
//! the markup wins; when none does, the item fails rather than guessing.

use crate::browser::PageDriver;
use crate::error::{CaptureError, Result};
use crate::readiness::{Pacer, PageKind, ReadinessWaiter};
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

static PAGE_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(\d+)\s+pages?\b").unwrap());

static BARE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d+)\s*$").unwrap());

static READER_PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/read/page/(\d+)(?:[?#].*)?$").unwrap());

static PAGINATION_HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|/)page/(\d+)/?(?:[?#].*)?$").unwrap());

/// One way of reading a page count out of an item's landing page
pub trait PageCountStrategy {
    fn name(&self) -> &'static str;

    fn page_count(&self, document: &Html) -> Option<u32>;

    /// Answers only from indirect evidence
    fn is_fallback(&self) -> bool {
        false
    }
}

/// Parse the leading integer of a `"<N> pages"` / `"<N> page"` fragment
pub fn parse_page_label(text: &str) -> Option<u32> {
    PAGE_COUNT_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|n| *n > 0)
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

/// Text of the element's own text nodes, ignoring descendants
fn own_text(element: &ElementRef) -> String {
    element
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => Some(&**text),
            _ => None,
        })
        .collect()
}

/// Current layout: detail rows whose value cell reads `"<N> pages"`
pub struct RowValueStrategy;

impl PageCountStrategy for RowValueStrategy {
    fn name(&self) -> &'static str {
        "row-value"
    }

    fn page_count(&self, document: &Html) -> Option<u32> {
        let selector = Selector::parse("div.row-right").unwrap();
        document
            .select(&selector)
            .find_map(|el| parse_page_label(&element_text(&el)))
    }
}

/// Older layout: a `Pages` label cell next to a bare number
pub struct LabelledRowStrategy;

impl PageCountStrategy for LabelledRowStrategy {
    fn name(&self) -> &'static str {
        "labelled-row"
    }

    fn page_count(&self, document: &Html) -> Option<u32> {
        let row_sel = Selector::parse("div.row").unwrap();
        let left_sel = Selector::parse("div.row-left").unwrap();
        let right_sel = Selector::parse("div.row-right").unwrap();

        document.select(&row_sel).find_map(|row| {
            let label = row.select(&left_sel).next()?;
            if !element_text(&label).trim().eq_ignore_ascii_case("pages") {
                return None;
            }
            let value = element_text(&row.select(&right_sel).next()?);
            BARE_NUMBER_RE
                .captures(&value)
                .and_then(|c| c.get(1)?.as_str().parse().ok())
                .filter(|n: &u32| *n > 0)
        })
    }
}

/// Layout independent: any element whose own text is `"<N> pages"`
pub struct PageLabelTextStrategy;

impl PageCountStrategy for PageLabelTextStrategy {
    fn name(&self) -> &'static str {
        "page-label-text"
    }

    fn page_count(&self, document: &Html) -> Option<u32> {
        let selector = Selector::parse("body *").unwrap();
        document.select(&selector).find_map(|el| {
            let text = own_text(&el);
            let trimmed = text.trim();
            if trimmed.split_whitespace().count() != 2 {
                return None;
            }
            parse_page_label(trimmed)
        })
    }
}

/// Single page items carry no count label, only a link into the reader.
/// Any link to a later reader page rules this out.
pub struct SinglePageStrategy;

impl PageCountStrategy for SinglePageStrategy {
    fn name(&self) -> &'static str {
        "single-page"
    }

    fn is_fallback(&self) -> bool {
        true
    }

    fn page_count(&self, document: &Html) -> Option<u32> {
        let selector = Selector::parse("a[href]").unwrap();
        let mut reader_link = false;
        for href in document.select(&selector).filter_map(|a| a.value().attr("href")) {
            let href = href.trim_end_matches('/');
            if href.ends_with("/read") {
                reader_link = true;
                continue;
            }
            match READER_PAGE_RE
                .captures(href)
                .and_then(|c| c.get(1)?.as_str().parse::<u32>().ok())
            {
                Some(1) => reader_link = true,
                Some(_) => return None,
                None => {}
            }
        }
        reader_link.then_some(1)
    }
}

pub struct ItemEnumerator {
    strategies: Vec<Box<dyn PageCountStrategy>>,
}

impl Default for ItemEnumerator {
    /// Strategies newest layout first
    fn default() -> Self {
        Self::with_strategies(vec![
            Box::new(RowValueStrategy),
            Box::new(LabelledRowStrategy),
            Box::new(PageLabelTextStrategy),
            Box::new(SinglePageStrategy),
        ])
    }
}

impl ItemEnumerator {
    pub fn with_strategies(strategies: Vec<Box<dyn PageCountStrategy>>) -> Self {
        Self { strategies }
    }

    /// Add a strategy tried after the existing ones
    pub fn push(&mut self, strategy: Box<dyn PageCountStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Page count of an item from its landing page markup
    pub fn count_pages(&self, html: &str) -> Option<u32> {
        let document = Html::parse_document(html);
        self.strategies.iter().find_map(|strategy| {
            let count = strategy.page_count(&document)?;
            if strategy.is_fallback() {
                log::warn!(
                    "No page count label found; strategy {} assumed {} page(s)",
                    strategy.name(),
                    count
                );
            } else {
                log::debug!("Page count {} found by strategy {}", count, strategy.name());
            }
            Some(count)
        })
    }

    /// Navigate to an item and read its page count
    pub fn enumerate_pages<D: PageDriver, P: Pacer>(
        &self,
        driver: &D,
        waiter: &ReadinessWaiter<P>,
        item_url: &str,
    ) -> Result<u32> {
        driver.navigate(item_url)?;
        waiter.wait_until_ready(driver, PageKind::Landing)?;

        let html = driver.content()?;
        self.count_pages(&html).ok_or_else(|| CaptureError::Enumeration {
            url: item_url.to_string(),
        })
    }

    /// Navigate to a collection listing and read how many listing pages it has
    pub fn enumerate_collection_pages<D: PageDriver, P: Pacer>(
        &self,
        driver: &D,
        waiter: &ReadinessWaiter<P>,
        collection_url: &str,
    ) -> Result<u32> {
        driver.navigate(collection_url)?;
        waiter.wait_until_ready(driver, PageKind::Landing)?;

        let html = driver.content()?;
        Ok(collection_page_count(&html))
    }
}

/// Highest `/page/<n>` index among pagination links, 1 without pagination
pub fn collection_page_count(html: &str) -> u32 {
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]").unwrap();

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !href.contains("/read/page/"))
        .filter_map(|href| {
            PAGINATION_HREF_RE
                .captures(href)
                .and_then(|c| c.get(1)?.as_str().parse::<u32>().ok())
        })
        .max()
        .unwrap_or(1)
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT_LAYOUT: &str = r#"
        <html><body>
          <div class="table">
            <div class="row"><div class="row-left">Artist</div><div class="row-right"><a href="/artists/x">X</a></div></div>
            <div class="row"><div class="row-left">Pages</div><div class="row-right">12 pages</div></div>
          </div>
        </body></html>"#;

    const OLD_LAYOUT: &str = r#"
        <html><body>
          <div class="row"><div class="row-left">Language</div><div class="row-right">English</div></div>
          <div class="row"><div class="row-left">Pages</div><div class="row-right"> 27 </div></div>
        </body></html>"#;

    const FREEFORM_LAYOUT: &str = r#"
        <html><body>
          <section><span class="meta">Released 2019</span><span class="meta">34 Pages</span></section>
        </body></html>"#;

    const SINGLE_PAGE: &str = r#"
        <html><body>
          <div class="row"><div class="row-left">Artist</div><div class="row-right">Y</div></div>
          <a class="button" href="/hentai/one-shot-english/read/page/1">Start Reading</a>
        </body></html>"#;

    const NO_COUNT: &str = r#"
        <html><body><h1>Access denied</h1><p>Please log in</p></body></html>"#;

    #[test]
    fn test_parse_page_label() {
        assert_eq!(parse_page_label("12 pages"), Some(12));
        assert_eq!(parse_page_label("  1 page"), Some(1));
        assert_eq!(parse_page_label("40 Pages\n"), Some(40));
        assert_eq!(parse_page_label("0 pages"), None);
        assert_eq!(parse_page_label("pages: 12"), None);
        assert_eq!(parse_page_label("12 pageviews"), None);
    }

    #[test]
    fn test_current_layout() {
        assert_eq!(ItemEnumerator::default().count_pages(CURRENT_LAYOUT), Some(12));
    }

    #[test]
    fn test_old_layout() {
        assert_eq!(ItemEnumerator::default().count_pages(OLD_LAYOUT), Some(27));
    }

    #[test]
    fn test_freeform_layout() {
        assert_eq!(ItemEnumerator::default().count_pages(FREEFORM_LAYOUT), Some(34));
    }

    #[test]
    fn test_single_page_item_counts_one() {
        assert_eq!(ItemEnumerator::default().count_pages(SINGLE_PAGE), Some(1));
    }

    #[test]
    fn test_link_to_later_reader_page_is_not_single_page() {
        let html = r#"
            <html><body>
              <a href="/hentai/long-english/read/page/1">Start Reading</a>
              <a href="/hentai/long-english/read/page/2"><img src="thumb2.jpg"></a>
            </body></html>"#;
        assert_eq!(ItemEnumerator::default().count_pages(html), None);
    }

    #[test]
    fn test_no_indicator_found() {
        assert_eq!(ItemEnumerator::default().count_pages(NO_COUNT), None);
    }

    #[test]
    fn test_first_matching_strategy_wins() {
        struct Fixed(u32);
        impl PageCountStrategy for Fixed {
            fn name(&self) -> &'static str {
                "fixed"
            }
            fn page_count(&self, _document: &Html) -> Option<u32> {
                Some(self.0)
            }
        }

        let mut enumerator = ItemEnumerator::default();
        enumerator.push(Box::new(Fixed(99)));
        assert_eq!(enumerator.count_pages(CURRENT_LAYOUT), Some(12));
        assert_eq!(enumerator.count_pages(NO_COUNT), Some(99));

        let first = ItemEnumerator::with_strategies(vec![Box::new(Fixed(5)), Box::new(RowValueStrategy)]);
        assert_eq!(first.count_pages(CURRENT_LAYOUT), Some(5));
        assert_eq!(first.strategy_names(), vec!["fixed", "row-value"]);
    }

    #[test]
    fn test_collection_pagination() {
        let html = r#"
            <div class="pagination">
              <a href="/collections/best/page/2">2</a>
              <a href="/collections/best/page/3">3</a>
              <a href="https://www.fakku.net/collections/best/page/7">7</a>
            </div>
            <a href="/hentai/foo-english/read/page/40">Read</a>"#;
        assert_eq!(collection_page_count(html), 7);
    }

    #[test]
    fn test_collection_without_pagination() {
        let html = r#"<div><a href="/hentai/foo-english">Foo</a></div>"#;
        assert_eq!(collection_page_count(html), 1);
    }
}
