//! Collection mode: fills the input list from a collection listing
//! instead of capturing anything.

use crate::browser::PageDriver;
use crate::enumerator::ItemEnumerator;
use crate::error::{CaptureError, Result};
use crate::readiness::{Pacer, PageKind, ReadinessWaiter};
use crate::work::{parse_url_list, WorkItem};
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use url::Url;

/// Absolute item URLs linked from a listing page, in page order
pub fn collect_item_urls(html: &str, page_url: &str, item_selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(item_selector) else {
        log::warn!("Invalid item selector {:?}", item_selector);
        return Vec::new();
    };
    let Ok(base) = Url::parse(page_url) else {
        log::warn!("Invalid collection URL {:?}", page_url);
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| !is_reader_link(url))
        .map(|url| WorkItem::new(url.as_str()).url().to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Links into the reader have a `read` path segment
fn is_reader_link(url: &Url) -> bool {
    url.path_segments()
        .is_some_and(|mut segments| segments.any(|segment| segment == "read"))
}

/// URL of the n-th listing page of a collection
pub fn collection_page_url(collection_url: &str, page: u32) -> String {
    let base = collection_url.trim_end_matches('/');
    if page <= 1 {
        base.to_string()
    } else {
        format!("{}/page/{}", base, page)
    }
}

/// Append URLs not already listed; returns how many were added
pub fn append_new_urls(input_list: &Path, urls: &[String]) -> Result<usize> {
    let content = match fs::read_to_string(input_list) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(CaptureError::io(input_list, e)),
    };
    let existing: HashSet<String> = parse_url_list(&content).into_iter().collect();

    let fresh: Vec<&String> = urls.iter().filter(|u| !existing.contains(*u)).collect();

    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(input_list)
        .map_err(|e| CaptureError::io(input_list, e))?;
    if !fresh.is_empty() && !content.is_empty() && !content.ends_with('\n') {
        writeln!(file).map_err(|e| CaptureError::io(input_list, e))?;
    }
    for url in &fresh {
        writeln!(file, "{}", url).map_err(|e| CaptureError::io(input_list, e))?;
    }
    file.flush().map_err(|e| CaptureError::io(input_list, e))?;

    Ok(fresh.len())
}

/// Walk every listing page of a collection and add its items to the input list
pub fn populate_input_list<D: PageDriver, P: Pacer>(
    driver: &D,
    waiter: &ReadinessWaiter<P>,
    enumerator: &ItemEnumerator,
    collection_url: &str,
    item_selector: &str,
    input_list: &Path,
) -> Result<usize> {
    let pages = enumerator.enumerate_collection_pages(driver, waiter, collection_url)?;
    log::info!("Collection has {} listing page(s)", pages);

    let mut urls: Vec<String> = Vec::new();
    for page in 1..=pages {
        let page_url = collection_page_url(collection_url, page);
        // Listing page 1 is already loaded by the enumeration
        if page > 1 {
            driver.navigate(&page_url)?;
            waiter.wait_until_ready(driver, PageKind::Landing)?;
        }
        let found = collect_item_urls(&driver.content()?, &page_url, item_selector);
        log::info!("Listing page {}: {} item(s)", page, found.len());
        for url in found {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }

    let added = append_new_urls(input_list, &urls)?;
    log::info!(
        "Added {} new URL(s) to {} ({} already listed)",
        added,
        input_list.display(),
        urls.len() - added
    );
    Ok(added)
}
