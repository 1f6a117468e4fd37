//! Capture sequencer: drives every pending work item from enumeration
//! through per-page screenshots to the done list.

use crate::browser::{BrowserError, PageDriver};
use crate::enumerator::ItemEnumerator;
use crate::error::{CaptureError, Result};
use crate::readiness::{Pacer, PageKind, ReadinessWaiter, ThreadPacer};
use crate::work::{DoneList, WorkItem};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-item file caching the enumerated page count
pub const PAGE_COUNT_FILE: &str = ".page_count";

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Root under which each item gets its own directory
    pub output_dir: PathBuf,
    /// Viewport restored at the start of every item
    pub default_window: (u32, u32),
    /// Class shared by the reader's stacked layers (content and UI)
    pub layer_class: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("manga"),
            default_window: crate::browser::config::DEFAULT_WINDOW_SIZE,
            layer_class: "layer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub items_completed: usize,
    pub pages_captured: usize,
    pub pages_skipped: usize,
}

/// Index of the UI overlay layer to remove: always the topmost one.
/// The reader stacks 2 or 3 layers depending on the item.
pub fn overlay_index(layer_count: u32) -> Option<u32> {
    layer_count.checked_sub(1)
}

/// Index of the canvas holding the page image, directly below the overlay
pub fn content_canvas_index(layer_count: u32) -> Option<u32> {
    layer_count.checked_sub(2)
}

/// Parse the `"<width>x<height>"` string produced by the bounds script
pub fn parse_bounds(value: &Value) -> Option<(u32, u32)> {
    let (width, height) = value.as_str()?.split_once('x')?;
    let width: u32 = width.trim().parse().ok()?;
    let height: u32 = height.trim().parse().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

pub fn page_path(item_dir: &Path, page: u32) -> PathBuf {
    item_dir.join(format!("{}.png", page))
}

fn read_cached_page_count(item_dir: &Path) -> Option<u32> {
    fs::read_to_string(item_dir.join(PAGE_COUNT_FILE))
        .ok()?
        .trim()
        .parse()
        .ok()
        .filter(|n| *n > 0)
}

fn all_pages_present(item_dir: &Path, count: u32) -> bool {
    (1..=count).all(|page| page_path(item_dir, page).is_file())
}

/// Write through a temporary file so a partial write never looks captured
fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<()> {
    let partial = dest.with_extension("png.part");
    fs::write(&partial, bytes).map_err(|e| CaptureError::io(&partial, e))?;
    fs::rename(&partial, dest).map_err(|e| CaptureError::io(dest, e))
}

pub struct CaptureSequencer<'a, D, P = ThreadPacer> {
    driver: &'a D,
    waiter: ReadinessWaiter<P>,
    enumerator: ItemEnumerator,
    config: CaptureConfig,
}

impl<'a, D: PageDriver, P: Pacer> CaptureSequencer<'a, D, P> {
    pub fn new(
        driver: &'a D,
        waiter: ReadinessWaiter<P>,
        enumerator: ItemEnumerator,
        config: CaptureConfig,
    ) -> Self {
        Self {
            driver,
            waiter,
            enumerator,
            config,
        }
    }

    /// Capture every item not yet in `done`, in order.
    ///
    /// Stops after `max_items` items are completed in this run; the rest
    /// stay pending for the next one. Any fatal error aborts the run.
    pub fn run(
        &self,
        items: &[WorkItem],
        done: &mut DoneList,
        max_items: Option<usize>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        if max_items == Some(0) {
            return Ok(summary);
        }

        for item in items {
            if done.contains(item) {
                log::debug!("Skipping {} (already done)", item.url());
                continue;
            }

            self.capture_item(item, &mut summary)?;

            done.mark_done(item)?;
            summary.items_completed += 1;
            log::info!("Done: {}", item.short_name());

            if max_items.is_some_and(|max| summary.items_completed >= max) {
                log::info!(
                    "Reached the limit of {} item(s) for this run",
                    summary.items_completed
                );
                break;
            }
        }

        Ok(summary)
    }

    fn capture_item(&self, item: &WorkItem, summary: &mut RunSummary) -> Result<()> {
        let item_dir = item.output_dir(&self.config.output_dir);
        fs::create_dir_all(&item_dir).map_err(|e| CaptureError::io(&item_dir, e))?;

        if let Some(count) = read_cached_page_count(&item_dir) {
            if all_pages_present(&item_dir, count) {
                log::info!(
                    "All {} pages of {} already captured",
                    count,
                    item.short_name()
                );
                summary.pages_skipped += count as usize;
                return Ok(());
            }
        }

        let (width, height) = self.config.default_window;
        self.driver.set_window_size(width, height)?;

        let count = self
            .enumerator
            .enumerate_pages(self.driver, &self.waiter, item.url())?;
        let cache = item_dir.join(PAGE_COUNT_FILE);
        fs::write(&cache, count.to_string()).map_err(|e| CaptureError::io(&cache, e))?;

        log::info!("Capturing \"{}\" ({} pages)", item.short_name(), count);

        // The first reader load of an item, and the first after skipped
        // pages, waits longer: the reader prefetches in the background.
        let mut extended = true;
        for page in 1..=count {
            let dest = page_path(&item_dir, page);
            if dest.is_file() {
                summary.pages_skipped += 1;
                extended = true;
                continue;
            }

            self.capture_page(item, page, &dest, extended)?;
            extended = false;
            summary.pages_captured += 1;
            log::info!("{}: page {}/{}", item.short_name(), page, count);
        }

        Ok(())
    }

    fn capture_page(&self, item: &WorkItem, page: u32, dest: &Path, extended: bool) -> Result<()> {
        self.driver.navigate(&item.page_url(page))?;
        self.waiter
            .wait_until_ready(self.driver, PageKind::Reader { extended })?;

        // No page is captured with its overlay still on
        let layers = self.layer_count()?;
        let overlay = overlay_index(layers).ok_or_else(|| {
            BrowserError::ElementNotFound(format!(
                "no .{} layers on page {} of {}",
                self.config.layer_class,
                page,
                item.short_name()
            ))
        })?;

        match self.content_bounds(layers) {
            Ok((width, height)) => self.driver.set_window_size(width, height)?,
            Err(e) => log::warn!(
                "Could not size the viewport for page {} of {} ({}); capturing as is. \
                 Increasing the timeout may help",
                page,
                item.short_name(),
                e
            ),
        }

        self.remove_layer(overlay)?;

        let png = self.driver.screenshot()?;
        write_atomically(dest, &png)
    }

    fn layer_count(&self) -> Result<u32> {
        let script = format!(
            "document.getElementsByClassName({}).length",
            Value::String(self.config.layer_class.clone())
        );
        let value = self.driver.evaluate(&script)?;
        let count = value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| BrowserError::JavaScriptError(format!("unexpected layer count {}", value)))?;
        Ok(count)
    }

    fn content_bounds(&self, layer_count: u32) -> std::result::Result<(u32, u32), String> {
        let index = content_canvas_index(layer_count)
            .ok_or_else(|| format!("only {} layer(s) rendered", layer_count))?;
        let script = format!(
            "(function() {{ const c = document.getElementsByTagName('canvas')[{}]; \
             return c ? c.width + 'x' + c.height : null; }})()",
            index
        );
        let value = self.driver.evaluate(&script).map_err(|e| e.to_string())?;
        parse_bounds(&value).ok_or_else(|| format!("canvas {} has no usable size ({})", index, value))
    }

    fn remove_layer(&self, index: u32) -> Result<()> {
        let script = format!(
            "(function() {{ const l = document.getElementsByClassName({})[{}]; \
             if (l) {{ l.remove(); return true; }} return false; }})()",
            Value::String(self.config.layer_class.clone()),
            index
        );
        if self.driver.evaluate(&script)?.as_bool() != Some(true) {
            log::warn!("Overlay layer {} was already gone", index);
        }
        Ok(())
    }
}
