//! Work items and the flat files that track them.

use crate::error::{CaptureError, Result};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

/// One multi-page item to capture, identified by its URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    url: String,
}

impl WorkItem {
    /// Query and fragment are dropped; reader page paths are appended to
    /// the bare item path.
    pub fn new(url: impl Into<String>) -> Self {
        let raw = url.into();
        let raw = raw.trim();
        let url = match Url::parse(raw) {
            Ok(mut parsed) => {
                parsed.set_query(None);
                parsed.set_fragment(None);
                parsed.to_string()
            }
            Err(_) => raw.split(['?', '#']).next().unwrap_or(raw).to_string(),
        };
        Self {
            url: url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Last path segment of the URL, used as the output directory name
    pub fn short_name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }

    /// URL of the reader view for a 1-based page index
    pub fn page_url(&self, page: u32) -> String {
        format!("{}/read/page/{}", self.url, page)
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(self.short_name())
    }
}

/// Parse a newline-delimited URL list. Blank lines are ignored, duplicates
/// keep their first position.
pub fn parse_url_list(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

/// Read the input list. A missing or empty file is a configuration error.
pub fn read_input_list(path: &Path) -> Result<Vec<WorkItem>> {
    let missing = || {
        CaptureError::Config(format!(
            "File {} does not exist or is empty. Write the list of item URLs to it first, \
             or run with --collection-url to fill it from a collection",
            path.display()
        ))
    };

    if !path.is_file() {
        return Err(missing());
    }
    let content = fs::read_to_string(path).map_err(|e| CaptureError::io(path, e))?;
    let items: Vec<WorkItem> = parse_url_list(&content).into_iter().map(WorkItem::new).collect();
    if items.is_empty() {
        return Err(missing());
    }
    Ok(items)
}

/// Append-only record of fully captured items
pub struct DoneList {
    path: PathBuf,
    done: HashSet<String>,
    // Last line of the file on disk is unterminated
    needs_newline: bool,
}

impl DoneList {
    /// Open the list, creating an empty file when missing
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| CaptureError::io(parent, e))?;
            }
            File::create(&path).map_err(|e| CaptureError::io(&path, e))?;
        }

        let content = fs::read_to_string(&path).map_err(|e| CaptureError::io(&path, e))?;
        let done = parse_url_list(&content)
            .into_iter()
            .map(|url| WorkItem::new(url).url().to_string())
            .collect();
        let needs_newline = !content.is_empty() && !content.ends_with('\n');

        Ok(Self {
            path,
            done,
            needs_newline,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, item: &WorkItem) -> bool {
        self.done.contains(item.url())
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    /// Items not yet recorded as done, in input order
    pub fn pending(&self, items: Vec<WorkItem>) -> Vec<WorkItem> {
        items.into_iter().filter(|item| !self.contains(item)).collect()
    }

    /// Record an item as done. Flushed before returning so progress survives
    /// a crash; recording the same item twice writes nothing.
    pub fn mark_done(&mut self, item: &WorkItem) -> Result<bool> {
        if self.contains(item) {
            return Ok(false);
        }

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| CaptureError::io(&self.path, e))?;
        if self.needs_newline {
            writeln!(file).map_err(|e| CaptureError::io(&self.path, e))?;
        }
        writeln!(file, "{}", item.url())
            .and_then(|_| file.sync_data())
            .map_err(|e| CaptureError::io(&self.path, e))?;

        self.needs_newline = false;
        self.done.insert(item.url().to_string());
        Ok(true)
    }
}
