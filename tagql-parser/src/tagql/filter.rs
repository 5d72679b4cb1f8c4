//! File pre-filter
//!
//! Decides whether a file is worth handing to the extractor at all. The check is a plain
//! substring search for the tag keyword: false positives only cost an extraction pass that
//! finds nothing, while a smarter check could silently skip a real literal.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

/// The keyword every embedded literal starts with.
pub const GRAPHQL_KEYWORD: &str = "graphql";

/// Predicate over a path relative to the parser's base directory.
pub type FileFilter = Arc<dyn Fn(&Path) -> io::Result<bool> + Send + Sync>;

/// Returns true iff `text` contains the tag keyword anywhere.
pub fn contains_graphql(text: &str) -> bool {
    text.contains(GRAPHQL_KEYWORD)
}

/// Build the filter used by the orchestrator for files under `base_dir`.
pub fn file_filter(base_dir: &Path) -> FileFilter {
    let base_dir = base_dir.to_path_buf();
    Arc::new(move |relative: &Path| {
        let text = fs::read_to_string(base_dir.join(relative))?;
        Ok(contains_graphql(&text))
    })
}
