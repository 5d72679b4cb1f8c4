//! Continuous mode on top of `notify`

use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use super::{CodegenRunner, Orchestrator, RunError};
use crate::tagql::pipeline::{ParserConfigs, WriterConfigs};
use crate::tagql::watch::{FileType, WatchMatcher};

struct WatchedTree {
    base_dir: PathBuf,
    canonical: Option<PathBuf>,
    matcher: WatchMatcher,
}

impl WatchedTree {
    /// Does the event touch a file this tree's expression accepts?
    fn is_relevant(&self, event: &Event) -> bool {
        if matches!(event.kind, EventKind::Access(_)) {
            return false;
        }
        event.paths.iter().any(|path| {
            self.relative(path)
                .is_some_and(|relative| self.matcher.matches(relative, FileType::File))
        })
    }

    fn relative<'p>(&self, path: &'p Path) -> Option<&'p Path> {
        path.strip_prefix(&self.base_dir).ok().or_else(|| {
            self.canonical
                .as_ref()
                .and_then(|canonical| path.strip_prefix(canonical).ok())
        })
    }
}

pub(super) fn watch(
    runner: &CodegenRunner,
    parsers: &ParserConfigs,
    writers: &WriterConfigs,
    debounce_ms: u64,
) -> Result<(), RunError> {
    let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
    let mut watcher =
        notify::recommended_watcher(tx).map_err(|err| RunError::Notify(err.to_string()))?;

    let mut trees = Vec::new();
    for config in parsers.values() {
        watcher
            .watch(&config.base_dir, RecursiveMode::Recursive)
            .map_err(|err| RunError::Notify(err.to_string()))?;
        trees.push(WatchedTree {
            base_dir: config.base_dir.clone(),
            canonical: config.base_dir.canonicalize().ok(),
            matcher: config.watch_expression.matcher()?,
        });
    }

    run_pass(runner, parsers, writers);
    tracing::info!("watching for changes");

    let debounce = Duration::from_millis(debounce_ms);
    while let Ok(first) = rx.recv() {
        let mut relevant = is_relevant(&trees, first);
        // Collapse a burst of events, e.g. an editor's save, into one pass
        while let Ok(next) = rx.recv_timeout(debounce) {
            relevant |= is_relevant(&trees, next);
        }
        if relevant {
            run_pass(runner, parsers, writers);
        }
    }
    Ok(())
}

fn is_relevant(trees: &[WatchedTree], event: notify::Result<Event>) -> bool {
    match event {
        Ok(event) => trees.iter().any(|tree| tree.is_relevant(&event)),
        Err(err) => {
            tracing::warn!(error = %err, "watch error");
            false
        }
    }
}

fn run_pass(runner: &CodegenRunner, parsers: &ParserConfigs, writers: &WriterConfigs) {
    match runner.compile_all(parsers, writers) {
        Ok(summary) => {
            let definitions: usize = summary.reports.values().map(|r| r.definitions).sum();
            tracing::info!(definitions, "pass complete");
        }
        Err(err) => tracing::error!("{}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tagql::watch::{build_watch_expression, DEFAULT_EXCLUSIONS};
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    fn tree() -> WatchedTree {
        WatchedTree {
            base_dir: PathBuf::from("/repo/src"),
            canonical: None,
            matcher: build_watch_expression(&["js"], &DEFAULT_EXCLUSIONS)
                .matcher()
                .unwrap(),
        }
    }

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_relevant_changes() {
        let tree = tree();
        assert!(tree.is_relevant(&event(
            EventKind::Modify(ModifyKind::Any),
            "/repo/src/App.js"
        )));
        assert!(tree.is_relevant(&event(
            EventKind::Create(CreateKind::File),
            "/repo/src/nested/New.js"
        )));
    }

    #[test]
    fn test_irrelevant_changes() {
        let tree = tree();
        assert!(!tree.is_relevant(&event(
            EventKind::Access(AccessKind::Any),
            "/repo/src/App.js"
        )));
        assert!(!tree.is_relevant(&event(
            EventKind::Modify(ModifyKind::Any),
            "/repo/src/__generated__/App.graphql.js"
        )));
        assert!(!tree.is_relevant(&event(
            EventKind::Modify(ModifyKind::Any),
            "/elsewhere/App.js"
        )));
        assert!(!tree.is_relevant(&event(
            EventKind::Modify(ModifyKind::Any),
            "/repo/src/README.md"
        )));
    }
}
