use crate::{
    content::DirectoryContent,
    diagnostics::{build_error_lines, report_io_error},
    tree::SnapshotHolder,
};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    error::Error,
    fs,
    path::Path,
    sync::mpsc::{self, Receiver},
    time::Duration,
};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

type WatchEvents = Receiver<notify::Result<Event>>;

/// Validates `source`, then rebuilds whenever the declaration or anything under the content
/// base changes. A rejected rebuild leaves the last good snapshot published.
pub fn run_watch(
    source: &Path,
    content_base: &Path,
    holder: &SnapshotHolder,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let content = DirectoryContent::new(content_base);
    rebuild(source, &content, holder);

    let (mut watcher, events) = tree_watcher()?;
    watcher.watch(source, RecursiveMode::NonRecursive)?;
    if content_base.is_dir() {
        watcher.watch(content_base, RecursiveMode::Recursive)?;
    }
    info!(
        source = %source.display(),
        content = %content_base.display(),
        "watching for changes"
    );
    println!("Watching {} (Ctrl+C to stop)", source.display());

    while let Ok(first) = events.recv() {
        // Editors emit bursts; one rebuild covers everything already queued.
        let burst = std::iter::once(first).chain(events.try_iter());
        let mut changed = 0usize;
        for event in burst {
            match event {
                Ok(event) if touches_tree(&event) => changed += 1,
                Ok(event) => debug!(kind = ?event.kind, "ignoring event"),
                Err(err) => warn!(error = %err, "watch error"),
            }
        }
        if changed > 0 {
            debug!(events = changed, "rebuilding");
            rebuild(source, &content, holder);
        }
    }
    Ok(())
}

fn tree_watcher() -> notify::Result<(RecommendedWatcher, WatchEvents)> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |event| {
        if tx.send(event).is_err() {
            debug!("watch receiver dropped");
        }
    })?;
    watcher.configure(Config::default().with_poll_interval(POLL_INTERVAL))?;
    Ok((watcher, rx))
}

/// Whether an event can change the outcome of a build.
fn touches_tree(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// One rebuild attempt; prints the outcome and returns whether a new snapshot was published.
pub fn rebuild(path: &Path, content: &DirectoryContent, holder: &SnapshotHolder) -> bool {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            report_io_error(path, &err);
            return false;
        }
    };
    match holder.rebuild(&source, content) {
        Ok(snapshot) => {
            println!(
                "{}: {} topics (generation {})",
                path.display(),
                snapshot.len(),
                holder.generation()
            );
            true
        }
        Err(err) => {
            for line in build_error_lines(&err) {
                println!("{line}");
            }
            match holder.current() {
                Some(previous) => info!(
                    nodes = previous.len(),
                    generation = holder.generation(),
                    "serving previous snapshot"
                ),
                None => info!("no snapshot published yet"),
            }
            false
        }
    }
}
