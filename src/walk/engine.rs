//! Parallel traversal engine
//!
//! Each listed entry becomes one task on a rayon pool. A directory task reads
//! the directory's metadata, lists it, and spawns one task per child, so
//! listing and extraction share the same workers. Records are appended to the
//! run context in completion order and sorted afterwards if requested.
//!
//! Followed symlinks are resolved first. A target inside the root is walked
//! under its real path and the link is not descended. Targets outside the root
//! are parked until the pool drains, then claimed in path order and walked in
//! rounds, so which link owns a shared target never depends on scheduling.

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use rayon::{Scope, ThreadPool};
use tracing::{debug, info, warn};

use crate::entry::{EntryKind, EntryRecord, name_string, relative_path_string};
use crate::error::{DirlogError, EntryError};
use crate::extract::{EntrySummary, Extractor};

use super::config::WalkOptions;
use super::context::{FileId, RunContext};
use super::filter::{Decision, FilterPolicy};
use super::summary::{Summary, TraversalRun, compare_paths};

/// A listed entry waiting to be processed.
struct Job {
    fs_path: PathBuf,
    summary: EntrySummary,
}

impl Job {
    fn child(parent: &Job, fs_path: PathBuf, name: String, kind: EntryKind) -> Self {
        let path = if parent.summary.depth == 0 {
            name.clone()
        } else {
            format!("{}/{}", parent.summary.path, name)
        };
        Self {
            fs_path,
            summary: EntrySummary {
                path,
                name,
                kind,
                depth: parent.summary.depth + 1,
            },
        }
    }
}

/// A followed symlink to a directory outside the root, extracted but not yet
/// listed.
struct DeferredLink {
    job: Job,
    record: EntryRecord,
    emit: bool,
    identity: FileId,
}

/// State handed to every task.
struct Shared<'a> {
    options: &'a WalkOptions,
    root: PathBuf,
    extractor: Extractor,
    ctx: RunContext,
    deferred: Mutex<Vec<DeferredLink>>,
}

impl Shared<'_> {
    fn filter(&self) -> &FilterPolicy {
        &self.options.filter
    }

    fn defer(&self, link: DeferredLink) {
        match self.deferred.lock() {
            Ok(mut deferred) => deferred.push(link),
            Err(poisoned) => poisoned.into_inner().push(link),
        }
    }

    fn take_deferred(&self) -> Vec<DeferredLink> {
        match self.deferred.lock() {
            Ok(mut deferred) => std::mem::take(&mut *deferred),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

/// Walk `root` and collect its records.
///
/// Fails only when the root cannot be used: it is missing, unreadable, or not
/// a directory. Every other problem is recorded on the affected entry.
pub fn walk(root: &Path, options: &WalkOptions) -> Result<TraversalRun, DirlogError> {
    let start = Instant::now();

    let root_meta =
        fs::metadata(root).map_err(|e| DirlogError::from_root_io(root.to_path_buf(), e))?;
    if !root_meta.is_dir() {
        return Err(DirlogError::RootNotDirectory(root.to_path_buf()));
    }
    let canonical =
        fs::canonicalize(root).map_err(|e| DirlogError::from_root_io(root.to_path_buf(), e))?;
    // Listing the root must work even when max_depth keeps us from using it.
    fs::read_dir(&canonical).map_err(|source| DirlogError::RootNotReadable {
        path: root.to_path_buf(),
        source,
    })?;

    let workers = options.worker_count();
    info!(
        root = %canonical.display(),
        workers,
        follow_symlinks = options.follow_symlinks,
        "starting traversal"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("dirlog-worker-{i}"))
        .build()
        .map_err(|e| DirlogError::ThreadPool(e.to_string()))?;

    let shared = Shared {
        options,
        root: canonical.clone(),
        extractor: Extractor::new(options.entry_timeout),
        ctx: RunContext::new(options.progress.clone()),
        deferred: Mutex::new(Vec::new()),
    };
    shared.ctx.first_visit(FileId::of(&canonical, &root_meta));

    let root_job = Job {
        summary: EntrySummary {
            path: relative_path_string(&canonical, &canonical),
            name: root_name(&canonical),
            kind: EntryKind::Directory,
            depth: 0,
        },
        fs_path: canonical.clone(),
    };

    pool.scope(|s| visit(s, &shared, root_job, true));
    descend_links(&pool, &shared);

    shared.ctx.report_done();
    let cancelled = shared.ctx.was_cancelled() || options.cancel.is_cancelled();
    let skipped = shared.ctx.skipped();
    let records = shared.ctx.into_records();

    let mut summary = Summary::from_records(&records);
    summary.skipped_by_filter = skipped;
    summary.cancelled = cancelled;
    summary.elapsed = start.elapsed();

    info!(
        files = summary.files,
        directories = summary.directories,
        errors = summary.errors,
        skipped = summary.skipped_by_filter,
        cancelled,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "traversal finished"
    );

    let mut run = TraversalRun::new(canonical, options.filter.clone(), records, summary);
    if options.sort_by_path {
        run.finalize();
    }
    Ok(run)
}

/// Process one entry and fan its children out onto the pool.
fn visit<'s>(scope: &Scope<'s>, shared: &'s Shared<'s>, job: Job, is_root: bool) {
    let ctx = &shared.ctx;
    if shared.options.cancel.is_cancelled() {
        ctx.note_cancelled();
        return;
    }

    // A followed symlink is traversed when its target is a directory.
    let link_target = if job.summary.kind == EntryKind::Symlink && shared.options.follow_symlinks {
        fs::metadata(&job.fs_path).ok().filter(Metadata::is_dir)
    } else {
        None
    };
    let traversable = job.summary.kind == EntryKind::Directory || link_target.is_some();

    let decision = shared.filter().decide(&job.summary, traversable);
    if decision == Decision::Skip {
        ctx.note_skipped();
        ctx.note_processed();
        return;
    }

    let depth = job.summary.depth;
    let (mut record, meta) = shared.extractor.extract(&job.fs_path, job.summary.clone());

    let emit = decision == Decision::Emit;

    let mut children = Vec::new();
    if traversable && shared.filter().descends(depth) {
        if let Some(target) = link_target {
            match fs::canonicalize(&job.fs_path) {
                Ok(resolved) if resolved.starts_with(&shared.root) => {
                    debug!(path = %record.path, target = %resolved.display(), "symlink target is inside the root, not descending");
                }
                Ok(_) => {
                    let identity = FileId::of(&job.fs_path, &target);
                    shared.defer(DeferredLink {
                        job,
                        record,
                        emit,
                        identity,
                    });
                    return;
                }
                Err(err) => {
                    warn!(path = %record.path, error = %err, "cannot resolve symlink target, not descending");
                }
            }
        } else if let Some(m) = meta.as_ref().filter(|m| m.is_dir()) {
            // The root was registered by the caller.
            if is_root || ctx.first_visit(FileId::of(&job.fs_path, m)) {
                children = list_or_record_error(&job, &mut record);
            } else {
                warn!(path = %record.path, "directory already visited, not descending");
            }
        }
        // Otherwise the stat failed and the record already carries the error.
    }

    finish(scope, shared, record, emit, children);
}

/// Walk the parked symlink targets in rounds until none are left.
///
/// Each round claims targets in path order on the calling thread, then lists
/// the claimed ones on the pool. Links found while walking a round are parked
/// for the next one.
fn descend_links<'s>(pool: &ThreadPool, shared: &'s Shared<'s>) {
    loop {
        let mut links = shared.take_deferred();
        if links.is_empty() {
            return;
        }
        links.sort_by(|a, b| compare_paths(&a.record.path, &b.record.path));
        debug!(links = links.len(), "descending followed symlinks");

        pool.scope(|s| {
            for link in links {
                if shared.options.cancel.is_cancelled() {
                    shared.ctx.note_cancelled();
                    settle(&shared.ctx, link.record, link.emit);
                } else if shared.ctx.first_visit(link.identity.clone()) {
                    s.spawn(move |s| resume(s, shared, link));
                } else {
                    warn!(path = %link.record.path, "directory already visited, not descending");
                    settle(&shared.ctx, link.record, link.emit);
                }
            }
        });
    }
}

fn resume<'s>(scope: &Scope<'s>, shared: &'s Shared<'s>, link: DeferredLink) {
    let DeferredLink {
        job,
        mut record,
        emit,
        ..
    } = link;
    let children = list_or_record_error(&job, &mut record);
    finish(scope, shared, record, emit, children);
}

/// Settle a processed record and fan its children out onto the pool.
fn finish<'s>(
    scope: &Scope<'s>,
    shared: &'s Shared<'s>,
    record: EntryRecord,
    emit: bool,
    children: Vec<Job>,
) {
    if !children.is_empty() {
        debug!(path = %record.path, children = children.len(), "listed directory");
        shared.ctx.add_discovered(children.len());
    }
    settle(&shared.ctx, record, emit);

    for child in children {
        scope.spawn(move |s| visit(s, shared, child, false));
    }
}

fn settle(ctx: &RunContext, record: EntryRecord, emit: bool) {
    if emit || record.has_error() {
        ctx.push(record);
    } else {
        ctx.note_skipped();
    }
    ctx.note_processed();
}

fn list_or_record_error(job: &Job, record: &mut EntryRecord) -> Vec<Job> {
    match list_children(job) {
        Ok(listed) => listed,
        Err(err) => {
            warn!(path = %record.path, error = %err, "cannot list directory");
            record.error = Some(EntryError::listing(&err));
            Vec::new()
        }
    }
}

fn list_children(parent: &Job) -> std::io::Result<Vec<Job>> {
    let mut jobs = Vec::new();
    for item in fs::read_dir(&parent.fs_path)? {
        match item {
            Ok(entry) => {
                let kind = entry
                    .file_type()
                    .map(EntryKind::from_file_type)
                    .unwrap_or(EntryKind::Other);
                let name = name_string(&entry.file_name());
                jobs.push(Job::child(parent, entry.path(), name, kind));
            }
            Err(err) => {
                warn!(path = %parent.summary.path, error = %err, "skipping unreadable listing item");
            }
        }
    }
    Ok(jobs)
}

fn root_name(root: &Path) -> String {
    root.file_name()
        .map(name_string)
        .unwrap_or_else(|| name_string(root.as_os_str()))
}
