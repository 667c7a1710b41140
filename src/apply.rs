//! # Applying Fixes
//!
//! The [`Applier`] is the [`Visitor`] that reconciles the local filesystem
//! with a node's view of the repository. For every claimed destination it
//! classifies the difference and, unless running dry, fixes it:
//!
//! - `Create`, `TypeMismatch`, `ContentMismatch`: run the pre script, move
//!   the old entry aside to `*.saved` (or remove it when backups are off),
//!   recreate it from the source, set owner and mode, run the post script.
//! - owner or mode only: change just those attributes; no hooks run.
//!
//! Post scripts of directories are deferred until the walk is complete and
//! then run deepest destination first, once per (destination, script).
//!
//! A failing destination is reported and skipped; the walk goes on. A
//! failing post script is reported too, but its destination still counts
//! as changed for the enclosing directory's post script.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, error, info, warn};

use crate::classify::{classify, FixAction};
use crate::defaults;
use crate::error::{Error, Result};
use crate::object::{EntryState, FsKind};
use crate::overlay::{EntryKind, FileOutcome, HookRegistry, RepositoryEntry, Visitor};
use crate::path::{depth, under_root, with_suffix};

/// Which repository tree is being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Make destinations match their sources.
    Overlay,
    /// Remove every resolved destination.
    Delete,
}

/// What happened, or would happen, to one destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fix(FixAction),
    Delete,
}

/// One changed destination, as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub dest: PathBuf,
    pub source: PathBuf,
    pub kind: EntryKind,
    pub action: Action,
    pub hook: Option<PathBuf>,
}

/// A hook script that ran, or would have run in a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookRun {
    pub script: PathBuf,
    pub dest: PathBuf,
    pub executed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    pub changes: Vec<Change>,
    pub hooks: Vec<HookRun>,
    pub errors: Vec<String>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty() && self.errors.is_empty()
    }

    pub fn merge(&mut self, other: ApplyReport) {
        self.changes.extend(other.changes);
        self.hooks.extend(other.hooks);
        self.errors.extend(other.errors);
    }
}

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Node name, used to name generated template output.
    pub node: String,
    /// Directory the destination paths live under, `/` on a real node.
    pub root: PathBuf,
    pub dry_run: bool,
    pub backup_copies: bool,
    pub tempdir: PathBuf,
    /// Restrict work to these destinations.
    pub only: Option<HashSet<PathBuf>>,
}

impl ApplyOptions {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            root: PathBuf::from("/"),
            dry_run: true,
            backup_copies: true,
            tempdir: defaults::default_tempdir(),
            only: None,
        }
    }
}

pub struct Applier {
    options: ApplyOptions,
    mode: Mode,
    report: ApplyReport,
    pending_dir_hooks: Vec<(PathBuf, PathBuf)>,
}

impl Applier {
    pub fn new(options: ApplyOptions, mode: Mode) -> Self {
        Self {
            options,
            mode,
            report: ApplyReport::default(),
            pending_dir_hooks: Vec::new(),
        }
    }

    /// Run the deferred directory post scripts and return the report.
    pub fn finish(mut self) -> ApplyReport {
        let mut pending = std::mem::take(&mut self.pending_dir_hooks);
        pending.sort_by_key(|(dest, _)| std::cmp::Reverse(depth(dest)));
        for (dest, script) in pending {
            let cwd = self.physical(&dest);
            if let Err(e) = self.run_hook(&script, &dest, &cwd) {
                self.fail(e);
            }
        }
        self.report
    }

    fn physical(&self, dest: &Path) -> PathBuf {
        under_root(&self.options.root, dest)
    }

    fn wanted(&self, dest: &Path) -> bool {
        self.options.only.as_ref().is_none_or(|only| only.contains(dest))
    }

    fn fail(&mut self, err: Error) {
        error!("{}", err);
        self.report.errors.push(err.to_string());
    }

    /// Returns whether the destination was reinstalled. Owner or mode
    /// fixes are reported as changes but do not count, so they never fire
    /// a post script of their own or of a parent directory.
    fn fix(&mut self, entry: &RepositoryEntry, hooks: &HookRegistry) -> Result<bool> {
        let src = EntryState::read(&entry.src)?;
        let dst_path = self.physical(&entry.dest);
        let dst = EntryState::probe(&dst_path)?;
        let action = classify(&src, dst.as_ref())?;
        if action.is_none() {
            debug!("{} is up to date", entry.dest.display());
            return Ok(false);
        }

        info!("{}: {}", entry.dest.display(), action);
        let post = hooks.post(&entry.dest).map(Path::to_path_buf);

        if let FixAction::Attributes { owner, mode } = action {
            if !self.options.dry_run {
                if owner {
                    src.kind.set_owner(&dst_path, src.uid, src.gid)?;
                }
                if mode {
                    src.kind.set_permissions(&dst_path, src.mode)?;
                }
            }
            self.record(entry, Action::Fix(action), None);
            return Ok(false);
        }

        if let Some(pre) = hooks.pre(&entry.dest) {
            self.run_hook(pre, &entry.dest, &existing_ancestor(&dst_path))?;
        }
        if !self.options.dry_run {
            self.reinstall(&src, &dst_path, dst.as_ref())?;
        }
        self.record(entry, Action::Fix(action), post.clone());

        if let Some(post) = post.filter(|_| !entry.is_dir) {
            // the destination changed even if its script fails
            if let Err(e) = self.run_hook(&post, &entry.dest, &existing_ancestor(&dst_path)) {
                self.fail(e);
            }
        }
        Ok(true)
    }

    fn record(&mut self, entry: &RepositoryEntry, action: Action, hook: Option<PathBuf>) {
        self.report.changes.push(Change {
            dest: entry.dest.clone(),
            source: entry.src.clone(),
            kind: entry.kind,
            action,
            hook,
        });
    }

    fn reinstall(&self, src: &EntryState, dst_path: &Path, existing: Option<&EntryState>) -> Result<()> {
        if let Some(existing) = existing {
            self.remove_existing(existing)?;
        }
        if let Some(parent) = dst_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::fs(parent, "create directory", e))?;
        }

        src.kind.create(src, dst_path)?;
        let created = EntryState::read(dst_path)?;
        if created.uid != src.uid || created.gid != src.gid {
            src.kind.set_owner(dst_path, src.uid, src.gid)?;
        }
        src.kind.set_permissions(dst_path, src.mode)
    }

    fn remove_existing(&self, existing: &EntryState) -> Result<()> {
        let path = &existing.path;
        if self.options.backup_copies {
            let saved = with_suffix(path, ".saved");
            if let Some(old) = EntryState::probe(&saved)? {
                remove_entry(&old)?;
            }
            debug!("saving {} as {}", path.display(), saved.display());
            fs::rename(path, &saved).map_err(|e| Error::fs(path, "rename", e))
        } else {
            remove_entry(existing)
        }
    }

    fn delete(&mut self, entry: &RepositoryEntry, hooks: &HookRegistry) -> Result<bool> {
        let dst_path = self.physical(&entry.dest);
        let dst = match EntryState::probe(&dst_path)? {
            Some(dst) => dst,
            None => return Ok(false),
        };
        if dst.kind == FsKind::Dir {
            return Err(Error::Filesystem {
                message: format!("refusing to delete directory '{}'", dst_path.display()),
            });
        }

        let post = hooks.post(&entry.dest).map(Path::to_path_buf);
        let cwd = existing_ancestor(&dst_path);
        if let Some(pre) = hooks.pre(&entry.dest) {
            self.run_hook(pre, &entry.dest, &cwd)?;
        }
        if !self.options.dry_run {
            self.remove_existing(&dst)?;
        }
        info!("{}: deleted", entry.dest.display());
        self.record(entry, Action::Delete, post.clone());

        if let Some(post) = post {
            if let Err(e) = self.run_hook(&post, &entry.dest, &cwd) {
                self.fail(e);
            }
        }
        Ok(true)
    }

    /// Run a template generator and return the file it produced.
    fn generate(&mut self, entry: &RepositoryEntry, generator: &Path) -> Result<PathBuf> {
        let tempdir = &self.options.tempdir;
        fs::create_dir_all(tempdir).map_err(|e| Error::fs(tempdir, "create directory", e))?;

        let name = entry
            .dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = tempdir.join(format!("{}._{}", name, self.options.node));
        if let Some(stale) = EntryState::probe(&output)? {
            remove_entry(&stale)?;
        }

        let cwd = entry.src.parent().unwrap_or_else(|| Path::new("/"));
        debug!("generating {} with {}", output.display(), generator.display());
        let status = Command::new(generator)
            .arg(&entry.src)
            .arg(&output)
            .current_dir(cwd)
            .status()
            .map_err(|e| Error::Hook {
                script: generator.display().to_string(),
                message: e.to_string(),
            })?;
        if !status.success() {
            return Err(Error::Hook {
                script: generator.display().to_string(),
                message: format!("exited with {}", status),
            });
        }
        if EntryState::probe(&output)?.is_none() {
            return Err(Error::Hook {
                script: generator.display().to_string(),
                message: format!("did not create {}", output.display()),
            });
        }
        Ok(output)
    }

    fn run_hook(&mut self, script: &Path, dest: &Path, cwd: &Path) -> Result<()> {
        let executed = !self.options.dry_run;
        self.report.hooks.push(HookRun {
            script: script.to_path_buf(),
            dest: dest.to_path_buf(),
            executed,
        });
        if !executed {
            return Ok(());
        }

        info!("running {}", script.display());
        let status = Command::new(script)
            .current_dir(cwd)
            .status()
            .map_err(|e| Error::Hook {
                script: script.display().to_string(),
                message: e.to_string(),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::Hook {
                script: script.display().to_string(),
                message: format!("exited with {}", status),
            })
        }
    }
}

impl Visitor for Applier {
    fn visit_file(&mut self, entry: &RepositoryEntry, hooks: &HookRegistry) -> Result<FileOutcome> {
        if !self.wanted(&entry.dest) {
            return Ok(FileOutcome::unchanged());
        }

        if entry.kind == EntryKind::Template {
            if self.mode == Mode::Delete {
                warn!("{}: templates have no meaning in the delete tree", entry.src.display());
                return Ok(FileOutcome::unchanged());
            }
            let generator = match hooks.generator(&entry.dest) {
                Some(generator) => generator.to_path_buf(),
                None => {
                    warn!("{}: no template generator, skipping", entry.src.display());
                    return Ok(FileOutcome::unchanged());
                }
            };
            return match self.generate(entry, &generator) {
                Ok(output) => Ok(FileOutcome {
                    modified: false,
                    generated: Some(output),
                }),
                Err(e) => {
                    self.fail(e);
                    Ok(FileOutcome::unchanged())
                }
            };
        }

        let result = match self.mode {
            Mode::Overlay => self.fix(entry, hooks),
            Mode::Delete => self.delete(entry, hooks),
        };
        match result {
            Ok(modified) => Ok(FileOutcome {
                modified,
                generated: None,
            }),
            Err(e) => {
                self.fail(e);
                Ok(FileOutcome::unchanged())
            }
        }
    }

    fn visit_dir(&mut self, entry: &RepositoryEntry, hooks: &HookRegistry) -> Result<bool> {
        if self.mode == Mode::Delete || !self.wanted(&entry.dest) {
            return Ok(false);
        }
        match self.fix(entry, hooks) {
            Ok(changed) => Ok(changed),
            Err(e) => {
                self.fail(e);
                Ok(false)
            }
        }
    }

    fn leave_dir(&mut self, entry: &RepositoryEntry, hooks: &HookRegistry, modified: bool) -> Result<()> {
        if !modified {
            return Ok(());
        }
        if let Some(script) = hooks.post(&entry.dest) {
            let pending = (entry.dest.clone(), script.to_path_buf());
            if !self.pending_dir_hooks.contains(&pending) {
                self.pending_dir_hooks.push(pending);
            }
        }
        Ok(())
    }
}

fn remove_entry(entry: &EntryState) -> Result<()> {
    let path = &entry.path;
    let result = if entry.kind == FsKind::Dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| Error::fs(path, "remove", e))
}

/// The closest existing ancestor directory of `path`.
fn existing_ancestor(path: &Path) -> PathBuf {
    path.ancestors()
        .skip(1)
        .find(|p| p.is_dir())
        .unwrap_or_else(|| Path::new("/"))
        .to_path_buf()
}
