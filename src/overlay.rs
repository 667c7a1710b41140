//! # Overlay Resolution
//!
//! The repository holds one directory per group at its top level
//! (`overlay/all`, `overlay/web`, `overlay/n1`, ...). Below that, entry
//! names may carry suffixes that scope them further:
//!
//! ```text
//! hosts            no extension, least important
//! hosts._web       only for nodes in group web
//! hosts._web.post  post script run after hosts changed on web nodes
//! hosts.pre        pre script run before hosts is reinstalled
//! hosts._template  template, turned into a file by hosts._template.post
//! ```
//!
//! For one node, [`Resolver::visit`] walks every top-level group directory
//! the node belongs to, most important first, and hands each destination
//! path to a [`Visitor`] exactly once: the first (most important) source
//! seen claims it and every later candidate is shadowed.
//!
//! Within a directory, hook scripts and template generators are sorted
//! ahead of regular entries so they are registered in the
//! [`HookRegistry`] before the files they belong to are visited.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::groups::GroupModel;
use crate::path::IgnoreRules;

/// The role of a repository entry, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Carries a group extension that applies to this node.
    Regular,
    /// Carries no group extension at all.
    NoExtension,
    PostScript,
    PreScript,
    Template,
    /// Generator that turns a template into a regular file.
    TemplatePostScript,
}

impl EntryKind {
    /// Sort tier within one directory listing: hooks first, then template
    /// generators, then templates, then everything else.
    fn tier(&self) -> u8 {
        match self {
            EntryKind::PostScript | EntryKind::PreScript => 0,
            EntryKind::TemplatePostScript => 1,
            EntryKind::Template => 2,
            EntryKind::Regular | EntryKind::NoExtension => 3,
        }
    }

    pub fn is_hook(&self) -> bool {
        matches!(
            self,
            EntryKind::PostScript | EntryKind::PreScript | EntryKind::TemplatePostScript
        )
    }
}

/// A repository entry mapped to its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryEntry {
    pub src: PathBuf,
    /// Absolute destination path on the node.
    pub dest: PathBuf,
    pub kind: EntryKind,
    /// Index into the node's importance list; lower wins.
    pub importance: usize,
    pub is_dir: bool,
}

/// Result of splitting an entry name into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Entry {
        name: String,
        kind: EntryKind,
        importance: usize,
    },
    /// The group exists but this node is not in it.
    Foreign { group: String },
    /// No configuration defines the group.
    Unknown { group: String },
    Invalid { reason: &'static str },
}

/// Walk policy, filled in from configuration.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    pub require_extension: bool,
    pub ignore_dotfiles: bool,
    pub ignore_dotdirs: bool,
    pub ignore: IgnoreRules,
}

/// Hook scripts registered for destinations at the current directory
/// level. The first registration for a destination wins.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    post: HashMap<PathBuf, PathBuf>,
    pre: HashMap<PathBuf, PathBuf>,
    generators: HashMap<PathBuf, PathBuf>,
}

impl HookRegistry {
    pub fn post(&self, dest: &Path) -> Option<&Path> {
        self.post.get(dest).map(PathBuf::as_path)
    }

    pub fn pre(&self, dest: &Path) -> Option<&Path> {
        self.pre.get(dest).map(PathBuf::as_path)
    }

    pub fn generator(&self, dest: &Path) -> Option<&Path> {
        self.generators.get(dest).map(PathBuf::as_path)
    }

    /// Register `entry` unless a more important hook of the same kind
    /// already claimed its destination. Returns whether it was registered.
    pub fn register(&mut self, entry: &RepositoryEntry) -> bool {
        let map = match entry.kind {
            EntryKind::PostScript => &mut self.post,
            EntryKind::PreScript => &mut self.pre,
            EntryKind::TemplatePostScript => &mut self.generators,
            _ => return false,
        };
        if map.contains_key(&entry.dest) {
            return false;
        }
        map.insert(entry.dest.clone(), entry.src.clone());
        true
    }

    /// The registry a subdirectory starts with: only the hooks registered
    /// for the subdirectory itself.
    pub fn seeded_for(&self, dest: &Path) -> HookRegistry {
        let pick = |map: &HashMap<PathBuf, PathBuf>| {
            map.get(dest)
                .map(|src| HashMap::from([(dest.to_path_buf(), src.clone())]))
                .unwrap_or_default()
        };
        HookRegistry {
            post: pick(&self.post),
            pre: pick(&self.pre),
            generators: pick(&self.generators),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.post.is_empty() && self.pre.is_empty() && self.generators.is_empty()
    }
}

/// What a visitor did with one file entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOutcome {
    /// The destination was (or would be) reinstalled or removed. Owner
    /// and mode fixes leave this unset.
    pub modified: bool,
    /// For template entries: the file the generator produced.
    pub generated: Option<PathBuf>,
}

impl FileOutcome {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn modified() -> Self {
        Self {
            modified: true,
            generated: None,
        }
    }
}

/// Receives every claimed destination of one resolution pass.
pub trait Visitor {
    /// Called once per claimed file, symlink or special file. Template
    /// entries may return the generated file, which is then visited again
    /// as a regular entry for the same destination.
    fn visit_file(&mut self, entry: &RepositoryEntry, hooks: &HookRegistry) -> Result<FileOutcome>;

    /// Called once per claimed directory, before its contents. Returns
    /// whether the directory itself was recreated.
    fn visit_dir(&mut self, entry: &RepositoryEntry, hooks: &HookRegistry) -> Result<bool>;

    /// Called after the contents of every source directory, claimed or
    /// not, with whether the directory or anything below it changed.
    fn leave_dir(
        &mut self,
        _entry: &RepositoryEntry,
        _hooks: &HookRegistry,
        _modified: bool,
    ) -> Result<()> {
        Ok(())
    }
}

/// Per-pass state: which destinations are taken, and whether by a
/// directory.
#[derive(Debug, Default)]
struct ResolutionContext {
    claimed: HashMap<PathBuf, bool>,
}

enum Claim {
    New,
    /// Already claimed by a directory.
    Dir,
    /// Already claimed by something else.
    Taken,
}

impl ResolutionContext {
    fn claim(&mut self, dest: &Path, is_dir: bool) -> Claim {
        match self.claimed.get(dest) {
            Some(true) if is_dir => Claim::Dir,
            Some(_) => Claim::Taken,
            None => {
                self.claimed.insert(dest.to_path_buf(), is_dir);
                Claim::New
            }
        }
    }
}

/// Overlay resolution for one node.
#[derive(Debug)]
pub struct Resolver<'a> {
    model: &'a GroupModel,
    options: &'a ResolverOptions,
    importance: Vec<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(model: &'a GroupModel, node: &str, options: &'a ResolverOptions) -> Result<Self> {
        Ok(Self {
            model,
            options,
            importance: model.importance_list(node)?,
        })
    }

    pub fn importance_list(&self) -> &[String] {
        &self.importance
    }

    fn least_important(&self) -> usize {
        self.importance.len() - 1
    }

    /// Split a directory entry name into stripped name, kind and
    /// importance for this node.
    pub fn classify_entry(&self, name: &str) -> Classification {
        #[derive(PartialEq)]
        enum Hook {
            Pre,
            Post,
        }

        let mut base = name;
        let mut hook = None;
        let mut template = false;
        let mut group: Option<usize> = None;

        while let Some((stem, ext)) = split_extension(base) {
            match ext {
                "post" | "pre" if hook.is_none() => {
                    hook = Some(if ext == "post" { Hook::Post } else { Hook::Pre });
                }
                "_template" if !template => template = true,
                _ if ext.len() > 1 && ext.starts_with('_') && group.is_none() => {
                    let name = &ext[1..];
                    match self.importance.iter().position(|g| g == name) {
                        Some(idx) => group = Some(idx),
                        None if self.model.is_known_group(name) => {
                            return Classification::Foreign {
                                group: name.to_string(),
                            }
                        }
                        None => {
                            return Classification::Unknown {
                                group: name.to_string(),
                            }
                        }
                    }
                }
                _ => break,
            }
            base = stem;
        }

        let kind = match (hook, template) {
            (Some(Hook::Post), true) => EntryKind::TemplatePostScript,
            (Some(Hook::Pre), true) => {
                return Classification::Invalid {
                    reason: "templates cannot have pre scripts",
                }
            }
            (Some(Hook::Post), false) => EntryKind::PostScript,
            (Some(Hook::Pre), false) => EntryKind::PreScript,
            (None, true) => EntryKind::Template,
            (None, false) if group.is_some() => EntryKind::Regular,
            (None, false) => EntryKind::NoExtension,
        };

        Classification::Entry {
            name: base.to_string(),
            kind,
            importance: group.unwrap_or_else(|| self.least_important()),
        }
    }

    /// Walk the group directories under `root` for this node.
    ///
    /// Destinations claimed through a more important group directory
    /// shadow the same destination in less important ones. Returns whether
    /// anything was modified.
    pub fn visit<V: Visitor>(&self, root: &Path, visitor: &mut V) -> Result<bool> {
        let mut top: Vec<(usize, PathBuf)> = Vec::new();
        for (name, path, is_dir) in list_dir(root)? {
            if !is_dir {
                debug!("skipping {}: not a group directory", path.display());
                continue;
            }
            match self.importance.iter().position(|g| *g == name) {
                Some(idx) => top.push((idx, path)),
                None if self.model.is_known_group(&name) => {
                    debug!("skipping {}: not a group of this node", path.display())
                }
                None => warn!("{}: unknown group '{}', skipping", path.display(), name),
            }
        }
        top.sort_by_key(|(idx, _)| *idx);

        let mut ctx = ResolutionContext::default();
        let mut modified = false;
        for (_, dir) in top {
            modified |= self.resolve_directory(
                &mut ctx,
                &dir,
                Path::new("/"),
                HookRegistry::default(),
                visitor,
            )?;
        }
        Ok(modified)
    }

    fn resolve_directory<V: Visitor>(
        &self,
        ctx: &mut ResolutionContext,
        src_dir: &Path,
        dest_dir: &Path,
        mut hooks: HookRegistry,
        visitor: &mut V,
    ) -> Result<bool> {
        let mut entries = Vec::new();
        for (name, src, is_dir) in list_dir(src_dir)? {
            if self.options.ignore.matches(&name) {
                debug!("ignoring {}", src.display());
                continue;
            }
            if name.starts_with('.')
                && ((is_dir && self.options.ignore_dotdirs)
                    || (!is_dir && self.options.ignore_dotfiles))
            {
                debug!("ignoring {}", src.display());
                continue;
            }

            match self.classify_entry(&name) {
                Classification::Entry {
                    name: stripped,
                    kind,
                    importance,
                } => {
                    if stripped != name && self.options.ignore.matches(&stripped) {
                        debug!("ignoring {}", src.display());
                        continue;
                    }
                    entries.push(RepositoryEntry {
                        dest: dest_dir.join(&stripped),
                        src,
                        kind,
                        importance,
                        is_dir,
                    });
                }
                Classification::Foreign { group } => {
                    debug!("skipping {}: not in group {}", src.display(), group);
                }
                Classification::Unknown { group } => {
                    if self.options.require_extension {
                        return Err(Error::UnknownExtension {
                            path: src.display().to_string(),
                            group,
                        });
                    }
                    warn!("{}: unknown group '{}', skipping", src.display(), group);
                }
                Classification::Invalid { reason } => {
                    warn!("{}: {}, skipping", src.display(), reason);
                }
            }
        }

        entries.sort_by_key(|e| (e.kind.tier(), e.importance));

        let mut modified = false;
        for entry in entries {
            if entry.kind.is_hook() {
                if entry.is_dir {
                    warn!("{}: hook scripts must be files, skipping", entry.src.display());
                } else if !hooks.register(&entry) {
                    debug!("{} is shadowed by a more important hook", entry.src.display());
                }
                continue;
            }

            if entry.is_dir {
                modified |= self.resolve_subdirectory(ctx, &entry, &hooks, visitor)?;
                continue;
            }

            if entry.kind == EntryKind::NoExtension && self.options.require_extension {
                warn!("{}: no group extension, skipping", entry.src.display());
                continue;
            }

            match ctx.claim(&entry.dest, false) {
                Claim::New => {}
                _ => {
                    debug!("{} is shadowed by a more important entry", entry.src.display());
                    continue;
                }
            }

            let outcome = visitor.visit_file(&entry, &hooks)?;
            modified |= outcome.modified;
            if entry.kind == EntryKind::Template {
                if let Some(generated) = outcome.generated {
                    let regular = RepositoryEntry {
                        src: generated,
                        kind: EntryKind::Regular,
                        ..entry
                    };
                    modified |= visitor.visit_file(&regular, &hooks)?.modified;
                }
            }
        }

        Ok(modified)
    }

    fn resolve_subdirectory<V: Visitor>(
        &self,
        ctx: &mut ResolutionContext,
        entry: &RepositoryEntry,
        hooks: &HookRegistry,
        visitor: &mut V,
    ) -> Result<bool> {
        if entry.kind == EntryKind::Template {
            warn!("{}: templates must be files, skipping", entry.src.display());
            return Ok(false);
        }

        let changed = match ctx.claim(&entry.dest, true) {
            Claim::New => visitor.visit_dir(entry, hooks)?,
            Claim::Dir => false,
            Claim::Taken => {
                debug!(
                    "{} is shadowed by a more important non-directory entry",
                    entry.src.display()
                );
                return Ok(false);
            }
        };

        let below = self.resolve_directory(
            ctx,
            &entry.src,
            &entry.dest,
            hooks.seeded_for(&entry.dest),
            visitor,
        )?;
        visitor.leave_dir(entry, hooks, changed || below)?;
        Ok(changed || below)
    }
}

/// Split off the last `.`-delimited extension. A leading dot is part of
/// the name, not an extension separator.
fn split_extension(name: &str) -> Option<(&str, &str)> {
    let pos = name.rfind('.')?;
    if pos == 0 || pos + 1 == name.len() {
        return None;
    }
    Some((&name[..pos], &name[pos + 1..]))
}

/// Directory entries as `(name, path, is_dir)`, sorted by name. Symlinks
/// are never followed.
fn list_dir(dir: &Path) -> Result<Vec<(String, PathBuf, bool)>> {
    let mut entries = Vec::new();
    let read = fs::read_dir(dir).map_err(|e| Error::fs(dir, "read directory", e))?;
    for item in read {
        let item = item.map_err(|e| Error::fs(dir, "read directory", e))?;
        let path = item.path();
        let name = match item.file_name().into_string() {
            Ok(name) => name,
            Err(_) => {
                warn!("{}: name is not valid UTF-8, skipping", path.display());
                continue;
            }
        };
        let is_dir = item
            .file_type()
            .map_err(|e| Error::fs(&path, "stat", e))?
            .is_dir();
        entries.push((name, path, is_dir));
    }
    entries.sort();
    Ok(entries)
}

/// One line of resolver output: a destination, its winning source, and
/// the post hook registered for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub entry: RepositoryEntry,
    pub post: Option<PathBuf>,
}

/// Visitor that records every claimed destination without touching the
/// filesystem. Template entries are recorded as templates.
#[derive(Debug, Default)]
pub struct Collector {
    pub resolved: Vec<Resolved>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The winning entry for `dest`, if any.
    pub fn find(&self, dest: &Path) -> Option<&Resolved> {
        self.resolved.iter().find(|r| r.entry.dest == dest)
    }

    fn record(&mut self, entry: &RepositoryEntry, hooks: &HookRegistry) {
        self.resolved.push(Resolved {
            entry: entry.clone(),
            post: hooks.post(&entry.dest).map(Path::to_path_buf),
        });
    }
}

impl Visitor for Collector {
    fn visit_file(&mut self, entry: &RepositoryEntry, hooks: &HookRegistry) -> Result<FileOutcome> {
        self.record(entry, hooks);
        Ok(FileOutcome::unchanged())
    }

    fn visit_dir(&mut self, entry: &RepositoryEntry, hooks: &HookRegistry) -> Result<bool> {
        self.record(entry, hooks);
        Ok(false)
    }
}
