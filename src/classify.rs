//! # Change Classification
//!
//! Turns a resolved (source, destination) pair into the single fix the
//! destination needs. The source entry is the source of truth for type,
//! content, owner and mode.
//!
//! The checks run in a fixed order and stop at the first reinstall-level
//! difference:
//!
//! 1. destination missing: [`FixAction::Create`]
//! 2. different type: [`FixAction::TypeMismatch`]
//! 3. different content: [`FixAction::ContentMismatch`]
//! 4. otherwise owner and mode are checked independently and reported
//!    together as [`FixAction::Attributes`], or [`FixAction::None`].

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::object::EntryState;

/// The correction one destination needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixAction {
    None,
    Create,
    TypeMismatch,
    ContentMismatch,
    /// Content is correct; at least one of the flags is set.
    Attributes { owner: bool, mode: bool },
}

impl FixAction {
    pub fn is_none(&self) -> bool {
        matches!(self, FixAction::None)
    }

    /// Whether the destination has to be (re)created from the source.
    /// Only these fixes run pre and post hooks.
    pub fn needs_reinstall(&self) -> bool {
        matches!(
            self,
            FixAction::Create | FixAction::TypeMismatch | FixAction::ContentMismatch
        )
    }

    pub fn owner_mismatch(&self) -> bool {
        matches!(self, FixAction::Attributes { owner: true, .. })
    }

    pub fn mode_mismatch(&self) -> bool {
        matches!(self, FixAction::Attributes { mode: true, .. })
    }
}

impl fmt::Display for FixAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixAction::None => write!(f, "ok"),
            FixAction::Create => write!(f, "does not exist"),
            FixAction::TypeMismatch => write!(f, "type mismatch"),
            FixAction::ContentMismatch => write!(f, "content mismatch"),
            FixAction::Attributes { owner, mode } => match (owner, mode) {
                (true, true) => write!(f, "owner and mode mismatch"),
                (true, false) => write!(f, "owner mismatch"),
                _ => write!(f, "mode mismatch"),
            },
        }
    }
}

/// Classify a destination state against its source.
pub fn classify(src: &EntryState, dst: Option<&EntryState>) -> Result<FixAction> {
    let dst = match dst {
        Some(dst) => dst,
        None => return Ok(FixAction::Create),
    };

    if src.kind != dst.kind {
        return Ok(FixAction::TypeMismatch);
    }
    if !src.kind.same_content(src, dst)? {
        return Ok(FixAction::ContentMismatch);
    }

    let owner = src.uid != dst.uid || src.gid != dst.gid;
    let mode = src.kind.has_mode() && src.mode != dst.mode;
    if owner || mode {
        Ok(FixAction::Attributes { owner, mode })
    } else {
        Ok(FixAction::None)
    }
}

/// Read both paths and classify them. The source must exist.
pub fn classify_paths(src: &Path, dst: &Path) -> Result<FixAction> {
    let src = EntryState::read(src)?;
    let dst = EntryState::probe(dst)?;
    classify(&src, dst.as_ref())
}
