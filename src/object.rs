//! # Filesystem Objects
//!
//! A snapshot of one source or destination entry, and the per-type
//! capabilities the classifier and the applier need: compare content,
//! create, set owner and set permissions.
//!
//! Dispatch is a plain `match` on [`FsKind`]; every kind supports every
//! capability, with no-ops where a capability does not apply (symlinks
//! have no mode of their own, directories and fifos have no content).

use std::fs::{self, File, FileType};
use std::io::{self, Read};
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// The kinds of filesystem entries that can be synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsKind {
    File,
    Dir,
    Symlink,
    Fifo,
    CharDev,
    BlockDev,
}

impl FsKind {
    fn from_file_type(file_type: FileType, path: &Path) -> Result<Self> {
        if file_type.is_symlink() {
            Ok(FsKind::Symlink)
        } else if file_type.is_dir() {
            Ok(FsKind::Dir)
        } else if file_type.is_file() {
            Ok(FsKind::File)
        } else if file_type.is_fifo() {
            Ok(FsKind::Fifo)
        } else if file_type.is_char_device() {
            Ok(FsKind::CharDev)
        } else if file_type.is_block_device() {
            Ok(FsKind::BlockDev)
        } else {
            Err(Error::UnsupportedFileType {
                path: path.display().to_string(),
            })
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FsKind::File => "file",
            FsKind::Dir => "directory",
            FsKind::Symlink => "symbolic link",
            FsKind::Fifo => "fifo",
            FsKind::CharDev => "character device",
            FsKind::BlockDev => "block device",
        }
    }

    /// Whether the entry's own permission bits are meaningful.
    pub fn has_mode(&self) -> bool {
        !matches!(self, FsKind::Symlink)
    }

    /// Compare type-specific content. Both states must be of this kind.
    pub fn same_content(&self, src: &EntryState, dst: &EntryState) -> Result<bool> {
        match self {
            FsKind::File => {
                if src.size != dst.size {
                    return Ok(false);
                }
                Ok(file_digest(&src.path)? == file_digest(&dst.path)?)
            }
            FsKind::Symlink => Ok(src.link_target == dst.link_target),
            FsKind::CharDev | FsKind::BlockDev => Ok(src.device() == dst.device()),
            FsKind::Dir | FsKind::Fifo => Ok(true),
        }
    }

    /// Create `dst` as a copy of `src`. `dst` must not exist.
    pub fn create(&self, src: &EntryState, dst: &Path) -> Result<()> {
        match self {
            FsKind::File => {
                fs::copy(&src.path, dst).map_err(|e| Error::fs(dst, "copy file to", e))?;
            }
            FsKind::Dir => {
                fs::create_dir(dst).map_err(|e| Error::fs(dst, "create directory", e))?;
            }
            FsKind::Symlink => {
                let target = src.link_target.as_deref().ok_or_else(|| Error::Filesystem {
                    message: format!("Symbolic link '{}' has no target", src.path.display()),
                })?;
                std::os::unix::fs::symlink(target, dst)
                    .map_err(|e| Error::fs(dst, "create symbolic link", e))?;
            }
            FsKind::Fifo => run_tool(Command::new("mkfifo").arg(dst), dst)?,
            FsKind::CharDev | FsKind::BlockDev => {
                let (major, minor) = src.device();
                let type_flag = if *self == FsKind::CharDev { "c" } else { "b" };
                run_tool(
                    Command::new("mknod")
                        .arg(dst)
                        .arg(type_flag)
                        .arg(major.to_string())
                        .arg(minor.to_string()),
                    dst,
                )?;
            }
        }
        Ok(())
    }

    /// Set owner and group without following symlinks.
    pub fn set_owner(&self, dst: &Path, uid: u32, gid: u32) -> Result<()> {
        std::os::unix::fs::lchown(dst, Some(uid), Some(gid))
            .map_err(|e| Error::fs(dst, "change owner of", e))
    }

    /// Set permission bits. A no-op for symlinks.
    pub fn set_permissions(&self, dst: &Path, mode: u32) -> Result<()> {
        if !self.has_mode() {
            return Ok(());
        }
        fs::set_permissions(dst, fs::Permissions::from_mode(mode))
            .map_err(|e| Error::fs(dst, "change mode of", e))
    }
}

fn run_tool(cmd: &mut Command, dst: &Path) -> Result<()> {
    debug!("running {:?}", cmd);
    let status = cmd.status().map_err(|e| Error::fs(dst, "create", e))?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Filesystem {
            message: format!("Failed to create '{}': {:?} exited with {}", dst.display(), cmd, status),
        })
    }
}

/// Attributes of one entry, read with `lstat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryState {
    pub path: PathBuf,
    pub kind: FsKind,
    pub uid: u32,
    pub gid: u32,
    /// Permission bits including setuid, setgid and sticky.
    pub mode: u32,
    pub size: u64,
    pub rdev: u64,
    pub link_target: Option<PathBuf>,
}

impl EntryState {
    /// Read the state of `path`, or `None` if nothing exists there.
    pub fn probe(path: &Path) -> Result<Option<Self>> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::fs(path, "stat", e)),
        };

        let kind = FsKind::from_file_type(meta.file_type(), path)?;
        let link_target = if kind == FsKind::Symlink {
            Some(fs::read_link(path).map_err(|e| Error::fs(path, "read link", e))?)
        } else {
            None
        };

        Ok(Some(Self {
            path: path.to_path_buf(),
            kind,
            uid: meta.uid(),
            gid: meta.gid(),
            mode: meta.mode() & 0o7777,
            size: meta.size(),
            rdev: meta.rdev(),
            link_target,
        }))
    }

    /// Like [`probe`](Self::probe), but the entry must exist.
    pub fn read(path: &Path) -> Result<Self> {
        Self::probe(path)?.ok_or_else(|| Error::Filesystem {
            message: format!("Source '{}' does not exist", path.display()),
        })
    }

    /// `(major, minor)` device numbers.
    pub fn device(&self) -> (u64, u64) {
        (major(self.rdev), minor(self.rdev))
    }
}

/// Major device number, Linux `dev_t` encoding.
pub fn major(rdev: u64) -> u64 {
    ((rdev >> 8) & 0xfff) | ((rdev >> 32) & !0xfff)
}

/// Minor device number, Linux `dev_t` encoding.
pub fn minor(rdev: u64) -> u64 {
    (rdev & 0xff) | ((rdev >> 12) & !0xff)
}

/// SHA-256 of a whole file, hex encoded.
pub fn file_digest(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| Error::fs(path, "open", e))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|e| Error::fs(path, "read", e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
