//! Kernel advisory locks and the holder record stored beside them.
//!
//! Both strategies hold an exclusive `flock`/`LockFileEx` lock on an open
//! file for as long as they own the instance. The kernel drops it when the
//! holding process dies, which is how a dead holder is told apart from a
//! live one.

use super::metadata::HolderRecord;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// What a lock object's file says about its previous holder.
pub(super) enum PreviousHolder {
    Clean,
    Record(HolderRecord),
    Garbled,
}

/// Result of probing another process's lock object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Probe {
    /// No file at the path.
    Missing,
    /// The file exists and nobody holds its lock.
    Free,
    /// A live process holds the lock.
    Held,
}

/// Take the exclusive lock without waiting. `Ok(false)` means contended.
pub(super) fn try_lock(file: &File) -> io::Result<bool> {
    match file.try_lock_exclusive() {
        Ok(()) => Ok(true),
        Err(e) if is_contended(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

pub(super) fn unlock(file: &File) -> io::Result<()> {
    FileExt::unlock(file)
}

/// Check whether a live process holds the lock on `path`.
///
/// The lock is taken and dropped immediately when free, so a concurrent
/// acquirer may briefly see contention.
pub(super) fn probe(path: &Path) -> io::Result<Probe> {
    let file = match OpenOptions::new().read(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Probe::Missing),
        Err(e) => return Err(e),
    };
    if try_lock(&file)? {
        let _ = unlock(&file);
        Ok(Probe::Free)
    } else {
        Ok(Probe::Held)
    }
}

pub(super) fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || (e.raw_os_error().is_some()
            && e.raw_os_error() == fs2::lock_contended_error().raw_os_error())
}

pub(super) fn read_previous(file: &mut File) -> io::Result<PreviousHolder> {
    let mut content = String::new();
    file.seek(SeekFrom::Start(0))?;
    if file.read_to_string(&mut content).is_err() {
        return Ok(PreviousHolder::Garbled);
    }
    if content.trim().is_empty() {
        return Ok(PreviousHolder::Clean);
    }
    Ok(match HolderRecord::parse(&content) {
        Some(record) => PreviousHolder::Record(record),
        None => PreviousHolder::Garbled,
    })
}

pub(super) fn write_record(file: &mut File, record: &HolderRecord) -> io::Result<()> {
    let json = record
        .to_json()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(json.as_bytes())?;
    file.sync_all()
}

/// Whether `file` is still the file linked at `path`.
///
/// A releasing holder unlinks its lock file before unlocking it, so a file
/// opened just before that can be locked after it is gone.
#[cfg(unix)]
pub(super) fn still_linked(file: &File, path: &Path) -> io::Result<bool> {
    use std::os::unix::fs::MetadataExt;

    let open = file.metadata()?;
    match std::fs::metadata(path) {
        Ok(linked) => Ok(open.dev() == linked.dev() && open.ino() == linked.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Whether `file` is still the file linked at `path`.
///
/// Without inode identity in std only the existence of the path is checked.
#[cfg(not(unix))]
pub(super) fn still_linked(_file: &File, path: &Path) -> io::Result<bool> {
    Ok(path.exists())
}
