//! Exclusive lock on an output destination.
//!
//! Only one writer, in any process, may produce a given output file at a
//! time. The lock lives in a sibling `<file>.lock` and is held for the
//! lifetime of [`OutputLock`].
//!
//! - The lock file is created if it doesn't exist.
//! - Acquisition never blocks; contention is reported as `WouldBlock`
//!   wrapping the OS error.
//! - Dropping the lock closes the file, which releases it. The file itself
//!   stays on disk and is reused by the next writer: unlinking a locked
//!   file lets two writers end up holding locks on different inodes.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{Error as IoError, Result as IoResult};
use std::path::{Path, PathBuf};

/// Exclusive lock guarding one output file.
#[derive(Debug)]
pub struct OutputLock {
    _file: File,
    path: PathBuf,
}

impl OutputLock {
    /// Attempts to lock `target` for writing.
    ///
    /// # Errors
    /// - `ErrorKind::WouldBlock` if another writer holds the lock
    /// - `ErrorKind::PermissionDenied` if the directory is not writable
    /// - `ErrorKind::NotFound` if the directory does not exist
    pub fn acquire(target: &Path) -> IoResult<Self> {
        let lock_path = lock_path_for(target);

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        Self::try_lock(&file)?;

        Ok(Self {
            _file: file,
            path: lock_path,
        })
    }

    /// Returns the path to the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(unix)]
    fn try_lock(file: &File) -> IoResult<()> {
        use std::os::unix::io::AsRawFd;

        let fd = file.as_raw_fd();
        // SAFETY: `fd` is a valid open descriptor owned by `file` for the
        // duration of this call.
        let result = unsafe { libc::flock(fd, libc::LOCK_EX | libc::LOCK_NB) };

        if result != 0 {
            // EWOULDBLOCK already maps to ErrorKind::WouldBlock.
            return Err(IoError::last_os_error());
        }

        Ok(())
    }

    #[cfg(windows)]
    fn try_lock(file: &File) -> IoResult<()> {
        use std::io::ErrorKind;
        use std::os::windows::io::AsRawHandle;
        use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
        use windows_sys::Win32::Storage::FileSystem::{
            LockFileEx, LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY,
        };

        let handle = file.as_raw_handle() as HANDLE;
        // SAFETY: `handle` is owned by `file`; OVERLAPPED is plain data and
        // zero is its documented initial state.
        let result = unsafe {
            let mut overlapped = std::mem::zeroed::<windows_sys::Win32::System::IO::OVERLAPPED>();
            LockFileEx(
                handle,
                LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
                0,
                1,
                0,
                &mut overlapped,
            )
        };

        if result == 0 {
            let err = IoError::last_os_error();
            if err.raw_os_error() == i32::try_from(ERROR_LOCK_VIOLATION).ok() {
                return Err(IoError::new(ErrorKind::WouldBlock, err));
            }
            return Err(err);
        }

        Ok(())
    }

    #[cfg(not(any(unix, windows)))]
    fn try_lock(_file: &File) -> IoResult<()> {
        Err(IoError::new(
            std::io::ErrorKind::Unsupported,
            "file locking not supported on this platform",
        ))
    }
}

fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map_or_else(|| OsString::from("output"), ToOwned::to_owned);
    name.push(".lock");
    target.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;
    use tempfile::tempdir;

    #[test]
    fn test_lock_acquire_release() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("NavmeshCollector.json");

        {
            let lock = OutputLock::acquire(&target).unwrap();
            assert!(lock.path().exists());
            assert_eq!(lock.path(), dir.path().join("NavmeshCollector.json.lock"));
        }
        // Released on drop.
        assert!(OutputLock::acquire(&target).is_ok());
    }

    #[test]
    fn test_lock_prevents_double_acquire() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.json");

        let _lock1 = OutputLock::acquire(&target).unwrap();

        let err = OutputLock::acquire(&target).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
    }

    #[test]
    fn test_lock_file_is_kept_and_reused() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("out.json");
        let lock_path = OutputLock::acquire(&target).unwrap().path().to_path_buf();

        assert!(lock_path.exists());
        let again = OutputLock::acquire(&target).unwrap();
        assert_eq!(again.path(), lock_path);
    }

    #[test]
    fn test_lock_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("missing").join("out.json");
        let err = OutputLock::acquire(&target).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
