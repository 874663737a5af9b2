//! Single running daemon per user session.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstanceError {
    #[error("MyCap is already running")]
    AlreadyRunning,

    #[error("Failed to acquire the instance lock {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create the instance mutex: {0}")]
    Os(String),
}

#[cfg(windows)]
mod imp {
    use windows::Win32::Foundation::{CloseHandle, ERROR_ALREADY_EXISTS, GetLastError, HANDLE};
    use windows::Win32::System::Threading::CreateMutexW;
    use windows::core::PCWSTR;

    use super::InstanceError;
    use crate::platform::win32::wide;

    pub const MUTEX_NAME: &str = "Local\\MyCapApp";

    #[derive(Debug)]
    pub struct Guard(HANDLE);

    impl Guard {
        pub fn acquire(name: &str) -> Result<Self, InstanceError> {
            let name = wide(name);
            let handle = unsafe { CreateMutexW(None, false, PCWSTR(name.as_ptr())) }
                .map_err(|e| InstanceError::Os(e.to_string()))?;
            if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
                unsafe {
                    let _ = CloseHandle(handle);
                }
                return Err(InstanceError::AlreadyRunning);
            }
            Ok(Self(handle))
        }
    }

    impl Drop for Guard {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }
}

#[cfg(not(windows))]
mod imp {
    use std::fs::{self, File, OpenOptions};
    use std::path::Path;

    use fs2::FileExt;

    use super::InstanceError;

    #[derive(Debug)]
    pub struct Guard(File);

    impl Guard {
        pub fn acquire(path: &Path) -> Result<Self, InstanceError> {
            let io_error = |source| InstanceError::Io {
                path: path.to_path_buf(),
                source,
            };

            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(path)
                .map_err(io_error)?;

            match file.try_lock_exclusive() {
                Ok(()) => Ok(Self(file)),
                Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                    Err(InstanceError::AlreadyRunning)
                }
                Err(err) => Err(io_error(err)),
            }
        }
    }

    impl Drop for Guard {
        fn drop(&mut self) {
            if let Err(err) = FileExt::unlock(&self.0) {
                log::warn!("Failed to release the instance lock: {}", err);
            }
        }
    }
}

/// Held for the daemon's lifetime; released on drop.
#[derive(Debug)]
pub struct SingleInstance {
    _guard: imp::Guard,
}

impl SingleInstance {
    /// Claims the per-session instance slot.
    ///
    /// `lock_dir` holds the lock file where no named mutex exists; Windows
    /// ignores it.
    pub fn acquire(lock_dir: &Path) -> Result<Self, InstanceError> {
        #[cfg(windows)]
        let guard = {
            let _ = lock_dir;
            imp::Guard::acquire(imp::MUTEX_NAME)?
        };
        #[cfg(not(windows))]
        let guard = imp::Guard::acquire(&lock_dir.join(LOCK_FILE_NAME))?;

        log::debug!("Single-instance guard acquired");
        Ok(Self { _guard: guard })
    }
}

#[cfg(not(windows))]
const LOCK_FILE_NAME: &str = "mycap.lock";

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;

    #[test]
    fn second_instance_is_refused_until_the_first_is_dropped() {
        let dir = tempfile::tempdir().unwrap();

        let first = SingleInstance::acquire(dir.path()).unwrap();
        assert!(matches!(
            SingleInstance::acquire(dir.path()),
            Err(InstanceError::AlreadyRunning)
        ));

        drop(first);
        assert!(SingleInstance::acquire(dir.path()).is_ok());
    }

    #[test]
    fn lock_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("MyCap");

        let _guard = SingleInstance::acquire(&nested).unwrap();
        assert!(nested.join(LOCK_FILE_NAME).exists());
    }
}
