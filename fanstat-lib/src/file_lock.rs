use crate::Result;
use fs4::fs_std::FileExt;
use ohno::IntoAppError;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "      lock";

/// Exclusive advisory lock on a sidecar `.lock` file, released when dropped.
#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            log::warn!(target: LOG_TARGET, "Could not release lock '{}': {e:#}", self.path.display());
        }
    }
}

/// The lock file guarding `data_path`.
#[must_use]
pub fn lock_path_for(data_path: &Path) -> PathBuf {
    let mut name = data_path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".lock");
    data_path.with_file_name(name)
}

/// Block until the exclusive lock guarding `data_path` is held.
///
/// Other fanstat processes touching the same file wait on the same lock, so a
/// read-modify-write done under the guard never loses a concurrent update.
pub async fn acquire_lock(data_path: &Path) -> Result<FileLockGuard> {
    let lock_path = lock_path_for(data_path);

    if let Some(parent) = lock_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).into_app_err_with(|| format!("creating directory '{}'", parent.display()))?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .into_app_err_with(|| format!("opening lock file '{}'", lock_path.display()))?;

    // lock_exclusive may block for as long as another process holds the lock
    let (file, path) = tokio::task::spawn_blocking(move || {
        file.lock_exclusive()
            .into_app_err_with(|| format!("acquiring exclusive lock '{}'", lock_path.display()))?;
        log::trace!(target: LOG_TARGET, "Acquired lock '{}'", lock_path.display());
        Ok::<_, ohno::AppError>((file, lock_path))
    })
    .await
    .into_app_err("lock task panicked")??;

    Ok(FileLockGuard { file, path })
}
