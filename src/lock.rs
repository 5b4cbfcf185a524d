// src/lock.rs
//
// Only one camshotd instance may run at a time: the pictures directory and
// the log file assume a single writer. A pid file created with O_EXCL
// serves as the guard; it is removed when the daemon exits.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another instance appears to be running (lock file {path} exists)")]
    Held { path: PathBuf },
    #[error("create lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct InstanceLock {
    path: PathBuf,
}

impl InstanceLock {
    // TODO: detect stale pid files left behind by a crash (read the pid
    // and probe /proc/<pid> before refusing to start).
    pub fn acquire(path: PathBuf) -> Result<Self, LockError> {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(LockError::Held { path })
            }
            Err(e) => Err(LockError::Io { path, source: e }),
        }
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camshotd.pid");

        let lock = InstanceLock::acquire(path.clone()).unwrap();
        assert!(matches!(
            InstanceLock::acquire(path.clone()),
            Err(LockError::Held { .. })
        ));
        drop(lock);

        // Released on drop: a new instance may start.
        let relock = InstanceLock::acquire(path.clone()).unwrap();
        assert!(path.is_file());
        drop(relock);
        assert!(!path.exists());
    }

    #[test]
    fn lock_file_records_the_pid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("camshotd.pid");

        let _lock = InstanceLock::acquire(path.clone()).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents.trim().parse::<u32>().unwrap(),
            std::process::id()
        );
    }
}
