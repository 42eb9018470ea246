//! Cross-process lock built on a System V semaphore.
//!
//! Both lock and unlock use `SEM_UNDO`, so the kernel releases the lock if
//! the holder dies.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, warn};

use super::{ipc_key, last_errno};
use crate::error::{LegendreError, Result};

const SEM_UNDO: libc::c_short = libc::SEM_UNDO as libc::c_short;

/// One System V semaphore keyed on a file.
#[derive(Debug)]
pub struct Semaphore {
    id: libc::c_int,
    path: PathBuf,
    locked_here: AtomicBool,
}

impl Semaphore {
    /// Get or create the semaphore for `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let key = ipc_key(path, 1)?;
        // SAFETY: plain syscall with integer arguments.
        let id = unsafe { libc::semget(key, 1, libc::IPC_CREAT | 0o600) };
        if id < 0 {
            return Err(LegendreError::bad_parameter("semget", path));
        }
        Ok(Self {
            id,
            path: path.to_path_buf(),
            locked_here: AtomicBool::new(false),
        })
    }

    /// Get the semaphore for `path` if one exists.
    pub fn existing(path: &Path) -> Result<Option<Self>> {
        let key = ipc_key(path, 1)?;
        // SAFETY: plain syscall with integer arguments.
        let id = unsafe { libc::semget(key, 0, 0) };
        if id < 0 {
            if last_errno() == libc::ENOENT {
                return Ok(None);
            }
            return Err(LegendreError::bad_parameter("semget", path));
        }
        Ok(Some(Self {
            id,
            path: path.to_path_buf(),
            locked_here: AtomicBool::new(false),
        }))
    }

    /// Block until the lock is free, then take it.
    pub fn lock(&self) -> Result<IpcLock<'_>> {
        // Wait for zero, then increment, as one atomic operation
        let mut ops = [
            libc::sembuf {
                sem_num: 0,
                sem_op: 0,
                sem_flg: SEM_UNDO,
            },
            libc::sembuf {
                sem_num: 0,
                sem_op: 1,
                sem_flg: SEM_UNDO,
            },
        ];
        let start = Instant::now();
        self.semop(&mut ops, "semop(lock)")?;
        self.locked_here.store(true, Ordering::SeqCst);
        debug!(
            path = %self.path.display(),
            waited_ms = start.elapsed().as_millis() as u64,
            "Acquired shared memory lock"
        );
        Ok(IpcLock { semaphore: self })
    }

    fn unlock(&self) -> Result<()> {
        let mut ops = [libc::sembuf {
            sem_num: 0,
            sem_op: -1,
            sem_flg: SEM_UNDO,
        }];
        self.semop(&mut ops, "semop(unlock)")?;
        self.locked_here.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Current semaphore value; non-zero while some process holds the lock.
    pub fn value(&self) -> Result<i32> {
        // SAFETY: GETVAL takes no fourth argument.
        let value = unsafe { libc::semctl(self.id, 0, libc::GETVAL) };
        if value < 0 {
            return Err(LegendreError::bad_parameter("semctl(GETVAL)", &self.path));
        }
        Ok(value)
    }

    /// Release a lock this instance still holds. Errors are logged, not returned.
    pub fn release_if_held(&self) {
        if !self.locked_here.load(Ordering::SeqCst) {
            return;
        }
        match self.value() {
            Ok(v) if v > 0 => {
                if let Err(e) = self.unlock() {
                    warn!(path = %self.path.display(), error = %e, "Defensive unlock failed");
                }
            }
            Ok(_) => self.locked_here.store(false, Ordering::SeqCst),
            Err(e) => warn!(path = %self.path.display(), error = %e, "Cannot read lock state"),
        }
    }

    /// Remove the semaphore from the host.
    pub fn remove(self) -> Result<()> {
        // SAFETY: IPC_RMID takes no fourth argument.
        let rc = unsafe { libc::semctl(self.id, 0, libc::IPC_RMID) };
        if rc < 0 && last_errno() != libc::EINVAL {
            return Err(LegendreError::bad_parameter("semctl(IPC_RMID)", &self.path));
        }
        Ok(())
    }

    fn semop(&self, ops: &mut [libc::sembuf], call: &str) -> Result<()> {
        loop {
            // SAFETY: ops points to ops.len() initialised sembuf values.
            let rc = unsafe { libc::semop(self.id, ops.as_mut_ptr(), ops.len()) };
            if rc == 0 {
                return Ok(());
            }
            if last_errno() != libc::EINTR {
                return Err(LegendreError::bad_parameter(call, &self.path));
            }
        }
    }
}

/// Held lock; released when dropped.
#[derive(Debug)]
pub struct IpcLock<'a> {
    semaphore: &'a Semaphore,
}

impl IpcLock<'_> {
    /// Release explicitly, surfacing any error.
    pub fn unlock(self) -> Result<()> {
        let semaphore = self.semaphore;
        std::mem::forget(self);
        semaphore.unlock()
    }
}

impl Drop for IpcLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.semaphore.unlock() {
            warn!(path = %self.semaphore.path.display(), error = %e, "Unlock failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_unlock_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sem");
        std::fs::write(&path, b"x").unwrap();

        let sem = Semaphore::open(&path).unwrap();
        assert_eq!(sem.value().unwrap(), 0);
        {
            let _guard = sem.lock().unwrap();
            assert_eq!(sem.value().unwrap(), 1);
        }
        assert_eq!(sem.value().unwrap(), 0);

        let guard = sem.lock().unwrap();
        guard.unlock().unwrap();
        assert_eq!(sem.value().unwrap(), 0);

        assert!(Semaphore::existing(&path).unwrap().is_some());
        sem.remove().unwrap();
        assert!(Semaphore::existing(&path).unwrap().is_none());
    }

    #[test]
    fn test_release_if_held_after_leaked_guard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sem");
        std::fs::write(&path, b"x").unwrap();

        let sem = Semaphore::open(&path).unwrap();
        std::mem::forget(sem.lock().unwrap());
        assert_eq!(sem.value().unwrap(), 1);
        sem.release_if_held();
        assert_eq!(sem.value().unwrap(), 0);
        sem.remove().unwrap();
    }
}
