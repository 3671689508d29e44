pub mod paths;

use std::fmt;

/// Identity of the invoking host user, used so session processes run under
/// the caller's uid/gid instead of root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostUser {
  pub uid: u32,
  pub gid: u32,
}

impl HostUser {
  /// Detect the current user at runtime
  #[cfg(unix)]
  pub fn current() -> Self {
    Self {
      uid: rustix::process::getuid().as_raw(),
      gid: rustix::process::getgid().as_raw(),
    }
  }

  #[cfg(not(unix))]
  pub fn current() -> Self {
    Self { uid: 0, gid: 0 }
  }
}

impl fmt::Display for HostUser {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.uid, self.gid)
  }
}

/// Returns whether a process with the given pid still exists.
///
/// A process owned by another user still counts as alive.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
  use rustix::io::Errno;
  use rustix::process::{Pid, test_kill_process};

  let Some(pid) = i32::try_from(pid).ok().and_then(Pid::from_raw) else {
    return false;
  };

  match test_kill_process(pid) {
    Ok(()) => true,
    Err(Errno::PERM) => true,
    Err(_) => false,
  }
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
  true
}
