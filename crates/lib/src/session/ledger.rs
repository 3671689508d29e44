//! Consumer ledger of a running session.
//!
//! `session.json` lists every process currently attached to the app's
//! container. It is only read or written while the session lock is held.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::util::fs::{FsError, write_atomic};

pub const LEDGER_VERSION: u32 = 1;

static NEXT_CONSUMER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum LedgerError {
  #[error("failed to read session ledger {}: {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("corrupt session ledger {}: {source}", path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error(transparent)]
  Write(#[from] FsError),
}

/// One checked-out attach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
  pub id: String,
  pub pid: u32,
  pub since_unix: u64,
}

impl Consumer {
  /// A new consumer owned by this process.
  pub fn current() -> Self {
    let pid = std::process::id();
    let seq = NEXT_CONSUMER.fetch_add(1, Ordering::Relaxed);
    let since_unix = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .unwrap_or_default()
      .as_secs();

    Self {
      id: format!("{pid}-{seq}"),
      pid,
      since_unix,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
  pub version: u32,
  pub container: String,
  #[serde(default)]
  pub consumers: Vec<Consumer>,
}

impl Ledger {
  pub fn new(container: &str) -> Self {
    Self {
      version: LEDGER_VERSION,
      container: container.to_string(),
      consumers: Vec::new(),
    }
  }

  /// Load the ledger at `path`. A missing file, or one written for another
  /// container or format version, reads as an empty ledger.
  pub fn load(path: &Path, container: &str) -> Result<Self, LedgerError> {
    let content = match fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::new(container)),
      Err(source) => {
        return Err(LedgerError::Read {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    let ledger: Ledger = serde_json::from_str(&content).map_err(|source| LedgerError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    if ledger.version != LEDGER_VERSION || ledger.container != container {
      warn!(
        path = %path.display(),
        version = ledger.version,
        container = %ledger.container,
        "discarding session ledger from another format or container"
      );
      return Ok(Self::new(container));
    }

    Ok(ledger)
  }

  pub fn save(&self, path: &Path) -> Result<(), LedgerError> {
    let content = serde_json::to_string_pretty(self).map_err(|source| LedgerError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    write_atomic(path, &content, None)?;
    Ok(())
  }

  /// Drop consumers whose process is gone. Returns how many were dropped.
  pub fn prune(&mut self, alive: impl Fn(u32) -> bool) -> usize {
    let before = self.consumers.len();
    self.consumers.retain(|c| {
      let keep = alive(c.pid);
      if !keep {
        debug!(id = %c.id, pid = c.pid, "pruning dead session consumer");
      }
      keep
    });
    before - self.consumers.len()
  }

  pub fn check_out(&mut self, consumer: Consumer) {
    self.consumers.push(consumer);
  }

  /// Remove the consumer with `id`. Returns whether it was present.
  pub fn check_in(&mut self, id: &str) -> bool {
    let before = self.consumers.len();
    self.consumers.retain(|c| c.id != id);
    before != self.consumers.len()
  }

  pub fn len(&self) -> usize {
    self.consumers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.consumers.is_empty()
  }
}
