use crate::consts::{APP_DIR_NAME, BRIDGE_OUT_DIR, ROOT_ENV};
use std::path::PathBuf;

/// Returns the user's home directory
pub fn home_dir() -> PathBuf {
  let home = std::env::var("HOME").expect("HOME not set");
  PathBuf::from(home)
}

/// Returns the per-user root holding installed apps and exposed shims.
///
/// `DOCKERAPP_ROOT` takes precedence over `~/.dockerapp`.
pub fn root_dir() -> PathBuf {
  if let Ok(path) = std::env::var(ROOT_ENV)
    && !path.is_empty()
  {
    return PathBuf::from(path);
  }
  home_dir().join(APP_DIR_NAME)
}

/// Returns the directory containing one subdirectory per installed app.
pub fn apps_dir() -> PathBuf {
  root_dir().join("apps")
}

/// Returns the shared directory of exposed (bridge-out) shims.
pub fn bridge_out_dir() -> PathBuf {
  root_dir().join(BRIDGE_OUT_DIR)
}

/// Returns the resolved path of the running `dockerapp` executable, which
/// generated bridge scripts call back into.
pub fn launcher_path() -> std::io::Result<PathBuf> {
  let exe = std::env::current_exe()?;
  Ok(dunce::canonicalize(&exe).unwrap_or(exe))
}
