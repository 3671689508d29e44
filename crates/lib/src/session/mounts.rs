//! Container configuration of an app session.

use std::path::{Path, PathBuf};

use crate::engine::{ContainerSpec, Mount};
use crate::manifest::Manifest;
use crate::platform::HostUser;
use crate::store::AppPaths;

/// Host directories shared with every session when they exist.
const SYSTEM_MOUNTS: &[(&str, bool)] = &[
  ("/tmp/.X11-unix", false),
  ("/dev", false),
  ("/sys", true),
  ("/mnt", false),
  ("/media", false),
  ("/cdrom", false),
  ("/usr/share/icons", true),
  ("/usr/share/themes", true),
  ("/etc/passwd", true),
  ("/etc/group", true),
];

const SOUND_DEVICE: &str = "/dev/snd";

/// What the session borrows from the invoking host.
#[derive(Debug, Clone)]
pub struct HostEnv {
  pub user: HostUser,
  pub home: Option<PathBuf>,
  pub display: Option<String>,
}

impl HostEnv {
  pub fn current() -> Self {
    Self {
      user: HostUser::current(),
      home: std::env::var_os("HOME").filter(|h| !h.is_empty()).map(PathBuf::from),
      display: std::env::var("DISPLAY").ok().filter(|d| !d.is_empty()),
    }
  }
}

/// Backing directory of a persisted container path.
pub fn persist_dir(paths: &AppPaths, container_path: &str) -> PathBuf {
  let encoded = container_path.replace('%', "%25").replace('/', "%2F");
  paths.persist.join(encoded)
}

/// Mounts owned by the app: its installed files, home, `/tmp` and
/// persisted paths.
pub fn app_mounts(paths: &AppPaths, manifest: &Manifest) -> Vec<Mount> {
  let root = path_string(&paths.root);
  let home = path_string(&paths.home);

  let mut mounts = vec![
    Mount::ro(&paths.root, root),
    Mount::rw(&paths.home, home),
    Mount::rw(&paths.tmp, "/tmp"),
  ];
  mounts.extend(
    manifest
      .run
      .persistent_paths
      .iter()
      .map(|p| Mount::rw(persist_dir(paths, p), p.clone())),
  );
  mounts
}

/// Host directories from [`SYSTEM_MOUNTS`] present under `exists`.
fn system_mounts(exists: impl Fn(&Path) -> bool) -> Vec<Mount> {
  SYSTEM_MOUNTS
    .iter()
    .filter(|(path, _)| exists(Path::new(path)))
    .map(|&(path, read_only)| {
      if read_only {
        Mount::ro(path, path)
      } else {
        Mount::rw(path, path)
      }
    })
    .collect()
}

/// The full description of the session container.
pub fn container_spec(paths: &AppPaths, manifest: &Manifest, host: &HostEnv) -> ContainerSpec {
  let exists = |p: &Path| p.exists();

  let mut mounts = Vec::new();
  if let Some(home) = &host.home {
    mounts.push(Mount::rw(home, path_string(home)));
  }
  mounts.extend(app_mounts(paths, manifest));
  mounts.extend(system_mounts(exists));

  let mut env = vec![("HOME".to_string(), path_string(&paths.home))];
  if let Some(display) = &host.display {
    env.push(("DISPLAY".to_string(), display.clone()));
  }

  let devices = [SOUND_DEVICE]
    .iter()
    .map(PathBuf::from)
    .filter(|d| exists(d.as_path()))
    .collect();

  ContainerSpec {
    name: paths.container_name(),
    image: paths.image_tag(),
    mounts,
    devices,
    env,
    user: Some(host.user),
    workdir: host.home.clone(),
    host_network: true,
    privileged: true,
    command: vec![manifest.shell().to_string()],
  }
}

fn path_string(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}
