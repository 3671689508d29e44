//! Names and environment variables shared across the crate.

/// Directory name of the per-user root (`~/.dockerapp`).
pub const APP_DIR_NAME: &str = ".dockerapp";

/// Prefix for container names and image tags (`dockerapp-<name>`).
pub const CONTAINER_PREFIX: &str = "dockerapp";

/// Overrides the per-user root directory.
pub const ROOT_ENV: &str = "DOCKERAPP_ROOT";

/// Overrides the container engine binary.
pub const ENGINE_ENV: &str = "DOCKERAPP_ENGINE";

/// Default container engine binary.
pub const DEFAULT_ENGINE: &str = "docker";

/// File name of the package descriptor.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Build context subtree inside a package.
pub const BUILD_CONTEXT_DIR: &str = "temp";

/// Extension of package archives.
pub const PACKAGE_EXTENSION: &str = "dockerApp";

/// Shared directory of exposed shims, relative to the root.
pub const BRIDGE_OUT_DIR: &str = "bridge-out-bin";

/// Record of the exposed shims an install wrote, inside the app's config.
pub const EXPOSED_SHIMS_FILE: &str = "exposed-shims.json";

/// Shell used for interactive attaches when the manifest names none.
pub const DEFAULT_SHELL: &str = "bash";
