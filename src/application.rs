use std::path::{Path, PathBuf};

const DEFAULT_BASE_PATH: &str = "/var/www/app/";
const DEFAULT_ENV_FILE: &str = ".env";

/// The application installation being backed up.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Application {
    /// Root directory of the installation.
    ///
    /// Relative paths elsewhere in the configuration are resolved against it.
    base_path: PathBuf,

    /// Environment file holding the application secrets.
    #[serde(default = "default_env_file")]
    env_file: PathBuf,
}

fn default_env_file() -> PathBuf {
    DEFAULT_ENV_FILE.into()
}

impl Application {
    pub fn new(base_path: PathBuf) -> Application {
        if !base_path.is_dir() {
            log::warn!(target: "application", "Base path is not a directory: {}", base_path.display());
        }

        Self {
            base_path,
            env_file: default_env_file(),
        }
    }

    pub fn base_path(&self) -> &Path {
        self.base_path.as_path()
    }

    /// Resolves `path` against the base path.
    pub fn path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_path.join(path)
    }

    pub fn env_file(&self) -> PathBuf {
        self.path(&self.env_file)
    }
}

impl Default for Application {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.into(),
            env_file: default_env_file(),
        }
    }
}
