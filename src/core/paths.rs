//! Locations of persisted configuration files
//!
//! The GitHub OAuth token and the cached VS Code version live in a per-user
//! config directory. `$XDG_CONFIG_HOME` is honoured when set; otherwise the
//! platform config directory from `dirs` is used.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the application directory inside the config root
pub const APP_DIR: &str = "copilot-api";

const GITHUB_TOKEN_FILE: &str = "github_token";
const VSCODE_VERSION_FILE: &str = "vscode_version";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone)]
pub struct Paths {
    pub config_dir: PathBuf,
    pub github_token_path: PathBuf,
    pub vscode_version_path: PathBuf,
    pub config_file_path: PathBuf,
}

impl Paths {
    /// Resolve paths from the environment
    pub fn from_env() -> Result<Self> {
        let root = match std::env::var_os("XDG_CONFIG_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
                .context("Unable to determine a configuration directory")?,
        };
        Ok(Self::with_root(root))
    }

    /// Build paths below an explicit config root
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        let config_dir = root.as_ref().join(APP_DIR);
        Self {
            github_token_path: config_dir.join(GITHUB_TOKEN_FILE),
            vscode_version_path: config_dir.join(VSCODE_VERSION_FILE),
            config_file_path: config_dir.join(CONFIG_FILE),
            config_dir,
        }
    }

    /// Create the config directory if missing
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir).with_context(|| {
            format!(
                "Failed to create config directory {}",
                self.config_dir.display()
            )
        })
    }

    pub fn read_github_token(&self) -> Result<Option<String>> {
        read_trimmed(&self.github_token_path)
    }

    /// Persist the GitHub token, readable by the owner only on Unix
    pub fn write_github_token(&self, token: &str) -> Result<()> {
        self.ensure()?;
        fs::write(&self.github_token_path, token).with_context(|| {
            format!(
                "Failed to write GitHub token to {}",
                self.github_token_path.display()
            )
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.github_token_path, fs::Permissions::from_mode(0o600))
                .context("Failed to restrict GitHub token permissions")?;
        }

        Ok(())
    }

    pub fn read_vscode_version(&self) -> Result<Option<String>> {
        read_trimmed(&self.vscode_version_path)
    }

    pub fn write_vscode_version(&self, version: &str) -> Result<()> {
        self.ensure()?;
        fs::write(&self.vscode_version_path, version).with_context(|| {
            format!(
                "Failed to write VS Code version to {}",
                self.vscode_version_path.display()
            )
        })
    }
}

/// Read a file and trim it; missing or blank files yield `None`
fn read_trimmed(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_paths_layout() {
        let paths = Paths::with_root("/tmp/cfg");
        assert_eq!(paths.config_dir, PathBuf::from("/tmp/cfg/copilot-api"));
        assert_eq!(
            paths.github_token_path,
            PathBuf::from("/tmp/cfg/copilot-api/github_token")
        );
        assert_eq!(
            paths.vscode_version_path,
            PathBuf::from("/tmp/cfg/copilot-api/vscode_version")
        );
    }

    #[test]
    fn test_missing_token_is_none() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_root(dir.path());
        assert_eq!(paths.read_github_token().unwrap(), None);
    }

    #[test]
    fn test_token_roundtrip_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_root(dir.path());
        paths.write_github_token("gho_abc\n").unwrap();
        assert_eq!(paths.read_github_token().unwrap(), Some("gho_abc".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let paths = Paths::with_root(dir.path());
        paths.write_github_token("gho_abc").unwrap();
        let mode = fs::metadata(&paths.github_token_path)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_blank_version_file_is_none() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::with_root(dir.path());
        paths.write_vscode_version("   \n").unwrap();
        assert_eq!(paths.read_vscode_version().unwrap(), None);
    }
}
