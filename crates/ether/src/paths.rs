use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;
use etherconfig::CONFIG_FILE_NAME;

pub const ENV_CONFIG_DIR: &str = "ETHER_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "LiquidEther";
const APPLICATION: &str = "Ether";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        if let Some(config_dir) = env_override(ENV_CONFIG_DIR) {
            return Ok(Self { config_dir });
        }
        let project_dirs = ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
            .ok_or_else(|| anyhow!("failed to determine user directories"))?;
        Ok(Self {
            config_dir: project_dirs.config_dir().to_path_buf(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }
}

#[cfg(test)]
impl AppPaths {
    pub fn from_raw(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }
}

fn env_override(var: &str) -> Option<PathBuf> {
    env::var_os(var)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
