use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    /// The shared namespace file. Every invocation, app role or widget role,
    /// addresses this same path.
    pub namespace_path: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os("BREKKIE_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => ProjectDirs::from("", "", "brekkie")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        Self::from_data_dir(data_dir)
    }

    fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            namespace_path: data_dir.join("shared.json"),
        })
    }
}
