//! Data directory layout

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::settings::config_name;

/// Filesystem locations used by the server
#[derive(Debug, Clone)]
pub struct Paths {
    data_dir: PathBuf,
}

impl Paths {
    /// Resolve the data directory (`--data` or the platform data dir) and create it.
    pub fn new(data_override: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_override {
            Some(path) => path,
            None => directories::ProjectDirs::from("fm", "takeout", "takeout")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
        };

        let paths = Self { data_dir };
        paths.create_directories()?;
        Ok(paths)
    }

    fn create_directories(&self) -> Result<()> {
        for dir in [self.data_dir.clone(), self.data_dir.join("media")] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Base name (no extension) of the main configuration file
    pub fn config_base(&self) -> PathBuf {
        self.data_dir.join(config_name())
    }

    /// Users, sessions, codes, offsets and events
    pub fn server_db_path(&self) -> PathBuf {
        self.data_dir.join("takeout.db")
    }

    pub fn media_dir(&self, media: &str) -> PathBuf {
        self.data_dir.join("media").join(media)
    }

    /// Base name (no extension) of a media collection's configuration file
    pub fn media_config_base(&self, media: &str) -> PathBuf {
        self.media_dir(media).join(config_name())
    }

    /// Catalogue and search database of one media collection
    pub fn media_db_path(&self, media: &str) -> PathBuf {
        self.media_dir(media).join("media.db")
    }

    pub fn image_cache_dir(&self) -> PathBuf {
        self.data_dir.join("imagecache")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(Some(dir.path().join("data"))).unwrap();
        assert!(paths.data_dir().is_dir());
        assert!(paths.data_dir().join("media").is_dir());
        assert_eq!(paths.server_db_path(), dir.path().join("data/takeout.db"));
        assert_eq!(
            paths.media_db_path("family"),
            dir.path().join("data/media/family/media.db")
        );
        assert_eq!(
            paths.media_config_base("family"),
            dir.path().join("data/media/family/takeout")
        );
    }
}
