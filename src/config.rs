use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "medpress.yaml";

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub site_url: String,
    pub site_name: String,
    pub description: String,
    pub articles_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub static_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub page_size: usize,
    pub video_path_prefix: String,
    pub roles_file: Option<PathBuf>,
    pub store_file: Option<PathBuf>,
    pub rss: Option<RSSConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:3000".into(),
            site_name: "MedPress".into(),
            description: String::new(),
            articles_dir: "content/articles".into(),
            videos_dir: "content/videos".into(),
            static_dir: "static".into(),
            templates_dir: "templates".into(),
            page_size: 12,
            video_path_prefix: "/watch".into(),
            roles_file: None,
            store_file: None,
            rss: None,
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct RSSConfig {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: Option<String>,
    pub copyright: Option<String>,
    pub managing_editor: Option<String>,
    pub webmaster: Option<String>,
    pub categories: Option<Vec<Category>>,
    pub ttl: Option<u32>,
    pub image: Option<Image>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Category {
    pub name: String,
    pub domain: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Image {
    pub url: String,
    pub title: String,
    pub link: String,
    pub width: Option<String>,
    pub height: Option<String>,
    pub description: Option<String>,
}

impl Config {
    /// Load `medpress.yaml` from the site root. A missing file yields the defaults.
    ///
    /// Relative directories are resolved against `root`, and `MEDPRESS_SITE_URL`
    /// overrides `site_url`.
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(CONFIG_FILE);

        let mut config: Config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {:?}", path))?;
            serde_yaml::from_str(&raw).with_context(|| format!("parsing {:?}", path))?
        } else {
            log::warn!("No {} in {:?}, using defaults", CONFIG_FILE, root);
            Config::default()
        };

        if let Ok(url) = std::env::var("MEDPRESS_SITE_URL") {
            config.site_url = url;
        }
        config.site_url = config.site_url.trim_end_matches('/').to_owned();
        if config.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }

        config.articles_dir = root.join(&config.articles_dir);
        config.videos_dir = root.join(&config.videos_dir);
        config.static_dir = root.join(&config.static_dir);
        config.templates_dir = root.join(&config.templates_dir);
        config.roles_file = config.roles_file.map(|p| root.join(p));
        config.store_file = config.store_file.map(|p| root.join(p));

        Ok(config)
    }

    pub fn url_for(&self, route: &str) -> String {
        format!("{}/{}", self.site_url, route.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "site_url: https://learn.example.com/\npage_size: 6\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();

        if std::env::var("MEDPRESS_SITE_URL").is_err() {
            assert_eq!(config.site_url, "https://learn.example.com");
        }
        assert_eq!(config.page_size, 6);
        assert_eq!(config.video_path_prefix, "/watch");
        assert_eq!(config.articles_dir, dir.path().join("content/articles"));
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "page_size: 0\n").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }
}
