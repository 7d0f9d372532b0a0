use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::config::Config;
use crate::error::ContentError;
use crate::listing::{self, Page};
use crate::metadata::{Article, Video};

pub mod articles;
pub mod frontmatter;
pub mod markdown;
pub mod videos;

pub use articles::load_articles;
pub use videos::load_videos;

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or a bare date.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(date.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
}

pub(crate) fn slug_of(path: &Path) -> String {
    path.file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or_default()
        .to_lowercase()
}

/// Slugs become output paths and URL segments, so only `[a-z0-9_-]` is allowed.
pub(crate) fn checked_slug(path: &Path, slug: String) -> Result<String, ContentError> {
    let valid = !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');

    if valid {
        Ok(slug)
    } else {
        Err(ContentError::InvalidSlug {
            path: path.to_owned(),
            slug,
        })
    }
}

fn filter_file(path: &Path, extensions: &[&str]) -> bool {
    let Some(filename) = path.file_name().and_then(OsStr::to_str) else {
        return false;
    };
    let is_hidden = filename.starts_with('.');
    let is_backup = filename.ends_with('~');

    path.is_file()
        && !is_hidden
        && !is_backup
        && path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

/// Content files under `dir` in filename order.
pub(crate) fn content_files(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    if !dir.is_dir() {
        log::warn!("Content directory {:?} does not exist", dir);
        return vec![];
    }

    walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.into_path()),
            Err(err) => {
                log::warn!("{}", err);
                None
            }
        })
        .filter(|path| filter_file(path, extensions))
        .collect()
}

/// Every article and video of the site, loaded once and handed to whoever needs it.
#[derive(Clone, Debug, Default)]
pub struct ContentIndex {
    articles: Vec<Article>,
    videos: Vec<Video>,
}

impl ContentIndex {
    /// Build from already sorted lists.
    pub fn new(articles: Vec<Article>, videos: Vec<Video>) -> Self {
        Self { articles, videos }
    }

    pub fn load(config: &Config) -> Self {
        let index = Self::new(
            load_articles(&config.articles_dir),
            load_videos(&config.videos_dir),
        );
        log::info!(
            "Loaded {} articles and {} videos",
            index.articles.len(),
            index.videos.len()
        );
        index
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn videos(&self) -> &[Video] {
        &self.videos
    }

    pub fn article(&self, slug: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.slug == slug)
    }

    pub fn video(&self, slug: &str) -> Option<&Video> {
        self.videos.iter().find(|v| v.slug == slug)
    }

    pub fn video_by_id(&self, video_id: &str) -> Option<&Video> {
        self.videos.iter().find(|v| v.video_id == video_id)
    }

    pub fn featured_articles(&self, limit: usize) -> Vec<&Article> {
        self.articles.iter().filter(|a| a.featured).take(limit).collect()
    }

    pub fn featured_videos(&self, limit: usize) -> Vec<&Video> {
        self.videos.iter().filter(|v| v.featured).take(limit).collect()
    }

    /// Video categories, sorted and deduplicated.
    pub fn categories(&self) -> Vec<String> {
        self.videos
            .iter()
            .map(|v| v.category.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Article tags, lower-cased, sorted and deduplicated.
    pub fn tags(&self) -> Vec<String> {
        self.articles
            .iter()
            .flat_map(|a| a.tags.iter())
            .map(|t| t.to_lowercase())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn get_paginated_articles(&self, page: usize, limit: usize) -> Page<Article> {
        listing::paginate(&self.articles, page, limit)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metadata::test::{article, video};

    #[test]
    fn dates() {
        let expected = "2024-03-01T00:00:00+00:00";
        assert_eq!(parse_date("2024-03-01").unwrap().to_rfc3339(), expected);
        assert_eq!(parse_date("2024-03-01T00:00:00").unwrap().to_rfc3339(), expected);
        assert_eq!(parse_date("2024-03-01T02:00:00+02:00").unwrap().to_rfc3339(), expected);
        assert_eq!(parse_date("March 1st"), None);
    }

    #[test]
    fn pagination_covers_everything_once() {
        let articles: Vec<Article> = (0..25)
            .map(|i| article(&format!("a{}", i), "t", &[]))
            .collect();
        let index = ContentIndex::new(articles.clone(), vec![]);

        let first = index.get_paginated_articles(1, 10);
        assert_eq!(first.total_pages, 3);

        let all: Vec<Article> = (1..=first.total_pages)
            .flat_map(|p| index.get_paginated_articles(p, 10).items)
            .collect();
        assert_eq!(all, articles);
    }

    #[test]
    fn lookups() {
        let mut v = video("afib", "Atrial Fibrillation Overview", "");
        v.category = "Cardiology".into();
        v.featured = true;
        let index = ContentIndex::new(vec![article("x", "X", &["ECG", "ecg"])], vec![v]);

        assert!(index.article("x").is_some());
        assert!(index.video("afib").is_some());
        assert!(index.video_by_id("id-afib").is_some());
        assert_eq!(index.categories(), vec!["Cardiology"]);
        assert_eq!(index.tags(), vec!["ecg"]);
        assert_eq!(index.featured_videos(3).len(), 1);
        assert!(index.featured_articles(3).is_empty());
    }
}
