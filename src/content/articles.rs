use std::path::Path;

use super::frontmatter::{self, ArticleFrontmatter};
use super::{checked_slug, content_files, markdown, parse_date, slug_of};
use crate::error::ContentError;
use crate::metadata::Article;

const EXTENSIONS: &[&str] = &["md", "markdown"];
const EXCERPT_CHARS: usize = 160;

/// Parse one article file.
pub fn parse_article(path: &Path, raw: &str) -> Result<Article, ContentError> {
    let (yaml, body) = frontmatter::split(raw).ok_or_else(|| ContentError::MissingFrontmatter {
        path: path.to_owned(),
    })?;

    let fm: ArticleFrontmatter = serde_yaml::from_str(yaml).map_err(|source| ContentError::Yaml {
        path: path.to_owned(),
        source,
    })?;

    let title = fm.title.ok_or_else(|| ContentError::MissingField {
        path: path.to_owned(),
        field: "title",
    })?;
    let published_raw = fm
        .published_at
        .or(fm.date)
        .ok_or_else(|| ContentError::MissingField {
            path: path.to_owned(),
            field: "publishedAt",
        })?;
    let published_at = parse_date(&published_raw).ok_or_else(|| ContentError::InvalidDate {
        path: path.to_owned(),
        value: published_raw.clone(),
    })?;
    let updated_at = match fm.updated_at {
        Some(value) => Some(parse_date(&value).ok_or_else(|| ContentError::InvalidDate {
            path: path.to_owned(),
            value,
        })?),
        None => None,
    };

    let slug = checked_slug(path, slug_of(path))?;
    let html_content = markdown::to_html(body);
    let excerpt = fm
        .excerpt
        .or(fm.description)
        .unwrap_or_else(|| derive_excerpt(body));

    Ok(Article {
        slug,
        title,
        excerpt,
        author: fm.author.unwrap_or_else(|| "Editorial Team".into()),
        author_id: fm.author_id,
        published_at,
        updated_at,
        featured: fm.featured,
        image_url: fm.image_url.or(fm.image),
        tags: fm.tags.into_vec(),
        reading_minutes: markdown::reading_minutes(body),
        content: body.to_owned(),
        html_content,
    })
}

/// First paragraph of plain text, cut on a word boundary.
fn derive_excerpt(body: &str) -> String {
    let paragraph = body
        .split("\n\n")
        .map(str::trim)
        .find(|p| !p.is_empty() && !p.starts_with('#'))
        .unwrap_or("");
    let text = crate::enrich::html::text_content(&markdown::to_html(paragraph));
    let text = text.trim();

    if text.chars().count() <= EXCERPT_CHARS {
        return text.to_owned();
    }

    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    match cut.rfind(' ') {
        Some(idx) => format!("{}…", &cut[..idx]),
        None => format!("{}…", cut),
    }
}

/// Load every article under `dir`, newest first. Bad files are logged and skipped.
pub fn load_articles(dir: &Path) -> Vec<Article> {
    let mut articles: Vec<Article> = content_files(dir, EXTENSIONS)
        .into_iter()
        .filter_map(|path| {
            let parsed = std::fs::read_to_string(&path)
                .map_err(|source| ContentError::Io {
                    path: path.clone(),
                    source,
                })
                .and_then(|raw| parse_article(&path, &raw));

            match parsed {
                Ok(article) => {
                    log::debug!("Loaded article `{}`", article.slug);
                    Some(article)
                }
                Err(err) => {
                    log::warn!("Skipping article: {}", err);
                    None
                }
            }
        })
        .collect();

    // Stable: identical timestamps keep filename order.
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    articles
}
