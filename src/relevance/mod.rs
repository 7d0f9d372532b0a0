//! Keyword-overlap relatedness between articles and videos.
//!
//! Scores are Jaccard similarity of the two keyword sets plus a flat bonus
//! for every shared high-value medical term. There is no IDF weighting.

use std::cmp::Ordering;

use crate::content::ContentIndex;
use crate::metadata::{Article, Video};

pub mod keywords;

pub use keywords::{extract_keywords, Keywords};

const HIGH_VALUE_BONUS: f64 = 0.2;

/// Relatedness of two keyword sets. Always `>= 0`; zero when nothing is shared.
pub fn calculate_keyword_score(a: &Keywords, b: &Keywords) -> f64 {
    let shared: Vec<&String> = a.intersection(b).collect();
    if shared.is_empty() {
        return 0.0;
    }

    let union = a.union(b).count();
    let jaccard = shared.len() as f64 / union as f64;
    let bonus = shared
        .iter()
        .filter(|term| keywords::HIGH_VALUE_SET.contains(term.as_str()))
        .count() as f64
        * HIGH_VALUE_BONUS;

    jaccard + bonus
}

/// Keep positive scores, best first, at most `limit`. Equal scores keep input order.
fn rank<'a, T>(mut scored: Vec<(&'a T, f64)>, limit: usize) -> Vec<&'a T> {
    scored.retain(|(_, score)| *score > 0.0);
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.into_iter().take(limit).map(|(item, _)| item).collect()
}

pub fn get_related_articles_for_video<'a>(
    video: &Video,
    articles: &'a [Article],
    limit: usize,
) -> Vec<&'a Article> {
    let target = extract_keywords(&video.keyword_text());
    let scored = articles
        .iter()
        .map(|a| (a, calculate_keyword_score(&target, &extract_keywords(&a.keyword_text()))))
        .collect();

    rank(scored, limit)
}

pub fn get_related_videos_for_article<'a>(
    article: &Article,
    videos: &'a [Video],
    limit: usize,
) -> Vec<&'a Video> {
    let target = extract_keywords(&article.keyword_text());
    let scored = videos
        .iter()
        .map(|v| (v, calculate_keyword_score(&target, &extract_keywords(&v.keyword_text()))))
        .collect();

    rank(scored, limit)
}

/// Articles related to the one at `slug`, never including itself.
pub fn get_related_articles<'a>(index: &'a ContentIndex, slug: &str, limit: usize) -> Vec<&'a Article> {
    let Some(article) = index.article(slug) else {
        return vec![];
    };
    let target = extract_keywords(&article.keyword_text());

    let scored = index
        .articles()
        .iter()
        .filter(|other| other.slug != slug)
        .map(|other| {
            let score = calculate_keyword_score(&target, &extract_keywords(&other.keyword_text()));
            (other, score)
        })
        .collect();

    rank(scored, limit)
}

/// Videos related to the one at `slug`, never including itself.
pub fn get_related_videos<'a>(index: &'a ContentIndex, slug: &str, limit: usize) -> Vec<&'a Video> {
    let Some(video) = index.video(slug) else {
        return vec![];
    };
    let target = extract_keywords(&video.keyword_text());

    let scored = index
        .videos()
        .iter()
        .filter(|other| other.slug != slug)
        .map(|other| {
            let score = calculate_keyword_score(&target, &extract_keywords(&other.keyword_text()));
            (other, score)
        })
        .collect();

    rank(scored, limit)
}
