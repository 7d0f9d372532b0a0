use serde::{Deserialize, Deserializer, Serialize};

use crate::metadata::{Article, Video};

/// One page of a listing.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Query string of the `/blog` and `/videos` routes: `?page=&search=&category=`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ListingQuery {
    #[serde(deserialize_with = "lenient_page")]
    pub page: Option<usize>,
    pub search: Option<String>,
    pub category: Option<String>,
}

impl ListingQuery {
    /// 1-based; missing or zero is the first page.
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    fn search(&self) -> Option<String> {
        non_empty(&self.search).map(|s| s.to_lowercase())
    }

    fn category(&self) -> Option<&str> {
        non_empty(&self.category)
    }

    /// Query string for another page of the same listing.
    pub fn with_page(&self, page: usize) -> String {
        let mut parts = vec![format!("page={}", page)];
        if let Some(search) = non_empty(&self.search) {
            parts.push(format!("search={}", urlencoding::encode(search)));
        }
        if let Some(category) = non_empty(&self.category) {
            parts.push(format!("category={}", urlencoding::encode(category)));
        }
        format!("?{}", parts.join("&"))
    }
}

/// `?page=` and `?page=abc` fall back to the first page instead of rejecting the request.
fn lenient_page<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<usize>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPage {
        Number(usize),
        Text(String),
    }

    Ok(match Option::<RawPage>::deserialize(deserializer)? {
        Some(RawPage::Number(page)) => Some(page),
        Some(RawPage::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Slice `items` into the requested 1-based page.
pub fn paginate<T: Clone>(items: &[T], page: usize, limit: usize) -> Page<T> {
    let limit = limit.max(1);
    let page = page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(limit);

    let start = (page - 1).saturating_mul(limit).min(total_items);
    let end = (start + limit).min(total_items);

    Page {
        items: items[start..end].to_vec(),
        current_page: page,
        total_pages,
        total_items,
        has_next: page < total_pages,
        has_previous: page > 1,
    }
}

fn article_matches(article: &Article, search: Option<&str>, category: Option<&str>) -> bool {
    let in_category = category.map_or(true, |category| {
        article.tags.iter().any(|t| t.eq_ignore_ascii_case(category))
    });
    let found = search.map_or(true, |needle| {
        article.title.to_lowercase().contains(needle)
            || article.excerpt.to_lowercase().contains(needle)
            || article.content.to_lowercase().contains(needle)
            || article.tags.iter().any(|t| t.to_lowercase().contains(needle))
    });

    in_category && found
}

fn video_matches(video: &Video, search: Option<&str>, category: Option<&str>) -> bool {
    let in_category = category.map_or(true, |category| video.category.eq_ignore_ascii_case(category));
    let found = search.map_or(true, |needle| {
        video.title.to_lowercase().contains(needle)
            || video.description.to_lowercase().contains(needle)
            || video.tags.iter().any(|t| t.to_lowercase().contains(needle))
    });

    in_category && found
}

pub fn search_articles(articles: &[Article], query: &ListingQuery, limit: usize) -> Page<Article> {
    let search = query.search();
    let matching: Vec<Article> = articles
        .iter()
        .filter(|a| article_matches(a, search.as_deref(), query.category()))
        .cloned()
        .collect();

    paginate(&matching, query.page(), limit)
}

pub fn search_videos(videos: &[Video], query: &ListingQuery, limit: usize) -> Page<Video> {
    let search = query.search();
    let matching: Vec<Video> = videos
        .iter()
        .filter(|v| video_matches(v, search.as_deref(), query.category()))
        .cloned()
        .collect();

    paginate(&matching, query.page(), limit)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metadata::test::{article, video};

    #[test]
    fn malformed_pages_fall_back_to_the_first() {
        let query = |value: serde_json::Value| serde_json::from_value::<ListingQuery>(value).unwrap();

        assert_eq!(query(serde_json::json!({"page": ""})).page(), 1);
        assert_eq!(query(serde_json::json!({"page": "abc", "search": "afib"})).page(), 1);
        assert_eq!(query(serde_json::json!({"page": "-2"})).page(), 1);
        assert_eq!(query(serde_json::json!({"page": " 3 "})).page(), 3);
        assert_eq!(query(serde_json::json!({"page": 2})).page(), 2);
        assert_eq!(query(serde_json::json!({})).page(), 1);
    }

    fn fibrillation_corpus() -> Vec<Article> {
        let mut articles: Vec<Article> = (0..15)
            .map(|i| {
                let mut a = article(&format!("af-{}", i), &format!("Case {}", i), &[]);
                a.content = "Atrial Fibrillation and anticoagulation".into();
                a
            })
            .collect();
        articles.extend((0..5).map(|i| article(&format!("other-{}", i), "Sepsis bundles", &["sepsis"])));
        articles
    }

    #[test]
    fn search_second_page() {
        let query = ListingQuery {
            page: Some(2),
            search: Some("fibrillation".into()),
            category: None,
        };
        let page = search_articles(&fibrillation_corpus(), &query, 12);

        assert_eq!(page.items.len(), 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.total_items, 15);
        assert!(!page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn category_filter() {
        let query = ListingQuery {
            category: Some("Sepsis".into()),
            ..Default::default()
        };
        assert_eq!(search_articles(&fibrillation_corpus(), &query, 12).total_items, 5);
    }

    #[test]
    fn empty_search_is_ignored() {
        let query = ListingQuery {
            search: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(search_articles(&fibrillation_corpus(), &query, 50).total_items, 20);
    }

    #[test]
    fn pages() {
        let items: Vec<u32> = (0..7).collect();
        assert_eq!(paginate(&items, 0, 3).items, vec![0, 1, 2]);
        assert_eq!(paginate(&items, 3, 3).items, vec![6]);
        assert_eq!(paginate(&items, 3, 3).total_pages, 3);
        assert!(paginate(&items, 9, 3).items.is_empty());
        assert_eq!(paginate::<u32>(&[], 1, 3).total_pages, 0);
    }

    #[test]
    fn video_category() {
        let mut v = video("a", "Sepsis", "");
        v.category = "Critical Care".into();
        let query = ListingQuery {
            category: Some("critical care".into()),
            ..Default::default()
        };
        assert_eq!(search_videos(&[v, video("b", "ECG", "")], &query, 12).total_items, 1);
    }

    #[test]
    fn page_links_keep_filters() {
        let query = ListingQuery {
            page: Some(1),
            search: Some("heart failure".into()),
            category: None,
        };
        assert_eq!(query.with_page(2), "?page=2&search=heart%20failure");
    }
}
