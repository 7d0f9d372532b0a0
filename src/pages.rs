//! Page rendering shared by the static build and the server.

use crate::config::Config;
use crate::content::ContentIndex;
use crate::enrich::process_blog_content;
use crate::listing::{self, ListingQuery};
use crate::metadata::{Article, Video};
use crate::relevance;
use crate::schema;
use crate::template::Templates;

pub const RELATED_LIMIT: usize = 3;
pub const FEATURED_LIMIT: usize = 6;

/// How pagination links are spelled: query strings when served, paths when built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLinks {
    Query,
    Static,
}

fn page_link(base: &str, query: &ListingQuery, page: usize, links: PageLinks) -> String {
    match links {
        PageLinks::Query => format!("{}{}", base, query.with_page(page)),
        PageLinks::Static if page <= 1 => format!("{}/", base),
        PageLinks::Static => format!("{}/page/{}/", base, page),
    }
}

pub struct Pages<'a> {
    pub config: &'a Config,
    pub index: &'a ContentIndex,
    pub templates: &'a Templates,
}

impl<'a> Pages<'a> {
    pub fn new(config: &'a Config, index: &'a ContentIndex, templates: &'a Templates) -> Self {
        Self {
            config,
            index,
            templates,
        }
    }

    pub fn home(&self) -> anyhow::Result<String> {
        let mut context = Templates::base_context(self.config);
        context.insert("articles", &self.featured_or_latest_articles());
        context.insert("videos", &self.featured_or_latest_videos());
        context.insert(
            "schemas",
            &vec![schema::to_script_tag(&schema::organization_schema(self.config))],
        );

        Ok(self.templates.render("index.html", &context)?)
    }

    fn featured_or_latest_articles(&self) -> Vec<&Article> {
        let featured = self.index.featured_articles(FEATURED_LIMIT);
        if featured.is_empty() {
            self.index.articles().iter().take(FEATURED_LIMIT).collect()
        } else {
            featured
        }
    }

    fn featured_or_latest_videos(&self) -> Vec<&Video> {
        let featured = self.index.featured_videos(FEATURED_LIMIT);
        if featured.is_empty() {
            self.index.videos().iter().take(FEATURED_LIMIT).collect()
        } else {
            featured
        }
    }

    pub fn blog_list(&self, query: &ListingQuery, links: PageLinks) -> anyhow::Result<String> {
        let page = listing::search_articles(self.index.articles(), query, self.config.page_size);

        let mut context = Templates::base_context(self.config);
        context.insert("previous_link", &page_link("/blog", query, page.current_page - 1, links));
        context.insert("next_link", &page_link("/blog", query, page.current_page + 1, links));
        context.insert("page", &page);
        context.insert("query", query);
        context.insert(
            "schemas",
            &vec![schema::to_script_tag(&schema::breadcrumb_schema(
                &[("Home", "/"), ("Blog", "/blog")],
                self.config,
            ))],
        );

        Ok(self.templates.render("blog.html", &context)?)
    }

    /// The article body after cleaning, formatting and cross-linking.
    pub fn article_body(&self, article: &Article) -> String {
        process_blog_content(&article.html_content, self.index, &self.config.video_path_prefix)
    }

    /// `pdf_link` is where the PDF export lives, if the article has one.
    pub fn article(&self, article: &Article, pdf_link: Option<&str>) -> anyhow::Result<String> {
        let related_articles = relevance::get_related_articles(self.index, &article.slug, RELATED_LIMIT);
        let related_videos =
            relevance::get_related_videos_for_article(article, self.index.videos(), RELATED_LIMIT);

        let route = format!("/blog/{}", article.slug);

        let mut context = Templates::base_context(self.config);
        context.insert("article", article);
        context.insert("body", &self.article_body(article));
        context.insert("related_articles", &related_articles);
        context.insert("related_videos", &related_videos);
        context.insert("pdf_link", &pdf_link);
        context.insert(
            "schemas",
            &vec![
                schema::to_script_tag(&schema::article_schema(article, self.config)),
                schema::to_script_tag(&schema::breadcrumb_schema(
                    &[
                        ("Home", "/"),
                        ("Blog", "/blog"),
                        (article.title.as_str(), route.as_str()),
                    ],
                    self.config,
                )),
            ],
        );

        Ok(self.templates.render("article.html", &context)?)
    }

    pub fn video_list(&self, query: &ListingQuery, links: PageLinks) -> anyhow::Result<String> {
        let page = listing::search_videos(self.index.videos(), query, self.config.page_size);

        let mut context = Templates::base_context(self.config);
        context.insert("previous_link", &page_link("/videos", query, page.current_page - 1, links));
        context.insert("next_link", &page_link("/videos", query, page.current_page + 1, links));
        context.insert("page", &page);
        context.insert("query", query);
        context.insert("categories", &self.index.categories());

        Ok(self.templates.render("videos.html", &context)?)
    }

    pub fn watch(&self, video: &Video) -> anyhow::Result<String> {
        let related_articles =
            relevance::get_related_articles_for_video(video, self.index.articles(), RELATED_LIMIT);
        let related_videos = relevance::get_related_videos(self.index, &video.slug, RELATED_LIMIT);

        let mut context = Templates::base_context(self.config);
        context.insert("video", video);
        context.insert("related_articles", &related_articles);
        context.insert("related_videos", &related_videos);
        context.insert(
            "schemas",
            &vec![schema::to_script_tag(&schema::video_schema(video, self.config))],
        );

        Ok(self.templates.render("watch.html", &context)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metadata::test::{article, video};
    use std::path::Path;

    fn fixture() -> (Config, ContentIndex, Templates) {
        let mut afib = article("afib", "Atrial fibrillation in the ED", &["cardiology"]);
        afib.html_content = "<p>AFib basics.</p><h2>About the Author</h2><p>Bio</p>".into();
        let index = ContentIndex::new(
            vec![afib, article("ecg", "ECG fundamentals", &["cardiology"])],
            vec![video("afib-overview", "Atrial Fibrillation Overview", "")],
        );
        let templates = Templates::new(Path::new("/no/such/dir")).unwrap();
        (Config::default(), index, templates)
    }

    #[test]
    fn article_page() {
        let (config, index, templates) = fixture();
        let pages = Pages::new(&config, &index, &templates);
        let afib = index.article("afib").unwrap();
        let html = pages.article(afib, Some("/blog/afib/pdf")).unwrap();

        assert!(html.contains("href=\"/watch/afib-overview\" class=\"medical-term-link\""));
        assert!(!html.contains("About the Author"));
        assert!(html.contains("application/ld+json"));
        assert!(html.contains("href=\"/blog/afib/pdf\""));

        let without_pdf = pages.article(afib, None).unwrap();
        assert!(!without_pdf.contains("download-pdf"));
    }

    #[test]
    fn blog_list_links() {
        let (mut config, index, templates) = fixture();
        config.page_size = 1;
        let pages = Pages::new(&config, &index, &templates);

        let served = pages.blog_list(&ListingQuery::default(), PageLinks::Query).unwrap();
        assert!(served.contains("href=\"/blog?page=2\""));

        let built = pages
            .blog_list(&ListingQuery { page: Some(2), ..Default::default() }, PageLinks::Static)
            .unwrap();
        assert!(built.contains("href=\"/blog/\""));
        assert!(built.contains("Page 2 of 2"));
    }

    #[test]
    fn watch_page() {
        let (config, index, templates) = fixture();
        let pages = Pages::new(&config, &index, &templates);
        let html = pages.watch(index.video("afib-overview").unwrap()).unwrap();

        assert!(html.contains("VideoObject"));
        assert!(html.contains("href=\"/blog/afib\""));
    }
}
