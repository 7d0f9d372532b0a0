//! RSS feed and XML sitemap.

use chrono::{DateTime, Utc};
use sitemap_rs::url::{ChangeFrequency, Url};
use sitemap_rs::url_set::UrlSet;

use crate::config::{Config, RSSConfig};
use crate::content::ContentIndex;
use crate::metadata::Article;

pub const FEED_ITEMS: usize = 20;

fn channel_config(config: &Config) -> RSSConfig {
    config.rss.clone().unwrap_or_else(|| RSSConfig {
        title: config.site_name.clone(),
        link: config.site_url.clone(),
        description: config.description.clone(),
        language: Some("en-us".into()),
        copyright: None,
        managing_editor: None,
        webmaster: None,
        categories: None,
        ttl: None,
        image: None,
    })
}

fn item(article: &Article, config: &Config) -> rss::Item {
    let url = config.url_for(&format!("blog/{}", article.slug));

    let mut guid = rss::Guid::default();
    guid.set_value(url.clone());
    guid.set_permalink(true);

    let categories = article
        .tags
        .iter()
        .map(|tag| {
            let mut category = rss::Category::default();
            category.set_name(tag.clone());
            category
        })
        .collect::<Vec<_>>();

    let mut item = rss::Item::default();
    item.set_title(Some(article.title.clone()));
    item.set_link(Some(url));
    item.set_description(Some(article.excerpt.clone()));
    item.set_author(Some(article.author.clone()));
    item.set_pub_date(Some(article.published_at.to_rfc2822()));
    item.set_categories(categories);
    item.set_guid(Some(guid));
    item
}

/// RSS 2.0 channel with the newest articles.
pub fn rss_channel(config: &Config, articles: &[Article]) -> rss::Channel {
    let rss_config = channel_config(config);
    let mut channel = rss::Channel::default();

    channel.set_title(rss_config.title);
    channel.set_link(rss_config.link);
    channel.set_description(rss_config.description);
    channel.set_language(rss_config.language);
    channel.set_copyright(rss_config.copyright);
    channel.set_managing_editor(rss_config.managing_editor);
    channel.set_webmaster(rss_config.webmaster);
    channel.set_ttl(rss_config.ttl.map(|ttl| ttl.to_string()));
    channel.set_categories(
        rss_config
            .categories
            .unwrap_or_default()
            .into_iter()
            .map(|c| {
                let mut category = rss::Category::default();
                category.set_name(c.name);
                category.set_domain(c.domain);
                category
            })
            .collect::<Vec<_>>(),
    );
    channel.set_image(rss_config.image.map(|i| {
        let mut image = rss::Image::default();
        image.set_url(i.url);
        image.set_title(i.title);
        image.set_link(i.link);
        image.set_width(i.width);
        image.set_height(i.height);
        image.set_description(i.description);
        image
    }));
    if let Some(latest) = articles.first() {
        channel.set_last_build_date(Some(latest.published_at.to_rfc2822()));
    }
    channel.set_items(
        articles
            .iter()
            .take(FEED_ITEMS)
            .map(|article| item(article, config))
            .collect::<Vec<_>>(),
    );

    channel
}

/// One sitemap entry: a route on the site and when it last changed.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub route: String,
    pub modified: Option<DateTime<Utc>>,
    pub priority: f32,
}

/// Every public page of the site.
pub fn sitemap_entries(config: &Config, index: &ContentIndex) -> Vec<SitemapEntry> {
    let entry = |route: String, modified, priority| SitemapEntry {
        route,
        modified,
        priority,
    };
    let prefix = config.video_path_prefix.trim_end_matches('/');

    let mut entries = vec![
        entry("/".into(), None, 1.0),
        entry("/blog".into(), index.articles().first().map(|a| a.published_at), 0.9),
        entry("/videos".into(), index.videos().first().map(|v| v.published_at), 0.9),
    ];
    entries.extend(index.articles().iter().map(|article| {
        entry(
            format!("/blog/{}", article.slug),
            Some(article.updated_at.unwrap_or(article.published_at)),
            0.8,
        )
    }));
    entries.extend(
        index
            .videos()
            .iter()
            .map(|video| entry(format!("{}/{}", prefix, video.slug), Some(video.published_at), 0.7)),
    );

    entries
}

pub fn sitemap_xml(config: &Config, entries: &[SitemapEntry]) -> anyhow::Result<Vec<u8>> {
    let urls = entries
        .iter()
        .map(|entry| {
            let mut builder = Url::builder(config.url_for(&entry.route));
            builder
                .change_frequency(ChangeFrequency::Weekly)
                .priority(entry.priority);
            if let Some(modified) = entry.modified {
                builder.last_modified(modified.into());
            }
            builder
                .build()
                .map_err(|err| anyhow::anyhow!("invalid sitemap url {}: {:?}", entry.route, err))
        })
        .collect::<anyhow::Result<Vec<Url>>>()?;

    let url_set =
        UrlSet::new(urls).map_err(|err| anyhow::anyhow!("invalid sitemap: {:?}", err))?;
    let mut buf = Vec::<u8>::new();
    url_set
        .write(&mut buf)
        .map_err(|err| anyhow::anyhow!("writing sitemap: {:?}", err))?;

    Ok(buf)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metadata::test::{article, video};

    #[test]
    fn feed_lists_articles() {
        let config = Config {
            site_url: "https://learn.example.com".into(),
            ..Config::default()
        };
        let channel = rss_channel(&config, &[article("afib", "AFib & you", &["cardiology"])]);

        assert_eq!(channel.title(), "MedPress");
        assert_eq!(channel.items().len(), 1);
        assert_eq!(channel.items()[0].link(), Some("https://learn.example.com/blog/afib"));

        let xml = channel.to_string();
        assert!(xml.contains("AFib &amp; you"));
    }

    #[test]
    fn sitemap_lists_every_page() {
        let index = ContentIndex::new(vec![article("afib", "AFib", &[])], vec![video("ecg-101", "ECG", "")]);
        let routes: Vec<String> = sitemap_entries(&Config::default(), &index)
            .into_iter()
            .map(|e| e.route)
            .collect();

        assert_eq!(routes, vec!["/", "/blog", "/videos", "/blog/afib", "/watch/ecg-101"]);
    }

    #[test]
    fn sitemap() {
        let entries = vec![
            SitemapEntry { route: "/".into(), modified: None, priority: 1.0 },
            SitemapEntry {
                route: "/blog/afib/".into(),
                modified: Some(article("afib", "t", &[]).published_at),
                priority: 0.8,
            },
        ];
        let xml = String::from_utf8(sitemap_xml(&Config::default(), &entries).unwrap()).unwrap();

        assert!(xml.contains("<loc>http://localhost:3000/blog/afib/</loc>"));
        assert!(xml.contains("2024-01-01"));
    }
}
