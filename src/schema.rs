//! schema.org JSON-LD blocks embedded in rendered pages.

use serde_json::{json, Value};

use crate::config::Config;
use crate::metadata::{Article, Video};

pub fn organization_schema(config: &Config) -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "EducationalOrganization",
        "name": config.site_name,
        "url": config.site_url,
        "description": config.description,
    })
}

pub fn article_schema(article: &Article, config: &Config) -> Value {
    let url = config.url_for(&format!("blog/{}", article.slug));
    let mut schema = json!({
        "@context": "https://schema.org",
        "@type": "MedicalWebPage",
        "headline": article.title,
        "description": article.excerpt,
        "url": url,
        "mainEntityOfPage": url,
        "datePublished": article.published_at.to_rfc3339(),
        "dateModified": article.updated_at.unwrap_or(article.published_at).to_rfc3339(),
        "author": { "@type": "Person", "name": article.author },
        "publisher": { "@type": "Organization", "name": config.site_name, "url": config.site_url },
        "keywords": article.tags.join(", "),
        "timeRequired": format!("PT{}M", article.reading_minutes),
    });

    if let Some(image) = &article.image_url {
        schema["image"] = json!(image);
    }
    schema
}

pub fn video_schema(video: &Video, config: &Config) -> Value {
    let mut schema = json!({
        "@context": "https://schema.org",
        "@type": "VideoObject",
        "name": video.title,
        "description": video.description,
        "thumbnailUrl": [video.thumbnail_url],
        "uploadDate": video.published_at.to_rfc3339(),
        "duration": video.iso_duration(),
        "embedUrl": video.embed_url,
        "contentUrl": video.youtube_url,
        "url": config.url_for(&format!("{}/{}", config.video_path_prefix, video.slug)),
        "keywords": video.tags.join(", "),
    });

    if let Some(transcript) = &video.transcript {
        schema["transcript"] = json!(transcript);
    }
    if !video.category.is_empty() {
        schema["genre"] = json!(video.category);
    }
    schema
}

/// `crumbs` are `(name, route)` pairs from the root down.
pub fn breadcrumb_schema(crumbs: &[(&str, &str)], config: &Config) -> Value {
    let items: Vec<Value> = crumbs
        .iter()
        .enumerate()
        .map(|(idx, (name, route))| {
            json!({
                "@type": "ListItem",
                "position": idx + 1,
                "name": name,
                "item": config.url_for(route),
            })
        })
        .collect();

    json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": items,
    })
}

/// Render as an inline script tag. `</` is escaped so content cannot close the tag.
pub fn to_script_tag(schema: &Value) -> String {
    format!(
        r#"<script type="application/ld+json">{}</script>"#,
        schema.to_string().replace("</", "<\\/")
    )
}
