use serde::Deserialize;

/// Split a markdown document into its YAML frontmatter and body.
///
/// The frontmatter must open on the first line with `---` and close with a
/// line that is exactly `---`. Returns `None` when there is no such block.
pub fn split(content: &str) -> Option<(&str, &str)> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }

    None
}

/// Tags may be written as a YAML list or a comma separated string.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Tags {
    List(Vec<String>),
    Csv(String),
}

impl Default for Tags {
    fn default() -> Self {
        Tags::List(vec![])
    }
}

impl Tags {
    pub fn into_vec(self) -> Vec<String> {
        let tags = match self {
            Tags::List(tags) => tags,
            Tags::Csv(tags) => tags.split(',').map(|t| t.to_owned()).collect(),
        };

        tags.into_iter()
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ArticleFrontmatter {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub author_id: Option<String>,
    pub published_at: Option<String>,
    pub date: Option<String>,
    pub updated_at: Option<String>,
    pub featured: bool,
    pub image_url: Option<String>,
    pub image: Option<String>,
    pub tags: Tags,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoFile {
    pub video_id: Option<String>,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub duration: String,
    pub duration_seconds: Option<u64>,
    pub published_at: Option<String>,
    pub category: String,
    pub tags: Tags,
    pub channel_title: String,
    pub embed_url: Option<String>,
    pub youtube_url: Option<String>,
    pub featured: bool,
    pub transcript: Option<String>,
}
