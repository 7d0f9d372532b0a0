use std::path::Path;

use super::frontmatter::VideoFile;
use super::{checked_slug, content_files, parse_date, slug_of};
use crate::error::ContentError;
use crate::metadata::Video;

const EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Parse `H:MM:SS`, `MM:SS` or ISO-8601 `PT#H#M#S` into seconds.
pub fn parse_duration(raw: &str) -> Option<u64> {
    let raw = raw.trim();

    if let Some(iso) = raw.strip_prefix("PT").or_else(|| raw.strip_prefix("pt")) {
        let mut total = 0u64;
        let mut number = String::new();
        for ch in iso.chars() {
            if ch.is_ascii_digit() {
                number.push(ch);
                continue;
            }
            let value: u64 = number.parse().ok()?;
            number.clear();
            total += match ch.to_ascii_uppercase() {
                'H' => value * 3600,
                'M' => value * 60,
                'S' => value,
                _ => return None,
            };
        }
        return number.is_empty().then_some(total);
    }

    let parts = raw
        .split(':')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    match parts.as_slice() {
        [s] => Some(*s),
        [m, s] => Some(m * 60 + s),
        [h, m, s] => Some(h * 3600 + m * 60 + s),
        _ => None,
    }
}

pub fn parse_video(path: &Path, raw: &str) -> Result<Video, ContentError> {
    let file: VideoFile = serde_yaml::from_str(raw).map_err(|source| ContentError::Yaml {
        path: path.to_owned(),
        source,
    })?;

    let missing = |field| ContentError::MissingField {
        path: path.to_owned(),
        field,
    };

    let video_id = file.video_id.ok_or_else(|| missing("videoId"))?;
    let title = file.title.ok_or_else(|| missing("title"))?;
    let published_raw = file.published_at.ok_or_else(|| missing("publishedAt"))?;
    let published_at = parse_date(&published_raw).ok_or_else(|| ContentError::InvalidDate {
        path: path.to_owned(),
        value: published_raw.clone(),
    })?;

    let slug = checked_slug(path, file.slug.unwrap_or_else(|| slug_of(path)))?;

    let duration_seconds = file
        .duration_seconds
        .or_else(|| parse_duration(&file.duration))
        .unwrap_or(0);

    Ok(Video {
        slug,
        thumbnail_url: file
            .thumbnail_url
            .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)),
        embed_url: file
            .embed_url
            .unwrap_or_else(|| format!("https://www.youtube.com/embed/{}", video_id)),
        youtube_url: file
            .youtube_url
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", video_id)),
        video_id,
        title,
        description: file.description,
        duration: file.duration,
        duration_seconds,
        published_at,
        category: file.category,
        tags: file.tags.into_vec(),
        channel_title: file.channel_title,
        featured: file.featured,
        transcript: file.transcript,
    })
}

/// Load every video under `dir`, newest first. Bad files are logged and skipped.
pub fn load_videos(dir: &Path) -> Vec<Video> {
    let mut videos: Vec<Video> = content_files(dir, EXTENSIONS)
        .into_iter()
        .filter_map(|path| {
            let parsed = std::fs::read_to_string(&path)
                .map_err(|source| ContentError::Io {
                    path: path.clone(),
                    source,
                })
                .and_then(|raw| parse_video(&path, &raw));

            match parsed {
                Ok(video) => Some(video),
                Err(err) => {
                    log::warn!("Skipping video: {}", err);
                    None
                }
            }
        })
        .collect();

    videos.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    videos
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(parse_duration("12:34"), Some(754));
        assert_eq!(parse_duration("1:02:03"), Some(3723));
        assert_eq!(parse_duration("PT1H2M3S"), Some(3723));
        assert_eq!(parse_duration("PT15M"), Some(900));
        assert_eq!(parse_duration("PT15"), None);
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn parses_video_with_defaults() {
        let raw = "videoId: abc123\ntitle: Atrial Fibrillation Overview\npublishedAt: 2024-02-10T08:00:00Z\nduration: '8:20'\ncategory: Cardiology\ntags: [afib, ecg]\n";
        let video = parse_video(Path::new("videos/afib-overview.yaml"), raw).unwrap();

        assert_eq!(video.slug, "afib-overview");
        assert_eq!(video.duration_seconds, 500);
        assert_eq!(video.embed_url, "https://www.youtube.com/embed/abc123");
        assert_eq!(video.youtube_url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(video.tags, vec!["afib", "ecg"]);
    }

    #[test]
    fn explicit_slug_wins() {
        let raw = "videoId: x\nslug: custom\ntitle: T\npublishedAt: 2024-01-01\n";
        assert_eq!(parse_video(Path::new("v/file.yaml"), raw).unwrap().slug, "custom");
    }

    #[test]
    fn path_like_slugs_are_rejected() {
        for slug in ["../../escaped", "a/b", "Upper", "''"] {
            let raw = format!("videoId: x\nslug: {}\ntitle: T\npublishedAt: 2024-01-01\n", slug);
            let err = parse_video(Path::new("v/file.yaml"), &raw).unwrap_err();
            assert!(matches!(err, ContentError::InvalidSlug { .. }), "{}", slug);
        }

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("escape.yaml"),
            "videoId: x\nslug: ../../escaped\ntitle: T\npublishedAt: 2024-01-01\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("fine.yaml"), "videoId: y\ntitle: T\npublishedAt: 2024-01-01\n").unwrap();
        let slugs: Vec<String> = load_videos(dir.path()).into_iter().map(|v| v.slug).collect();
        assert_eq!(slugs, vec!["fine"]);
    }

    #[test]
    fn missing_video_id() {
        let err = parse_video(Path::new("v.yaml"), "title: T\npublishedAt: 2024-01-01\n").unwrap_err();
        assert!(matches!(err, ContentError::MissingField { field: "videoId", .. }));
    }
}
