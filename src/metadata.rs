// SPDX-FileCopyrightText: 2024 Ohin "Kazani" Taylor <kazani@kazani.dev>
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub author: String,
    pub author_id: Option<String>,
    pub published_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub featured: bool,
    pub image_url: Option<String>,
    pub tags: Vec<String>,

    /// Markdown body, frontmatter removed.
    pub content: String,
    pub html_content: String,
    pub reading_minutes: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub video_id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub duration: String,
    pub duration_seconds: u64,
    pub published_at: DateTime<Utc>,
    pub category: String,
    pub tags: Vec<String>,
    pub channel_title: String,
    pub embed_url: String,
    pub youtube_url: String,
    pub featured: bool,
    pub transcript: Option<String>,
}

impl Article {
    /// Text the relevance scorer looks at.
    pub fn keyword_text(&self) -> String {
        format!("{} {} {}", self.title, self.excerpt, self.tags.join(" "))
    }
}

impl Video {
    pub fn keyword_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title,
            self.description,
            self.tags.join(" "),
            self.category
        )
    }

    /// ISO-8601 duration, e.g. `PT1H2M3S`.
    pub fn iso_duration(&self) -> String {
        let hours = self.duration_seconds / 3600;
        let minutes = (self.duration_seconds % 3600) / 60;
        let seconds = self.duration_seconds % 60;

        let mut out = String::from("PT");
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if seconds > 0 || out == "PT" {
            out.push_str(&format!("{}S", seconds));
        }
        out
    }
}
