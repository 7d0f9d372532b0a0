// SPDX-FileCopyrightText: 2024 Ohin "Kazani" Taylor <kazani@kazani.dev>
// SPDX-License-Identifier: MIT

use std::path::Path;

use chrono::Datelike;
use tera::{Context, Tera};

use crate::config::Config;

const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("blog.html", include_str!("../templates/blog.html")),
    ("article.html", include_str!("../templates/article.html")),
    ("videos.html", include_str!("../templates/videos.html")),
    ("watch.html", include_str!("../templates/watch.html")),
];

#[derive(Clone, Debug)]
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Built-in templates, overridden by any `*.html` with the same name in `dir`.
    pub fn new(dir: &Path) -> Result<Self, tera::Error> {
        Ok(Self {
            tera: Self::create_tera(dir)?,
        })
    }

    /// Creates a Tera instance from the site's template dir, falling back to the defaults.
    /// Also disables autoescape
    fn create_tera(dir: &Path) -> Result<Tera, tera::Error> {
        let mut tera = if dir.is_dir() {
            let mut pb = dir.to_owned();
            pb.push("**");
            pb.push("*.html");

            log::info!("Loading templates from {:?}", dir);
            Tera::parse(&pb.to_string_lossy())?
        } else {
            Tera::default()
        };

        let mut defaults = Tera::default();
        defaults.add_raw_templates(DEFAULT_TEMPLATES.to_vec())?;
        // `extend` keeps templates that already exist, so site templates win.
        tera.extend(&defaults)?;
        tera.build_inheritance_chains()?;

        tera.autoescape_on(vec![]); // Text fields are escaped in the templates; bodies are trusted HTML.

        Ok(tera)
    }

    /// Site-wide values every page can use.
    pub fn base_context(config: &Config) -> Context {
        let mut context = Context::new();
        context.insert("site", config);
        context.insert("video_prefix", config.video_path_prefix.trim_end_matches('/'));
        context.insert("year", &chrono::Utc::now().year());
        context.insert("schemas", &Vec::<String>::new());
        context
    }

    /// Render a page.
    pub fn render(&self, template: &str, context: &Context) -> Result<String, tera::Error> {
        self.tera.render(template, context)
    }
}
