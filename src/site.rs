use std::path::{Path, PathBuf};

use relative_path::RelativePath;

use crate::config::Config;
use crate::content::ContentIndex;
use crate::feed;
use crate::files::{write_route, StaticFiles};
use crate::handler::{handlers, BuildContext};
use crate::pages::Pages;
use crate::pdf::{BlogPdfGenerator, PdfOptions};
use crate::template::Templates;

/// What a build produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub pages: usize,
    pub pdfs: usize,
    pub assets: usize,
}

pub struct SiteBuilder {
    config: Config,
    index: ContentIndex,
    templates: Templates,
    dest: PathBuf,
    pdfs: bool,
}

impl SiteBuilder {
    pub fn new(config: Config, index: ContentIndex, dest: &Path) -> anyhow::Result<Self> {
        let templates = Templates::new(&config.templates_dir)?;

        Ok(Self {
            config,
            index,
            templates,
            dest: dest.to_owned(),
            pdfs: false,
        })
    }

    /// Also write `blog/{slug}.pdf` next to every article.
    pub fn with_pdfs(mut self, pdfs: bool) -> Self {
        self.pdfs = pdfs;
        self
    }

    pub fn build(&self) -> anyhow::Result<BuildReport> {
        log::info!("Building site into {:?}", self.dest);

        let pdf = BlogPdfGenerator::new(PdfOptions {
            site_name: self.config.site_name.clone(),
            site_url: self.config.site_url.clone(),
        });
        let ctx = BuildContext {
            pages: Pages::new(&self.config, &self.index, &self.templates),
            pdf: self.pdfs.then_some(&pdf),
        };

        let mut report = BuildReport::default();

        for mut handler in handlers() {
            log::info!("Rendering {}", handler.name());
            for output in handler.render(&ctx)? {
                write_route(&self.dest, &output.route, &output.body)?;
                match output.route.extension() {
                    Some("pdf") => report.pdfs += 1,
                    _ => report.pages += 1,
                }
            }
        }

        let channel = feed::rss_channel(&self.config, self.index.articles());
        write_route(&self.dest, RelativePath::new("feed.xml"), channel.to_string().as_bytes())?;
        write_route(
            &self.dest,
            RelativePath::new("sitemap.xml"),
            &feed::sitemap_xml(&self.config, &feed::sitemap_entries(&self.config, &self.index))?,
        )?;

        report.assets = StaticFiles::new(&self.config.static_dir).copy_into(&self.dest)?;

        log::info!(
            "Built {} pages, {} PDFs, copied {} assets",
            report.pages,
            report.pdfs,
            report.assets
        );
        Ok(report)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const ARTICLE: &str = "---
title: Atrial fibrillation in the ED
publishedAt: 2024-03-01
tags: [cardiology]
---
Atrial fibrillation needs rate control first.
";

    const VIDEO: &str = "videoId: abc123
title: Atrial Fibrillation Overview
description: Rhythm and rate control
publishedAt: 2024-02-01
duration: \"12:30\"
";

    #[test]
    fn builds_site() {
        let site = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let root = site.path();

        std::fs::create_dir_all(root.join("content/articles")).unwrap();
        std::fs::create_dir_all(root.join("content/videos")).unwrap();
        std::fs::create_dir_all(root.join("static")).unwrap();
        std::fs::write(root.join("content/articles/afib.md"), ARTICLE).unwrap();
        std::fs::write(root.join("content/videos/afib-overview.yaml"), VIDEO).unwrap();
        std::fs::write(root.join("static/site.css"), "body {}").unwrap();

        let config = Config::load(root).unwrap();
        let index = ContentIndex::load(&config);
        let report = SiteBuilder::new(config, index, out.path())
            .unwrap()
            .with_pdfs(true)
            .build()
            .unwrap();

        assert_eq!(report, BuildReport { pages: 5, pdfs: 1, assets: 1 });

        let dest = out.path();
        for file in [
            "index.html",
            "blog/index.html",
            "blog/afib/index.html",
            "blog/afib.pdf",
            "videos/index.html",
            "watch/afib-overview/index.html",
            "feed.xml",
            "sitemap.xml",
            "static/site.css",
        ] {
            assert!(dest.join(file).is_file(), "missing {}", file);
        }

        let article = std::fs::read_to_string(dest.join("blog/afib/index.html")).unwrap();
        assert!(article.contains("href=\"/watch/afib-overview\""));
        assert!(article.contains("href=\"/blog/afib.pdf\""));
        assert!(!article.contains("/blog/afib/pdf"));

        let sitemap = std::fs::read_to_string(dest.join("sitemap.xml")).unwrap();
        assert!(sitemap.contains("/blog/afib</loc>"));
        assert!(sitemap.contains("/watch/afib-overview</loc>"));

        let plain = tempfile::tempdir().unwrap();
        let config = Config::load(root).unwrap();
        let index = ContentIndex::load(&config);
        SiteBuilder::new(config, index, plain.path()).unwrap().build().unwrap();
        let article = std::fs::read_to_string(plain.path().join("blog/afib/index.html")).unwrap();
        assert!(!plain.path().join("blog/afib.pdf").exists());
        assert!(!article.contains("Download PDF"));
    }
}
