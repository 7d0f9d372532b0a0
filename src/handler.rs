use relative_path::{RelativePath, RelativePathBuf};

use crate::listing::{self, ListingQuery};
use crate::pages::{PageLinks, Pages};
use crate::pdf::BlogPdfGenerator;

/// Everything a handler needs to render its part of the site.
pub struct BuildContext<'a> {
    pub pages: Pages<'a>,
    pub pdf: Option<&'a BlogPdfGenerator>,
}

/// One rendered file, relative to the output directory.
pub struct Output {
    pub route: RelativePathBuf,
    pub body: Vec<u8>,
}

impl Output {
    fn page(route: &str, body: String) -> Self {
        Self {
            route: RelativePath::new(route).to_relative_path_buf(),
            body: body.into_bytes(),
        }
    }
}

pub trait PageHandler {
    fn name(&self) -> &'static str;
    fn render(&mut self, ctx: &BuildContext) -> anyhow::Result<Vec<Output>>;
}

pub fn handlers() -> Vec<Box<dyn PageHandler>> {
    vec![
        Box::new(HomeHandler),
        Box::new(BlogListHandler),
        Box::new(ArticleHandler),
        Box::new(VideoListHandler),
        Box::new(WatchHandler),
    ]
}

fn listing_route(base: &str, page: usize) -> String {
    if page <= 1 {
        format!("{}/index.html", base)
    } else {
        format!("{}/page/{}/index.html", base, page)
    }
}

pub struct HomeHandler;

impl PageHandler for HomeHandler {
    fn name(&self) -> &'static str {
        "home"
    }

    fn render(&mut self, ctx: &BuildContext) -> anyhow::Result<Vec<Output>> {
        Ok(vec![Output::page("index.html", ctx.pages.home()?)])
    }
}

pub struct BlogListHandler;

impl PageHandler for BlogListHandler {
    fn name(&self) -> &'static str {
        "blog listing"
    }

    fn render(&mut self, ctx: &BuildContext) -> anyhow::Result<Vec<Output>> {
        let limit = ctx.pages.config.page_size;
        let total_pages = listing::paginate(ctx.pages.index.articles(), 1, limit).total_pages.max(1);

        let mut outputs = vec![];
        for page in 1..=total_pages {
            log::debug!("Rendering blog page {} of {}", page, total_pages);
            let query = ListingQuery {
                page: Some(page),
                ..Default::default()
            };
            outputs.push(Output::page(
                &listing_route("blog", page),
                ctx.pages.blog_list(&query, PageLinks::Static)?,
            ));
        }

        Ok(outputs)
    }
}

pub struct ArticleHandler;

impl PageHandler for ArticleHandler {
    fn name(&self) -> &'static str {
        "articles"
    }

    fn render(&mut self, ctx: &BuildContext) -> anyhow::Result<Vec<Output>> {
        let mut outputs = vec![];

        for article in ctx.pages.index.articles() {
            log::info!("Rendering article `{}`", article.slug);

            let pdf_route = format!("blog/{}", BlogPdfGenerator::filename(article));
            let pdf_link = ctx.pdf.map(|_| format!("/{}", pdf_route));
            let html = ctx.pages.article(article, pdf_link.as_deref())?;
            outputs.push(Output::page(&format!("blog/{}/index.html", article.slug), html));

            if let Some(pdf) = ctx.pdf {
                let body = ctx.pages.article_body(article);
                outputs.push(Output {
                    route: RelativePathBuf::from(pdf_route),
                    body: pdf.generate(article, &body)?,
                });
            }
        }

        Ok(outputs)
    }
}

pub struct VideoListHandler;

impl PageHandler for VideoListHandler {
    fn name(&self) -> &'static str {
        "video listing"
    }

    fn render(&mut self, ctx: &BuildContext) -> anyhow::Result<Vec<Output>> {
        let limit = ctx.pages.config.page_size;
        let total_pages = listing::paginate(ctx.pages.index.videos(), 1, limit).total_pages.max(1);

        (1..=total_pages)
            .map(|page| -> anyhow::Result<Output> {
                let query = ListingQuery {
                    page: Some(page),
                    ..Default::default()
                };
                Ok(Output::page(
                    &listing_route("videos", page),
                    ctx.pages.video_list(&query, PageLinks::Static)?,
                ))
            })
            .collect()
    }
}

pub struct WatchHandler;

impl PageHandler for WatchHandler {
    fn name(&self) -> &'static str {
        "watch pages"
    }

    fn render(&mut self, ctx: &BuildContext) -> anyhow::Result<Vec<Output>> {
        let prefix = ctx.pages.config.video_path_prefix.trim_matches('/');

        ctx.pages
            .index
            .videos()
            .iter()
            .map(|video| -> anyhow::Result<Output> {
                log::debug!("Rendering video `{}`", video.slug);
                Ok(Output::page(
                    &format!("{}/{}/index.html", prefix, video.slug),
                    ctx.pages.watch(video)?,
                ))
            })
            .collect()
    }
}
