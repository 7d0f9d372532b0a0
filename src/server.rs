//! The same pages as the static build, served with live search and pagination.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::calculators::{self, CalculatorError, Inputs};
use crate::config::Config;
use crate::content::ContentIndex;
use crate::feed;
use crate::listing::{self, ListingQuery, Page};
use crate::metadata::{Article, Video};
use crate::pages::{PageLinks, Pages, RELATED_LIMIT};
use crate::pdf::{BlogPdfGenerator, PdfOptions};
use crate::relevance;
use crate::template::Templates;

pub struct AppState {
    pub config: Config,
    pub index: ContentIndex,
    pub templates: Templates,
    pub pdf: BlogPdfGenerator,
}

impl AppState {
    pub fn new(config: Config, index: ContentIndex) -> anyhow::Result<Self> {
        let templates = Templates::new(&config.templates_dir)?;
        let pdf = BlogPdfGenerator::new(PdfOptions {
            site_name: config.site_name.clone(),
            site_url: config.site_url.clone(),
        });

        Ok(Self {
            config,
            index,
            templates,
            pdf,
        })
    }

    fn pages(&self) -> Pages<'_> {
        Pages::new(&self.config, &self.index, &self.templates)
    }
}

type SharedState = Arc<AppState>;

pub fn router(state: AppState) -> Router {
    let watch_route = format!("{}/:slug", state.config.video_path_prefix.trim_end_matches('/'));

    Router::new()
        .route("/", get(home))
        .route("/blog", get(blog))
        .route("/blog/:slug", get(article))
        .route("/blog/:slug/pdf", get(article_pdf))
        .route("/videos", get(videos))
        .route(&watch_route, get(watch))
        .route("/api/blog", get(api_blog))
        .route("/api/videos", get(api_videos))
        .route("/api/blog/:slug/related", get(api_related))
        .route("/tools", get(tools))
        .route("/tools/:calculator", get(calculator))
        .route("/feed.xml", get(rss_feed))
        .route("/sitemap.xml", get(sitemap))
        .with_state(Arc::new(state))
}

pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn internal_error(err: anyhow::Error) -> StatusCode {
    log::error!("{:#}", err);
    StatusCode::INTERNAL_SERVER_ERROR
}

fn render(result: anyhow::Result<String>) -> Result<Html<String>, StatusCode> {
    result.map(Html).map_err(internal_error)
}

async fn home(State(state): State<SharedState>) -> Result<Html<String>, StatusCode> {
    render(state.pages().home())
}

async fn blog(
    State(state): State<SharedState>,
    Query(query): Query<ListingQuery>,
) -> Result<Html<String>, StatusCode> {
    render(state.pages().blog_list(&query, PageLinks::Query))
}

async fn article(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let article = state.index.article(&slug).ok_or(StatusCode::NOT_FOUND)?;
    let pdf_link = format!("/blog/{}/pdf", article.slug);
    render(state.pages().article(article, Some(pdf_link.as_str())))
}

async fn article_pdf(State(state): State<SharedState>, Path(slug): Path<String>) -> Result<Response, StatusCode> {
    let article = state.index.article(&slug).ok_or(StatusCode::NOT_FOUND)?;
    let body = state.pages().article_body(article);
    let bytes = state.pdf.generate(article, &body).map_err(internal_error)?;

    let disposition = format!("attachment; filename=\"{}\"", BlogPdfGenerator::filename(article));
    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|err| internal_error(err.into()))?,
    );
    Ok(response)
}

async fn videos(
    State(state): State<SharedState>,
    Query(query): Query<ListingQuery>,
) -> Result<Html<String>, StatusCode> {
    render(state.pages().video_list(&query, PageLinks::Query))
}

async fn watch(State(state): State<SharedState>, Path(slug): Path<String>) -> Result<Html<String>, StatusCode> {
    let video = state.index.video(&slug).ok_or(StatusCode::NOT_FOUND)?;
    render(state.pages().watch(video))
}

async fn api_blog(State(state): State<SharedState>, Query(query): Query<ListingQuery>) -> Json<Page<Article>> {
    Json(listing::search_articles(state.index.articles(), &query, state.config.page_size))
}

async fn api_videos(State(state): State<SharedState>, Query(query): Query<ListingQuery>) -> Json<Page<Video>> {
    Json(listing::search_videos(state.index.videos(), &query, state.config.page_size))
}

#[derive(Serialize)]
struct Related<'a> {
    articles: Vec<&'a Article>,
    videos: Vec<&'a Video>,
}

async fn api_related(State(state): State<SharedState>, Path(slug): Path<String>) -> Result<Response, StatusCode> {
    let article = state.index.article(&slug).ok_or(StatusCode::NOT_FOUND)?;
    let related = Related {
        articles: relevance::get_related_articles(&state.index, &slug, RELATED_LIMIT),
        videos: relevance::get_related_videos_for_article(article, state.index.videos(), RELATED_LIMIT),
    };
    Ok(Json(related).into_response())
}

async fn tools() -> Json<serde_json::Value> {
    Json(json!({ "calculators": calculators::CALCULATORS }))
}

async fn calculator(
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Json<serde_json::Value>) {
    match calculators::run(&name, &Inputs::new(&params)) {
        Ok(result) => (StatusCode::OK, Json(result)),
        Err(err @ CalculatorError::Unknown(_)) => (StatusCode::NOT_FOUND, Json(json!({ "error": err.to_string() }))),
        Err(err) => (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))),
    }
}

fn xml(body: Vec<u8>, content_type: &'static str) -> Response {
    ([(header::CONTENT_TYPE, HeaderValue::from_static(content_type))], body).into_response()
}

async fn rss_feed(State(state): State<SharedState>) -> Response {
    let channel = feed::rss_channel(&state.config, state.index.articles());
    xml(channel.to_string().into_bytes(), "application/rss+xml")
}

async fn sitemap(State(state): State<SharedState>) -> Result<Response, StatusCode> {
    let entries = feed::sitemap_entries(&state.config, &state.index);
    let body = feed::sitemap_xml(&state.config, &entries).map_err(internal_error)?;
    Ok(xml(body, "application/xml"))
}
