use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use medpress::access::{Principal, RoleTable};
use medpress::admin::{AdminService, DedupeOptions};
use medpress::calculators::{self, Inputs};
use medpress::config::Config;
use medpress::content::ContentIndex;
use medpress::pages::Pages;
use medpress::pdf::{export_article, BlogPdfGenerator, PdfOptions};
use medpress::relevance;
use medpress::server::{self, AppState};
use medpress::site::SiteBuilder;
use medpress::store::JsonFileStore;
use medpress::template::Templates;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = ".", help = "The site directory, holding medpress.yaml.")]
    site: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the whole site into a directory.
    Build {
        #[arg(short, long, default_value = "public", help = "The destination directory")]
        dest: PathBuf,
        #[arg(long, help = "Also export every article as PDF")]
        pdfs: bool,
    },
    /// Serve the site with live search.
    Serve {
        #[arg(short, long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
    /// Export one article as PDF.
    Pdf {
        slug: String,
        #[arg(short, long, help = "Output file, defaults to `{slug}.pdf`")]
        out: Option<PathBuf>,
    },
    /// List the articles and videos related to an article.
    Related {
        slug: String,
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
    },
    /// Remove duplicate blog documents from the store.
    Dedupe {
        #[arg(long = "as", help = "Email of the admin running the cleanup")]
        email: String,
        #[arg(long, default_value_t = 20)]
        batch_size: usize,
        #[arg(long, default_value_t = 3)]
        retries: usize,
        #[arg(long, help = "Progress file for resuming an interrupted run")]
        journal: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Run a calculator, e.g. `calc bmi weight_kg=70 height_cm=175`.
    Calc {
        name: String,
        #[arg(value_parser = parse_input)]
        inputs: Vec<(String, String)>,
    },
}

fn parse_input(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))
}

fn main() -> anyhow::Result<()> {
    // Initialize Logging.
    let log_environ = env_logger::Env::new()
        .filter("MEDPRESS_LOG")
        .write_style("MEDPRESS_LOG_STYLE");
    let mut log_builder = env_logger::Builder::new();

    log_builder.filter_level(log::LevelFilter::Info);
    log_builder.parse_env(log_environ);
    log_builder.init();

    // Parse Arguments.
    let args = Args::parse();
    let config = Config::load(&args.site)?;

    match args.command {
        Command::Build { dest, pdfs } => {
            log::info!("Beginning to process `{}`", args.site.display());
            log::info!("Outputting to `{}`", dest.display());

            let index = ContentIndex::load(&config);
            SiteBuilder::new(config, index, &dest)?.with_pdfs(pdfs).build()?;
        }
        Command::Serve { addr } => {
            let state = AppState::new(config.clone(), ContentIndex::load(&config))?;
            tokio::runtime::Runtime::new()?.block_on(server::serve(state, addr))?;
        }
        Command::Pdf { slug, out } => {
            let index = ContentIndex::load(&config);
            let article = index
                .article(&slug)
                .with_context(|| format!("no article `{}`", slug))?;
            let templates = Templates::new(&config.templates_dir)?;
            let body = Pages::new(&config, &index, &templates).article_body(article);

            let options = PdfOptions {
                site_name: config.site_name.clone(),
                site_url: config.site_url.clone(),
            };
            let out = out.unwrap_or_else(|| BlogPdfGenerator::filename(article).into());
            std::fs::write(&out, export_article(article, &body, options)?)
                .with_context(|| format!("writing {:?}", out))?;
            log::info!("Wrote {:?}", out);
        }
        Command::Related { slug, limit } => {
            let index = ContentIndex::load(&config);
            let article = index
                .article(&slug)
                .with_context(|| format!("no article `{}`", slug))?;

            for related in relevance::get_related_articles(&index, &slug, limit) {
                println!("article\t{}\t{}", related.slug, related.title);
            }
            for video in relevance::get_related_videos_for_article(article, index.videos(), limit) {
                println!("video\t{}\t{}", video.slug, video.title);
            }
        }
        Command::Dedupe {
            email,
            batch_size,
            retries,
            journal,
            dry_run,
        } => {
            let store_file = config.store_file.as_deref().context("`store_file` is not configured")?;
            let roles_file = config.roles_file.as_deref().context("`roles_file` is not configured")?;
            let store = JsonFileStore::open(store_file)?;
            let roles = RoleTable::load(roles_file)?;

            let report = AdminService::new(&store, &roles).remove_duplicate_posts(
                &Principal::new(&email),
                &DedupeOptions {
                    batch_size,
                    retries,
                    journal,
                    dry_run,
                },
            )?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Calc { name, inputs } => {
            let params: HashMap<String, String> = inputs.into_iter().collect();
            let result = calculators::run(&name, &Inputs::new(&params))?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    log::info!("Done.");
    Ok(())
}
