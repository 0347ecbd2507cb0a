use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use blogsearch::config::{CONFIG, Config};
use blogsearch::dom;
use blogsearch::image_wrapper::ImageWrapper;
use blogsearch::page::{Key, KeyEvent, Page};
use blogsearch::page_index::PageIndex;
use blogsearch::search::{SearchBox, match_query};
use blogsearch::site::Publisher;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(about = "Static blog publishing with image lightbox links and keyword search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the live site from post source directories
    Publish {
        #[arg(long)]
        src: Option<PathBuf>,
        #[arg(long)]
        live: Option<PathBuf>,
        #[arg(long)]
        templates: Option<PathBuf>,
        /// Wrap article images in links at build time
        #[arg(long)]
        prewrap_images: bool,
    },
    /// Print the posts matching a query
    Search {
        #[arg(long)]
        index: PathBuf,
        query: Vec<String>,
    },
    /// Load a page, run its behaviors, submit a query and print the resulting html
    Render {
        #[arg(long)]
        page: PathBuf,
        /// Page index json; defaults to the `set_search_data(...)` call embedded in the page
        #[arg(long)]
        index: Option<PathBuf>,
        #[arg(long, default_value = "")]
        query: String,
        #[arg(long)]
        base_url: Option<Url>,
    },
    /// Wrap the article images of a page and print the resulting html
    WrapImages {
        page: PathBuf,
        #[arg(long)]
        base_url: Option<Url>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config: &Config = &CONFIG;

    match cli.command {
        Command::Publish {
            src,
            live,
            templates,
            prewrap_images,
        } => {
            let mut config = config.clone();
            if let Some(src) = src {
                config.src_dir = src;
            }
            if let Some(live) = live {
                config.live_dir = live;
            }
            if let Some(templates) = templates {
                config.templates_dir = templates;
            }
            let publisher = Arc::new(Publisher::new(&config).prewrap_images(prewrap_images));
            let report = publisher.publish().await?;
            println!(
                "{} post(s) published, {} skipped",
                report.posts.len(),
                report.skipped.len()
            );
        }
        Command::Search { index, query } => {
            let index = load_index(&index).await?;
            let results = match_query(&query.join(" "), &index);
            if results.is_empty() {
                println!("Nothing found");
            }
            for id in results.iter() {
                println!("{id}");
            }
        }
        Command::Render {
            page,
            index,
            query,
            base_url,
        } => {
            let mut page = load_page(&page).await?;
            let index = match index {
                Some(path) => load_index(&path).await?,
                None => PageIndex::from_document(page.document())?
                    .context("Page embeds no search data, pass --index")?,
            };
            tracing::info!(tokens = index.len(), "Loaded page index");
            let index = Arc::new(index);

            let mut wrapper = ImageWrapper::new(config.article_id.clone());
            if let Some(base_url) = base_url {
                wrapper = wrapper.with_base_url(base_url);
            }
            page.install(Box::new(wrapper));
            page.install(Box::new(SearchBox::new(index, config.results_id.clone())));

            page.fire_load();
            if let Some(input) = dom::first_element_by_tag(page.document(), "input") {
                dom::set_attr(&input, "value", &query);
            }
            page.fire_keydown(&KeyEvent::new(Key::Enter));
            println!("{}", page.html()?);
        }
        Command::WrapImages { page, base_url } => {
            let mut page = load_page(&page).await?;
            let mut wrapper = ImageWrapper::new(config.article_id.clone());
            if let Some(base_url) = base_url {
                wrapper = wrapper.with_base_url(base_url);
            }
            page.install(Box::new(wrapper));
            let faults = page.fire_load();
            if let Some(fault) = faults.into_iter().next() {
                return Err(fault.error.into());
            }
            println!("{}", page.html()?);
        }
    }
    Ok(())
}

async fn load_index(path: &Path) -> Result<PageIndex> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read page index {}", path.display()))?;
    PageIndex::from_json(&json).with_context(|| format!("Invalid page index {}", path.display()))
}

async fn load_page(path: &Path) -> Result<Page> {
    let html = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read page {}", path.display()))?;
    Ok(Page::parse(&html))
}
