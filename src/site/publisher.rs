use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::{StreamExt, TryStreamExt, stream};
use image::DynamicImage;
use image::imageops::FilterType;
use pulldown_cmark::{Options, Parser};
use tokio::fs;

use crate::config::Config;
use crate::image_wrapper::wrap_images;
use crate::page::Page;

use super::index_builder::{
    build_page_index, link_list, render_template, sort_newest_first, summary_block,
};
use super::post::{Post, thumbnail_name};

const PAGE_TEMPLATE: &str = "posts/page_template.html";
const INDEX_TEMPLATE: &str = "posts/index_template.html";
const RESOURCES_DIR: &str = "resources";
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "gif", "png"];
const MAX_CONCURRENT_POSTS: usize = 8;
/// Images taller than this are scaled down on the post page.
const MAX_IMAGE_HEIGHT: u32 = 550;
const THUMBNAIL_HEIGHT: u32 = 100;
/// Posts with a full summary on the index page.
const FEATURED_POSTS: usize = 3;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub posts: Vec<String>,
    /// Source directories without a post body.
    pub skipped: Vec<String>,
    /// Live post directories removed because their source is gone.
    pub deleted: Vec<String>,
    pub images: usize,
}

/// Builds the live site from post source directories.
///
/// ```text
/// <src>/<post>/*.md + images     ->  <live>/posts/<post>/index.html + images, thumbnails
///                                    <live>/index.html (summaries, links, search index)
///                                    <live>/resources/  (copied from templates)
/// ```
pub struct Publisher {
    src_dir: PathBuf,
    live_dir: PathBuf,
    templates_dir: PathBuf,
    article_id: String,
    prewrap_images: bool,
}

struct LoadedPost {
    post: Post,
    images: Vec<PathBuf>,
}

impl Publisher {
    pub fn new(config: &Config) -> Self {
        Self {
            src_dir: config.src_dir.clone(),
            live_dir: config.live_dir.clone(),
            templates_dir: config.templates_dir.clone(),
            article_id: config.article_id.clone(),
            prewrap_images: false,
        }
    }

    /// Wrap article images in links at build time instead of in the browser.
    pub fn prewrap_images(mut self, prewrap: bool) -> Self {
        self.prewrap_images = prewrap;
        self
    }

    pub async fn publish(self: Arc<Self>) -> Result<PublishReport> {
        log::info!(
            "Publishing {} into {}",
            self.src_dir.display(),
            self.live_dir.display()
        );
        let posts_dir = self.live_dir.join("posts");
        fs::create_dir_all(&posts_dir)
            .await
            .with_context(|| format!("Failed to create {}", posts_dir.display()))?;

        let resources = self.templates_dir.join(RESOURCES_DIR);
        if fs::try_exists(&resources).await? {
            copy_dir_all(&resources, &self.live_dir.join(RESOURCES_DIR)).await?;
        }

        let page_template = read_template(&self.templates_dir.join(PAGE_TEMPLATE)).await?;
        let index_template = read_template(&self.templates_dir.join(INDEX_TEMPLATE)).await?;

        let names = self.post_dir_names().await?;
        log::info!("Found {} post directories", names.len());

        let loaded: Vec<(String, Option<LoadedPost>)> = stream::iter(names)
            .map(|name| {
                let this = self.clone();
                async move {
                    let loaded = this.load_post(&name).await?;
                    Ok::<_, anyhow::Error>((name, loaded))
                }
            })
            .buffer_unordered(MAX_CONCURRENT_POSTS)
            .try_collect()
            .await?;

        let mut report = PublishReport::default();
        let mut posts = Vec::new();
        for (name, loaded) in loaded {
            let Some(loaded) = loaded else {
                log::warn!("{} has no post body, skipping", name);
                report.skipped.push(name);
                continue;
            };
            self.write_post(&loaded.post, &page_template).await?;
            report.images += self.copy_images(&loaded.post.name, &loaded.images).await?;
            report.posts.push(loaded.post.name.clone());
            posts.push(loaded.post);
        }

        sort_newest_first(&mut posts);
        self.write_index(&posts, &index_template).await?;

        report.posts.sort();
        report.skipped.sort();
        report.deleted = self.remove_stale_posts(&report.posts).await?;
        log::info!(
            "Published {} posts ({} images, {} skipped, {} deleted)",
            report.posts.len(),
            report.images,
            report.skipped.len(),
            report.deleted.len()
        );
        Ok(report)
    }

    /// Directories in the source root whose names contain no dot.
    async fn post_dir_names(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.src_dir)
            .await
            .with_context(|| format!("Failed to read source dir {}", self.src_dir.display()))?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.contains('.') || !entry.file_type().await?.is_dir() {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    async fn load_post(&self, name: &str) -> Result<Option<LoadedPost>> {
        let dir = self.src_dir.join(name);
        let mut entries = fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read post dir {}", dir.display()))?;

        let mut markdown = Vec::new();
        let mut fragments = Vec::new();
        let mut images = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            match extension_of(&path).as_deref() {
                Some("md") => markdown.push(path),
                Some("html") => fragments.push(path),
                Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => images.push(path),
                _ => {}
            }
        }
        markdown.sort();
        fragments.sort();
        images.sort();

        // Markdown sources win over ready-made html fragments.
        let bodies = if markdown.is_empty() { &fragments } else { &markdown };
        let Some(body_path) = bodies.first() else {
            return Ok(None);
        };
        if bodies.len() > 1 {
            log::warn!(
                "{} has {} body files, using {}",
                name,
                bodies.len(),
                body_path.display()
            );
        }

        let source = fs::read_to_string(body_path)
            .await
            .with_context(|| format!("Failed to read {}", body_path.display()))?;
        let body = if markdown.is_empty() {
            source
        } else {
            markdown_to_html(&source)
        };
        let post = Post::from_body(name, body)
            .with_context(|| format!("Failed to summarize post {name}"))?;
        log::debug!("Loaded post {} ({} images)", name, images.len());
        Ok(Some(LoadedPost { post, images }))
    }

    async fn write_post(&self, post: &Post, template: &str) -> Result<()> {
        let dir = self.live_dir.join("posts").join(&post.name);
        fs::create_dir_all(&dir).await?;

        let mut html = render_template(
            template,
            &[("body", post.body.as_str()), ("title", post.title.as_str())],
        );
        if self.prewrap_images {
            html = self.wrap_article_images(&html, &post.name)?;
        }

        let out = dir.join("index.html");
        fs::write(&out, html)
            .await
            .with_context(|| format!("Failed to write {}", out.display()))?;
        Ok(())
    }

    fn wrap_article_images(&self, html: &str, name: &str) -> Result<String> {
        let page = Page::parse(html);
        match page.element_by_id(&self.article_id) {
            Some(container) => {
                let wrapped = wrap_images(page.dom(), &container, None);
                log::debug!("Wrapped {} images in {}", wrapped, name);
                Ok(page.html()?)
            }
            None => {
                log::warn!("{} has no #{} element, images left unwrapped", name, self.article_id);
                Ok(html.to_string())
            }
        }
    }

    /// Copies each image next to the post page, scaled down to
    /// `MAX_IMAGE_HEIGHT`, plus the thumbnail the index summaries link to.
    async fn copy_images(&self, name: &str, images: &[PathBuf]) -> Result<usize> {
        let dir = self.live_dir.join("posts").join(name);
        for image in images {
            let Some(file_name) = image.file_name().map(|f| f.to_string_lossy().to_string())
            else {
                continue;
            };
            let src = image.clone();
            let target = dir.join(&file_name);
            let thumb = dir.join(thumbnail_name(&file_name));
            tokio::task::spawn_blocking(move || resize_and_copy(&src, &target, &thumb))
                .await
                .context("Image task panicked")?
                .with_context(|| format!("Failed to copy {}", image.display()))?;
        }
        Ok(images.len())
    }

    /// Removes `<live>/posts/*` directories that no published post owns.
    async fn remove_stale_posts(&self, published: &[String]) -> Result<Vec<String>> {
        let posts_dir = self.live_dir.join("posts");
        let mut entries = fs::read_dir(&posts_dir)
            .await
            .with_context(|| format!("Failed to read {}", posts_dir.display()))?;
        let mut deleted = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if !entry.file_type().await?.is_dir() || published.contains(&name) {
                continue;
            }
            fs::remove_dir_all(entry.path())
                .await
                .with_context(|| format!("Failed to remove {}", entry.path().display()))?;
            log::info!("Deleted post {}", name);
            deleted.push(name);
        }
        deleted.sort();
        Ok(deleted)
    }

    async fn write_index(&self, posts: &[Post], template: &str) -> Result<()> {
        let search_index = build_page_index(posts)?.to_json()?;
        let first_post = summary_block(posts, FEATURED_POSTS);
        let links = link_list(posts);
        let html = render_template(
            template,
            &[
                ("first_post", first_post.as_str()),
                ("link_list", links.as_str()),
                ("search_index", search_index.as_str()),
            ],
        );
        let out = self.live_dir.join("index.html");
        fs::write(&out, html)
            .await
            .with_context(|| format!("Failed to write {}", out.display()))?;
        Ok(())
    }
}

pub fn markdown_to_html(source: &str) -> String {
    let mut out = String::with_capacity(source.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut out, Parser::new_ext(source, Options::ENABLE_TABLES));
    out
}

/// Writes `target` capped at `MAX_IMAGE_HEIGHT` and a `THUMBNAIL_HEIGHT`
/// thumbnail, keeping the aspect ratio. Files that don't decode as images are
/// copied unchanged under both names.
fn resize_and_copy(src: &Path, target: &Path, thumb: &Path) -> Result<()> {
    let img = match image::open(src) {
        Ok(img) => img,
        Err(err) => {
            log::warn!("{} is not a readable image ({}), copying as is", src.display(), err);
            std::fs::copy(src, target)?;
            std::fs::copy(src, thumb)?;
            return Ok(());
        }
    };

    if img.height() > MAX_IMAGE_HEIGHT {
        scale_to_height(&img, MAX_IMAGE_HEIGHT).save(target)?;
    } else {
        std::fs::copy(src, target)?;
    }
    scale_to_height(&img, THUMBNAIL_HEIGHT).save(thumb)?;
    Ok(())
}

fn scale_to_height(img: &DynamicImage, height: u32) -> DynamicImage {
    let width = (u64::from(img.width()) * u64::from(height) / u64::from(img.height().max(1))).max(1);
    img.resize_exact(width as u32, height, FilterType::Triangle)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

async fn read_template(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read template {}", path.display()))
}

async fn copy_dir_all(from: &Path, to: &Path) -> Result<()> {
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src, dst)) = pending.pop() {
        fs::create_dir_all(&dst).await?;
        let mut entries = fs::read_dir(&src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = dst.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target));
            } else {
                fs::copy(entry.path(), &target)
                    .await
                    .with_context(|| format!("Failed to copy {}", entry.path().display()))?;
            }
        }
    }
    Ok(())
}
