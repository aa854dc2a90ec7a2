//! `pixfall rewrite`: apply the delivery protocol to built pages.
//!
//! For every `<img>` of a page:
//!
//! - the fallback runs against the files on disk; an image whose every
//!   format is missing is replaced by the placeholder box
//! - the others get `loading`/`decoding` hints and, unless already inside
//!   one, a `<picture>` listing the variants that exist
//! - the shown source goes to the preload scheduler, which adds
//!   `preload` / `prefetch` / `preconnect` links before `</head>`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;

use crate::cli::args::RewriteArgs;
use crate::cli::common::{collect_files, is_html};
use crate::config::PixConfig;
use crate::image::picture::{loading_attrs, render_picture};
use crate::image::placeholder::render_box;
use crate::image::source::SiteSource;
use crate::image::{
    CapabilitySnapshot, ClientProfile, FallbackLoader, ImageFormat, ImageRequest, LoadState,
    resolve,
};
use crate::logger::{status_error, status_success};
use crate::page::{Edits, ImgTag, page_url, resolve_src, scan_images, with_attrs};
use crate::preload::{HtmlDocument, PreloadScheduler};
use crate::utils::path::url_to_file;
use crate::utils::plural_count;
use crate::{debug, log};

/// What happened to one page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub path: PathBuf,
    pub pictures: usize,
    pub placeholders: usize,
    pub hints: usize,
    pub changed: bool,
}

/// Shared state for rewriting the pages of one site.
struct Rewriter<'a> {
    config: &'a PixConfig,
    source: SiteSource,
    picture: bool,
    dry: bool,
}

pub fn rewrite_pages(args: &RewriteArgs, config: &PixConfig) -> Result<()> {
    let root = config.site_root();
    let files = collect_files(&args.pages, root, "an HTML page", is_html)?;
    if files.is_empty() {
        log!("rewrite"; "no pages under {}", config.root_relative(root).display());
        return Ok(());
    }

    let rewriter = Rewriter {
        config,
        // Presence check only: every container the site can hold decodes.
        source: SiteSource::new(root, Arc::new(ClientProfile::Modern)),
        picture: args.picture.unwrap_or(true),
        dry: args.dry,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start async runtime")?;
    let results = runtime.block_on(join_all(files.iter().map(|f| rewriter.rewrite(f))));

    let mut outcomes = Vec::with_capacity(results.len());
    let mut failed = 0;
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                failed += 1;
                status_error(
                    &format!("failed: {}", config.root_relative(file).display()),
                    &format!("{e:#}"),
                );
            }
        }
    }

    summarize(&outcomes, args.dry);
    if failed > 0 {
        anyhow::bail!("{} could not be rewritten", plural_count(failed, "page"));
    }
    Ok(())
}

fn summarize(outcomes: &[PageOutcome], dry: bool) {
    let changed = outcomes.iter().filter(|o| o.changed).count();
    let pictures: usize = outcomes.iter().map(|o| o.pictures).sum();
    let placeholders: usize = outcomes.iter().map(|o| o.placeholders).sum();
    let hints: usize = outcomes.iter().map(|o| o.hints).sum();

    let verb = if dry { "would rewrite" } else { "rewrote" };
    status_success(&format!(
        "{} {} of {} ({}, {}, {})",
        verb,
        changed,
        plural_count(outcomes.len(), "page"),
        plural_count(pictures, "picture"),
        plural_count(placeholders, "placeholder"),
        plural_count(hints, "hint"),
    ));
}

impl Rewriter<'_> {
    async fn rewrite(&self, file: &Path) -> Result<PageOutcome> {
        let config = self.config;
        let html = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let url = page_url(config.site_root(), file)
            .with_context(|| format!("{} is outside the site root", file.display()))?;

        let mut outcome = PageOutcome {
            path: file.to_path_buf(),
            ..PageOutcome::default()
        };
        let mut edits = Edits::new();
        let mut preload = Vec::new();

        for tag in scan_images(&html) {
            let Some(src) = resolve_src(&url, &tag.src) else {
                // External: only hints apply.
                preload.push(ImageRequest::new(tag.src.clone()).priority(tag.priority));
                self.add_loading(&tag, &html, tag.priority, &mut edits);
                continue;
            };

            let critical = config.preload.is_critical(&src);
            let request = tag.request(src, critical);
            let mut loader = FallbackLoader::new(request.clone(), CapabilitySnapshot::ALL);
            match loader.drive(&self.source).await {
                LoadState::Exhausted => {
                    debug!("rewrite"; "{}: {} has no loadable format", url, request.canonical_path);
                    edits.replace(
                        tag.range.clone(),
                        render_box(&request, &tag.alt, tag.class.as_deref()),
                    );
                    outcome.placeholders += 1;
                }
                state => {
                    let shown = loader
                        .current_src()
                        .unwrap_or_else(|| request.canonical_path.clone());
                    debug!("rewrite"; "{}: {} {}", url, shown, state);

                    let mut img = self.img_with_loading(&tag, &html, request.is_priority);
                    let available = self.available_variants(&request.canonical_path);
                    if self.picture && !tag.in_picture && !available.is_empty() {
                        img = render_picture(&tag.src, &available, &img);
                        outcome.pictures += 1;
                    }
                    if img != tag.source(&html) {
                        edits.replace(tag.range.clone(), img);
                    }

                    preload.push(
                        ImageRequest::new(shown)
                            .with_size(request.width, request.height)
                            .priority(request.is_priority),
                    );
                }
            }
        }

        let mut doc = HtmlDocument::parse(&html);
        let scheduler = PreloadScheduler::new(
            &self.source,
            config.preload.options(config.site.origin()),
        );
        let report = scheduler.schedule(&preload, &mut doc).await;
        debug!(
            "preload";
            "{}: {} warmed, {} failed, {} already hinted",
            url,
            report.loaded(),
            report.failed(),
            report.skipped.len()
        );
        outcome.hints = doc.added().len();

        let rewritten = doc.render_into(&edits.apply(&html));
        outcome.changed = rewritten != html;
        if outcome.changed && !self.dry {
            std::fs::write(file, rewritten)
                .with_context(|| format!("Failed to write {}", file.display()))?;
        }
        Ok(outcome)
    }

    fn img_with_loading(&self, tag: &ImgTag, html: &str, priority: bool) -> String {
        let mut attrs = loading_attrs(priority).to_vec();
        if priority {
            attrs.push(("fetchpriority", "high"));
        }
        with_attrs(tag.source(html), &attrs)
    }

    fn add_loading(&self, tag: &ImgTag, html: &str, priority: bool, edits: &mut Edits) {
        let img = self.img_with_loading(tag, html, priority);
        if img != tag.source(html) {
            edits.replace(tag.range.clone(), img);
        }
    }

    /// Configured variant formats whose sibling file exists, most preferred
    /// first.
    fn available_variants(&self, src: &str) -> Vec<ImageFormat> {
        let root = self.config.site_root();
        self.config
            .images
            .variant_formats()
            .into_iter()
            .filter(|f| {
                let sibling = resolve(src, *f);
                sibling != src && url_to_file(root, &sibling).is_some_and(|p| p.is_file())
            })
            .collect()
    }
}
