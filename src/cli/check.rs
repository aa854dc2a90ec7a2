//! `pixfall check`: drive the format fallback for every image of the site.
//!
//! Each `<img>` (or image file given directly) gets its own
//! [`FallbackLoader`] against a [`SiteSource`] decoding like the chosen
//! client would. Exhausted images are errors; images that only loaded as
//! the original although variants are configured are reported separately.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use futures::future::join_all;

use crate::cli::args::{CheckArgs, ClientArg};
use crate::cli::common::{collect_files, is_html};
use crate::cli::report::ImageReport;
use crate::config::PixConfig;
use crate::image::source::SiteSource;
use crate::image::probe::session_capabilities;
use crate::image::{
    CapabilitySnapshot, ClientProfile, Decoder, FallbackLoader, ImageFormat,
    ImageRequest, LoadState, NativeDecoder,
};
use crate::logger::status_warning;
use crate::page::{page_url, resolve_src, scan_images};
use crate::utils::plural_count;
use crate::{debug, log};

impl ClientArg {
    pub fn decoder(self) -> Arc<dyn Decoder> {
        match self {
            Self::Modern => Arc::new(ClientProfile::Modern),
            Self::Webp => Arc::new(ClientProfile::Webp),
            Self::Legacy => Arc::new(ClientProfile::Legacy),
            Self::Native => Arc::new(NativeDecoder),
        }
    }
}

/// Images to check, grouped by where they were found.
type Targets = Vec<(String, Vec<ImageRequest>)>;

pub fn check_site(args: &CheckArgs, config: &PixConfig) -> Result<()> {
    let root = config.site_root();
    if !root.is_dir() {
        bail!("site root not found: {}", root.display());
    }

    let files = collect_files(&args.paths, root, "a page or image", |p| {
        is_html(p) || config.images.is_original(p)
    })?;
    let targets = collect_targets(&files, config)?;
    let total: usize = targets.iter().map(|(_, r)| r.len()).sum();
    if total == 0 {
        log!("check"; "no images found");
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("Failed to start async runtime")?;

    let decoder = args.client.decoder();
    let (caps, report) = runtime.block_on(async {
        let caps = session_capabilities(Arc::clone(&decoder)).await;
        let source = SiteSource::new(root, decoder);
        let report = run_checks(&targets, caps, &source, config).await;
        (caps, report)
    });

    log!(
        "check";
        "{} as {:?} client (avif: {}, webp: {})",
        plural_count(total, "image"),
        args.client,
        caps.avif_supported,
        caps.webp_supported
    );

    report.print();
    if report.exhausted_count() > 0 && !args.warn_only {
        eprintln!();
        bail!("{}", report);
    }
    if report.is_clean() {
        log!("check"; "{}", report);
    } else {
        status_warning(&report.to_string());
    }
    Ok(())
}

/// Resolve every page image (and every direct image path) to a request.
fn collect_targets(files: &[impl AsRef<Path>], config: &PixConfig) -> Result<Targets> {
    let root = config.site_root();
    let mut targets = Targets::new();

    for file in files {
        let file = file.as_ref();
        let label = config.root_relative(file).display().to_string();
        let Some(url) = page_url(root, file) else {
            debug!("check"; "outside the site root, skipped: {}", label);
            continue;
        };

        if !is_html(file) {
            targets.push((label, vec![ImageRequest::new(url)]));
            continue;
        }

        let html = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let mut requests: Vec<ImageRequest> = Vec::new();
        for tag in scan_images(&html) {
            let Some(src) = resolve_src(&url, &tag.src) else {
                debug!("check"; "{}: external image skipped: {}", label, tag.src);
                continue;
            };
            if requests.iter().any(|r| r.canonical_path == src) {
                continue;
            }
            let critical = config.preload.is_critical(&src);
            requests.push(tag.request(src, critical));
        }
        if !requests.is_empty() {
            targets.push((label, requests));
        }
    }

    Ok(targets)
}

async fn run_checks(
    targets: &Targets,
    caps: CapabilitySnapshot,
    source: &SiteSource,
    config: &PixConfig,
) -> ImageReport {
    let variants = config.images.variant_formats();
    let expects_variant = variants.iter().any(|f| caps.supports(*f));

    let mut report = ImageReport::default();
    for (label, requests) in targets {
        let outcomes = join_all(requests.iter().map(|request| async move {
            let mut loader = FallbackLoader::new(request.clone(), caps);
            let state = loader.drive(source).await;
            (request, state, loader.attempts().to_vec())
        }))
        .await;

        for (request, state, attempts) in outcomes {
            let src = request.canonical_path.clone();
            match state {
                LoadState::Exhausted => {
                    report.add_exhausted(label.clone(), src, tried(&attempts));
                }
                LoadState::Succeeded(ImageFormat::Original) if expects_variant && attempts.len() > 1 => {
                    report.add_degraded(label.clone(), src, tried(&attempts[..attempts.len() - 1]));
                }
                _ => debug!("check"; "{}: {} {}", label, src, state),
            }
        }
    }
    report
}

fn tried(attempts: &[ImageFormat]) -> String {
    let names: Vec<_> = attempts.iter().map(|f| f.as_str()).collect();
    format!("(tried {})", names.join(", "))
}
