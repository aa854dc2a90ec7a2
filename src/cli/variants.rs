//! `pixfall variants`: encode AVIF/WebP siblings for every original.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use rayon::prelude::*;

use crate::cli::common::collect_files;
use crate::config::PixConfig;
use crate::image::ImageFormat;
use crate::image::encode::{EncodeError, VariantStatus, write_variants};
use crate::logger::{ProgressLine, status_error, status_success};
use crate::utils::plural_count;
use crate::{debug, log};

/// Per-format counts after a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct VariantSummary {
    pub written: Vec<(ImageFormat, usize)>,
    pub fresh: usize,
    pub failed: Vec<(PathBuf, String)>,
}

impl VariantSummary {
    fn record(&mut self, statuses: &[(ImageFormat, VariantStatus)]) {
        for (format, status) in statuses {
            match status {
                VariantStatus::Written => match self.written.iter_mut().find(|(f, _)| f == format) {
                    Some((_, n)) => *n += 1,
                    None => self.written.push((*format, 1)),
                },
                VariantStatus::Fresh => self.fresh += 1,
            }
        }
    }

    pub fn written_total(&self) -> usize {
        self.written.iter().map(|(_, n)| n).sum()
    }
}

/// Encode variants for `paths` (or the whole image tree).
pub fn encode_variants(paths: &[PathBuf], force: bool, config: &PixConfig) -> Result<()> {
    let images_dir = config.images_dir();
    let formats = config.images.variant_formats();
    if formats.is_empty() {
        log!("variants"; "no variant formats configured, nothing to do");
        return Ok(());
    }

    let files = if paths.is_empty() && !images_dir.exists() {
        Vec::new()
    } else {
        collect_files(paths, &images_dir, "an original image", |p| {
            config.images.is_original(p)
        })?
    };
    if files.is_empty() {
        log!("variants"; "no original images under {}", config.root_relative(&images_dir).display());
        return Ok(());
    }

    log!(
        "variants";
        "encoding {} to {}",
        plural_count(files.len(), "image"),
        formats.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(", ")
    );

    let summary = run(&files, &formats, config, force);
    report(&summary, config)
}

fn run(files: &[PathBuf], formats: &[ImageFormat], config: &PixConfig, force: bool) -> VariantSummary {
    let opts = config.images.encode_options();
    let progress = ProgressLine::new("variants", &[("images", files.len())]);

    let results: Vec<(&PathBuf, Result<Vec<(ImageFormat, VariantStatus)>, EncodeError>)> = files
        .par_iter()
        .map(|file| {
            let result = write_variants(file, formats, &opts, force);
            progress.inc("images");
            (file, result)
        })
        .collect();
    progress.finish();

    let mut summary = VariantSummary::default();
    for (file, result) in results {
        match result {
            Ok(statuses) => {
                debug!("variants"; "{}: {:?}", display(file, config), statuses);
                summary.record(&statuses);
            }
            Err(e) => summary.failed.push((file.clone(), e.to_string())),
        }
    }
    summary
}

fn report(summary: &VariantSummary, config: &PixConfig) -> Result<()> {
    let written = summary
        .written
        .iter()
        .map(|(f, n)| format!("{} {}", n, f))
        .collect::<Vec<_>>();
    let written = if written.is_empty() {
        "nothing to encode".to_string()
    } else {
        format!("wrote {}", written.join(", "))
    };
    status_success(&format!("{} ({} up to date)", written, summary.fresh));

    if summary.failed.is_empty() {
        return Ok(());
    }
    for (file, reason) in &summary.failed {
        status_error(&format!("failed: {}", display(file, config)), reason);
    }
    bail!("{} could not be encoded", plural_count(summary.failed.len(), "image"))
}

fn display(path: &Path, config: &PixConfig) -> String {
    config.root_relative(path).display().to_string()
}
