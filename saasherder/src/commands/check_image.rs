use crate::context::AppContext;
use crate::format::OutputFormatter;
use libherder::{Result, Verifier, images_from_manifest, status_lines};
use std::future::Future;
use std::path::Path;
use tracing::warn;

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Handle the check-image subcommand
///
/// Prints one status line per image and returns true when every image was
/// found or skipped.
pub async fn handle_check_image<F>(
    ctx: &AppContext,
    formatter: &dyn OutputFormatter,
    manifest: &Path,
    pattern: Option<&str>,
    skopeo: bool,
    cancel: F,
) -> Result<bool>
where
    F: Future<Output = ()>,
{
    let images = images_from_manifest(manifest)?;
    let verifier = Verifier::new(ctx.verifier_config(pattern, skopeo)?)?;

    let pb = formatter.progress_bar(images.len() as u64, "Checking images");
    let report = verifier
        .verify_batch_with(images, cancel, |image, _| {
            pb.set_message(image.to_string());
            pb.inc(1);
        })
        .await;
    formatter.finish_progress(pb, "Checked images");

    for (image, outcome) in &report.results {
        for line in status_lines(image, outcome) {
            formatter.status(&line);
        }
    }
    if report.cancelled {
        formatter.warning("Interrupted, remaining images were not checked");
    }

    Ok(report.is_success())
}

#[cfg(test)]
#[path = "check_image_tests.rs"]
mod tests;
