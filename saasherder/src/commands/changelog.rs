use crate::context::AppContext;
use libherder::{Changelog, Format, Result, ServicesDir, SystemGit};
use std::path::PathBuf;

/// Handle the changelog subcommand, returning the rendered report
pub async fn handle_changelog(
    ctx: &AppContext,
    old: &str,
    new: &str,
    format: &str,
    workspace: Option<PathBuf>,
) -> Result<String> {
    let format: Format = format.parse()?;
    let source = ServicesDir::new(ctx.config.clone(), &ctx.root);

    let mut changelog = Changelog::new(SystemGit::default(), source, &ctx.root);
    if let Some(workspace) = workspace {
        changelog = changelog.with_workspace(workspace);
    }

    changelog
        .generate(ctx.context.as_deref(), old, new, format)
        .await
}
