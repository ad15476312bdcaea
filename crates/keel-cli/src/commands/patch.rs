//! Patch command

use std::path::Path;

use console::style;
use keel_core::{Input, ResourceKind};
use keel_kube::PatchStrategy;

use super::{ClusterArgs, PatchType, Session, describe, report, with_kind};
use crate::error::Result;

/// Fetch `name`, then patch it with the payload in `file`
pub async fn run(
    args: &ClusterArgs,
    kind: &str,
    name: &str,
    file: &Path,
    patch_type: PatchType,
) -> Result<()> {
    let session = Session::connect(args).await?;
    let strategy = PatchStrategy::from(patch_type);

    with_kind!(kind, |K| {
        let handler = session.handler::<K>();
        let original: K = handler.get(name).await?;

        println!(
            "{} Patching {} with {} patch from {}",
            style("→").blue().bold(),
            describe(&original),
            strategy,
            style(file.display()).dim()
        );

        let operation = handler
            .plan_patch(&original, Input::from(file), strategy)
            .await?;
        if operation.is_noop()? {
            println!("{} No changes", style("✓").green().bold());
            return Ok(());
        }

        let patched = handler.submit_patch(&original, &operation).await?;
        let verb = if session.dry_run() { "patched (dry run)" } else { "patched" };
        report(verb, &describe(&patched));
        Ok(())
    })
}
