//! Delete command

use console::style;
use keel_core::ResourceKind;

use super::{ClusterArgs, Session, report, with_kind};
use crate::error::Result;

pub async fn run(args: &ClusterArgs, kind: &str, name: &str) -> Result<()> {
    let session = Session::connect(args).await?;

    with_kind!(kind, |K| {
        let handler = session.handler::<K>();
        let namespace = K::INFO.namespaced.then(|| handler.namespace().to_string());
        println!(
            "{} Deleting {}/{}",
            style("→").blue().bold(),
            K::INFO.kind,
            style(name).cyan()
        );

        handler.delete(name).await?;

        let label = match namespace {
            Some(ns) => format!("{}/{} in {}", K::INFO.kind, name, ns),
            None => format!("{}/{}", K::INFO.kind, name),
        };
        let verb = if session.dry_run() { "deleted (dry run)" } else { "deleted" };
        report(verb, &label);
        Ok(())
    })
}
