//! Apply, create and update commands

use std::path::Path;

use console::style;
use keel_core::{Input, ResourceKind};

use super::{ClusterArgs, Session, describe, report, with_kind};
use crate::error::Result;

/// Write operation requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Create, falling back to update when the object exists
    Apply,
    Create,
    Update,
}

impl Mode {
    fn verb(self) -> &'static str {
        match self {
            Mode::Apply => "applied",
            Mode::Create => "created",
            Mode::Update => "updated",
        }
    }
}

/// Run apply, create or update for the object in `file`
pub async fn run(args: &ClusterArgs, mode: Mode, kind: &str, file: &Path) -> Result<()> {
    let session = Session::connect(args).await?;

    with_kind!(kind, |K| {
        let handler = session.handler::<K>();
        println!(
            "{} Writing {} from {}",
            style("→").blue().bold(),
            K::INFO.kind,
            style(file.display()).dim()
        );

        let input = Input::<K>::from(file);
        let written = match mode {
            Mode::Apply => handler.apply(input).await?,
            Mode::Create => handler.create(input).await?,
            Mode::Update => handler.update(input).await?,
        };

        let mut verb = mode.verb().to_string();
        if session.dry_run() {
            verb.push_str(" (dry run)");
        }
        report(&verb, &describe(&written));
        Ok(())
    })
}
