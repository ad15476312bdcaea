//! Get command

use keel_core::ResourceKind;

use super::{ClusterArgs, OutputFormat, Session, render, with_kind};
use crate::error::Result;

pub async fn run(args: &ClusterArgs, kind: &str, name: &str, output: OutputFormat) -> Result<()> {
    let session = Session::connect(args).await?;

    with_kind!(kind, |K| {
        let resource: K = session.handler::<K>().get(name).await?;
        print!("{}", render(&resource, output)?);
        if output == OutputFormat::Json {
            println!();
        }
        Ok(())
    })
}
