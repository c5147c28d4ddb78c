//! `genie read`: read one output.

use anyhow::Context;
use genie_core::{OutputRef, OutputStore};

use super::{Outcome, render};
use crate::config::ReadArgs;

pub async fn run(store: &dyn OutputStore, args: ReadArgs) -> anyhow::Result<Outcome> {
    let output = OutputRef::from_legacy_path(args.output);
    let data = store
        .read(&output)
        .await
        .with_context(|| format!("failed to read {output}"))?;

    println!("{}", render(&data, args.csv)?.trim_end());
    Ok(Outcome::Complete)
}
