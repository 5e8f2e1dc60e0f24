use crate::config::Config;
use crate::loader::{load_schema, open_session};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct RoundtripArgs {
    /// XML file to read
    pub file: PathBuf,

    /// JSON docSpec (overrides config)
    #[arg(short, long)]
    pub spec: Option<PathBuf>,
}

/// Print the canonical serialization of a document
pub fn roundtrip(args: RoundtripArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let schema = load_schema(config.spec_path(cwd, args.spec.as_ref()).as_deref())?;
    let mut session = open_session(&args.file, schema, config.editor)?;
    println!("{}", session.to_xml());
    Ok(())
}
