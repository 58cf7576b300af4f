use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use trellis_pipeline::PluginCatalog;

use super::Project;
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct ExplainCommand {
    /// Path to trellis.toml (defaults to ./trellis.toml)
    #[arg(short, long, default_value = "trellis.toml")]
    pub config: PathBuf,
}

impl ExplainCommand {
    pub fn run(&self) -> Result<()> {
        let project = Project::open(&self.config);
        let catalog = PluginCatalog::builtin();
        let pipeline = project.pipeline(&catalog, None);

        ops::explain(&pipeline, &project.toml, &catalog).render(&mut TerminalOutput);
        Ok(())
    }
}
