use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use trellis_pipeline::PluginCatalog;

use super::{Project, UnwrapOrExit};
use crate::{
    ops,
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct CheckCommand {
    /// Path to trellis.toml (defaults to ./trellis.toml)
    #[arg(short, long, default_value = "trellis.toml")]
    pub config: PathBuf,
}

impl CheckCommand {
    /// Run the check command
    pub fn run(&self) -> Result<()> {
        let project = Project::open(&self.config);
        let pipeline = project.pipeline(&PluginCatalog::builtin(), None);

        let report = ops::check(&pipeline, &project.units, &self.config).unwrap_or_exit();
        report.render(&mut TerminalOutput);

        if !report.is_valid() {
            std::process::exit(1);
        }
        Ok(())
    }
}
