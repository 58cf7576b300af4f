use std::path::PathBuf;

use clap::Args;
use eyre::Result;
use trellis_manifest::Target;
use trellis_pipeline::PluginCatalog;

use super::Project;
use crate::{
    ops::{self, BuildOptions},
    reports::{Report, TerminalOutput},
};

#[derive(Args)]
pub struct BuildCommand {
    /// Path to trellis.toml (defaults to ./trellis.toml)
    #[arg(short, long, default_value = "trellis.toml")]
    pub config: PathBuf,

    /// Artifact directory (overrides project.out_dir)
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Target (overrides project.target)
    #[arg(short, long)]
    pub target: Option<Target>,

    /// Write a JSON snapshot of every unit after each stage to this directory
    #[arg(long)]
    pub snapshots: Option<PathBuf>,
}

impl BuildCommand {
    /// Run the build command
    pub fn run(&self) -> Result<()> {
        let project = Project::open(&self.config);
        let pipeline = project.pipeline(&PluginCatalog::builtin(), self.target);
        let out_dir = self
            .out_dir
            .clone()
            .unwrap_or_else(|| project.toml.out_dir());

        let report = ops::build(
            pipeline,
            &project.units,
            BuildOptions {
                out_dir: &out_dir,
                snapshots: self.snapshots.as_deref(),
            },
        )?;
        report.render(&mut TerminalOutput);

        if !report.is_success() {
            std::process::exit(1);
        }
        Ok(())
    }
}
