mod build;
mod check;
mod completions;
mod explain;

use std::path::Path;

use build::BuildCommand;
use check::CheckCommand;
use clap::{Parser, Subcommand};
use completions::CompletionsCommand;
use eyre::Result;
use explain::ExplainCommand;
use trellis_manifest::{Target, TrellisToml};
use trellis_pipeline::{ConfigError, Pipeline, PluginCatalog, RegistryBuilder};
use trellis_syntax::SyntaxTree;

/// Extension trait for exiting on input and configuration errors with
/// pretty formatting
pub(crate) trait UnwrapOrExit<T> {
    fn unwrap_or_exit(self) -> T;
}

impl<T> UnwrapOrExit<T> for trellis_manifest::Result<T> {
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(*e));
                std::process::exit(1);
            }
        }
    }
}

impl<T> UnwrapOrExit<T> for trellis_syntax::Result<T> {
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(*e));
                std::process::exit(1);
            }
        }
    }
}

impl<T> UnwrapOrExit<T> for std::result::Result<T, ConfigError> {
    fn unwrap_or_exit(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{:?}", miette::Report::new(e));
                std::process::exit(1);
            }
        }
    }
}

/// A manifest and its parsed units.
pub(crate) struct Project {
    pub toml: TrellisToml,
    pub units: Vec<SyntaxTree>,
}

impl Project {
    /// Open the manifest at `config` and parse every unit it lists.
    ///
    /// Exits when two units end up with the same name.
    pub fn open(config: &Path) -> Self {
        let toml = TrellisToml::open(config).unwrap_or_exit();
        let units = toml
            .unit_paths()
            .iter()
            .map(trellis_syntax::parse_file)
            .collect::<trellis_syntax::Result<Vec<_>>>()
            .unwrap_or_exit();
        Pipeline::validate_units(&units).unwrap_or_exit();
        Self { toml, units }
    }

    /// Discover the manifest's plugins, optionally overriding its target.
    pub fn pipeline(&self, catalog: &PluginCatalog, target: Option<Target>) -> Pipeline {
        let manifest = self.toml.manifest();
        let registry = RegistryBuilder::discover(manifest, catalog)
            .unwrap_or_exit()
            .build();
        Pipeline::new(registry, target.unwrap_or(manifest.project.target)).unwrap_or_exit()
    }
}

#[derive(Parser)]
#[command(name = "trellis")]
#[command(version)]
#[command(about = "Compile Trellis units through a plugin-extensible pipeline")]
pub(crate) struct Cli {
    /// Log pipeline progress (overridden by TRELLIS_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Check(cmd) => cmd.run(),
            Commands::Build(cmd) => cmd.run(),
            Commands::Explain(cmd) => cmd.run(),
            Commands::Completions(cmd) => cmd.run(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every unit without generating artifacts
    Check(CheckCommand),

    /// Compile every unit and write artifacts
    Build(BuildCommand),

    /// Show registered extensions and the lowering order
    Explain(ExplainCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}
