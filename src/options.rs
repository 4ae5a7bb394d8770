use std::path::PathBuf;

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(about = "A tool that packs sprite frames into texture atlases")]
pub struct Options {
    #[structopt(flatten)]
    pub global: GlobalOptions,

    #[structopt(subcommand)]
    pub command: Subcommand,
}

#[derive(Debug, StructOpt)]
pub struct GlobalOptions {
    /// Log image tooling failures and pipeline progress in detail.
    #[structopt(long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, StructOpt)]
pub enum Subcommand {
    /// Build the atlas and spritesheet document described by a
    /// tilepack.toml config.
    Build(BuildOptions),
}

#[derive(Debug, StructOpt)]
pub struct BuildOptions {
    /// The path to a tilepack.toml file, or to a folder containing one.
    /// Defaults to the current working directory.
    pub config_path: Option<PathBuf>,

    /// Overrides the output folder from the config.
    #[structopt(long)]
    pub output: Option<PathBuf>,

    /// Skip image processing entirely and reuse the artifacts a
    /// previous build left in the output folder.
    #[structopt(long)]
    pub no_process: bool,

    /// Ignore the cache record and rebuild even when inputs are
    /// unchanged.
    #[structopt(long)]
    pub no_cache: bool,
}
