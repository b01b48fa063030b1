//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use ignis_images::recipes::CustomImage;
use ignis_images::util::shell::ColorChoice;

/// ignis-images - Build, clear and push the container images of Ignis components
#[derive(Parser)]
#[command(name = "ignis-images")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Registry prefix of image names
    #[arg(long, global = true, env = "IGNIS_REGISTRY")]
    pub registry: Option<String>,

    /// Namespace of image names
    #[arg(long, global = true)]
    pub namespace: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build images from recipe sources
    Build(BuildArgs),

    /// Remove images
    Clear(ClearArgs),

    /// Push images to the registry
    Push(PushArgs),

    /// Show the status of a named container
    Status(StatusArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Git repositories with recipes
    #[arg(long, num_args = 1..)]
    pub sources: Vec<String>,

    /// Local directories with recipes
    #[arg(long, num_args = 1..)]
    pub local_sources: Vec<PathBuf>,

    /// Recipe folders to skip
    #[arg(long, num_args = 1..)]
    pub ignore: Vec<String>,

    /// Version of a source, as NAME=VERSION
    #[arg(long, value_name = "NAME=VERSION")]
    pub version_filter: Vec<String>,

    /// Extra image made of several components, as NAME=COMPONENT,...
    #[arg(long, value_name = "NAME=COMPONENTS")]
    pub custom_image: Vec<CustomImage>,

    /// Also build the base images
    #[arg(long)]
    pub bases: bool,

    /// Build an image with every component
    #[arg(long)]
    pub full: bool,

    /// Keep build logs of successful builds too
    #[arg(long)]
    pub logs: bool,

    /// Extra tags for every built image
    #[arg(long, num_args = 1..)]
    pub version_tags: Vec<String>,

    /// Version to build
    #[arg(long)]
    pub version: Option<String>,

    /// Target platform(s), requires buildx
    #[arg(long)]
    pub platform: Option<String>,

    /// Number of parallel builds
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Print the build plan and exit
    #[arg(long)]
    pub plan: bool,

    /// Print the build plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ClearArgs {
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Only images of this version
    #[arg(long)]
    pub version: Option<String>,

    /// Only these images
    #[arg(long, alias = "whitelist", num_args = 1..)]
    pub allow: Option<Vec<String>>,

    /// Never these images
    #[arg(long, alias = "blacklist", num_args = 1..)]
    pub deny: Vec<String>,

    /// Also remove untagged images
    #[arg(long)]
    pub none: bool,

    /// Force removal
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct PushArgs {
    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Also push builder images
    #[arg(long)]
    pub builders: bool,

    /// Only images of this version
    #[arg(long)]
    pub version: Option<String>,

    /// Only these images
    #[arg(long, alias = "whitelist", num_args = 1..)]
    pub allow: Option<Vec<String>>,

    /// Never these images
    #[arg(long, alias = "blacklist", num_args = 1..)]
    pub deny: Vec<String>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Container name
    pub name: String,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
