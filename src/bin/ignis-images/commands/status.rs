//! `ignis-images status` command

use anyhow::Result;

use crate::cli::StatusArgs;
use ignis_images::ops::container_status;
use ignis_images::runtime::DockerCli;

pub fn execute(args: StatusArgs) -> Result<()> {
    let runtime = DockerCli::new();
    println!("{}", container_status(&runtime, &args.name)?);
    Ok(())
}
