mod cache;
mod compose;
mod config;
mod frame;
mod frameset;
mod glob;
mod image;
mod optimize;
mod options;
mod pipeline;
mod preprocess;
mod spritesheet;

use std::{env, process};

use structopt::StructOpt;

use crate::{
    config::Config,
    options::{Options, Subcommand},
    pipeline::BuildSession,
};

fn main() {
    let options = Options::from_args();

    let log_filter = if options.global.verbose {
        "info,tilepack=debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter)).init();

    match run(options) {
        Ok(_) => {}
        Err(err) => {
            eprintln!("Error: {:?}", err);
            process::exit(1);
        }
    }
}

fn run(options: Options) -> anyhow::Result<()> {
    match options.command {
        Subcommand::Build(build_options) => {
            let fuzzy_config_path = match build_options.config_path {
                Some(path) => path,
                None => env::current_dir()?,
            };

            let mut config = Config::read_from_folder_or_file(&fuzzy_config_path)?;

            if let Some(output) = build_options.output {
                config.output = output;
            }

            let session = BuildSession::new(
                config,
                !build_options.no_process,
                !build_options.no_cache,
            );
            let output = session.run()?;

            println!("{}", output.image_path.display());
            println!("{}", output.document_path.display());
        }
    }

    Ok(())
}
