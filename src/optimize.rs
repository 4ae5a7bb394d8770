//! The optional optimize stage: hands the composed atlas to an external
//! re-encoder (webp, pngquant, and friends).
//!
//! External image tooling is treated as unreliable infrastructure; any
//! failure here is recoverable and the orchestrator falls back to
//! previously built artifacts where it can.

use std::{io, path::Path, process::Command};

use thiserror::Error;

use crate::config::OptimizeConfig;

/// Runs the configured command with `{input}`, `{output}` and
/// `{quality}` substituted into its arguments.
pub fn optimize_atlas(
    config: &OptimizeConfig,
    input: &Path,
    output: &Path,
) -> Result<(), OptimizeError> {
    let input_str = input.to_string_lossy();
    let output_str = output.to_string_lossy();
    let quality = config.quality.to_string();

    let args: Vec<String> = config
        .args
        .iter()
        .map(|arg| {
            arg.replace("{input}", &input_str)
                .replace("{output}", &output_str)
                .replace("{quality}", &quality)
        })
        .collect();

    log::debug!("Running optimizer: {} {}", config.command, args.join(" "));

    let result = Command::new(&config.command)
        .args(&args)
        .output()
        .map_err(|source| OptimizeError::Spawn {
            command: config.command.clone(),
            source,
        })?;

    if !result.status.success() {
        log::debug!(
            "Optimizer stderr: {}",
            String::from_utf8_lossy(&result.stderr)
        );

        return Err(OptimizeError::Failed {
            command: config.command.clone(),
            code: result.status.code(),
        });
    }

    Ok(())
}

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("couldn't run optimizer '{}': {} (is it installed and on PATH?)", command, source)]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("optimizer '{}' exited with status {:?}", command, code)]
    Failed { command: String, code: Option<i32> },
}
