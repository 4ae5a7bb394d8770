//! Cache validation: decides whether a build can be skipped entirely.
//!
//! The fingerprint covers every frame's name, source path, and content
//! hash, plus the serialized config, so any change to artwork or
//! packing options forces a rebuild. The record is committed only after
//! a fully successful build; a crash mid-build leaves the previous
//! record untouched.

use std::{
    io,
    path::{Path, PathBuf},
};

use fs_err as fs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{config::Config, frameset::FrameSet};

/// What the last successful build looked like. Lives next to the
/// output artifacts as `<name>.cache.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheRecord {
    /// Hex-encoded blake3 fingerprint of the inputs.
    pub fingerprint: String,

    /// File name of the atlas image written by that build.
    pub image: String,

    /// File name of the spritesheet document written by that build.
    pub document: String,
}

impl CacheRecord {
    pub fn read_from_folder<P: AsRef<Path>>(
        folder_path: P,
        name: &str,
    ) -> Result<Option<Self>, CacheError> {
        let file_path = &folder_path.as_ref().join(record_file_name(name));

        let contents = match fs::read(file_path) {
            Ok(contents) => contents,
            Err(ref err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(None);
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: file_path.clone(),
                    source,
                });
            }
        };

        let record = toml::from_slice(&contents).map_err(|source| CacheError::DeserializeToml {
            path: file_path.clone(),
            source,
        })?;

        Ok(Some(record))
    }

    pub fn write_to_folder<P: AsRef<Path>>(
        &self,
        folder_path: P,
        name: &str,
    ) -> Result<(), CacheError> {
        let file_path = &folder_path.as_ref().join(record_file_name(name));

        let serialized = toml::to_vec(self).map_err(CacheError::SerializeToml)?;
        fs::write(file_path, serialized).map_err(|source| CacheError::Io {
            path: file_path.clone(),
            source,
        })?;

        log::trace!("Saved cache record to {}", file_path.display());

        Ok(())
    }
}

fn record_file_name(name: &str) -> String {
    format!("{}.cache.toml", name)
}

/// Computes the build fingerprint over the frame set and config.
pub fn fingerprint(config: &Config, frame_set: &FrameSet) -> Result<String, CacheError> {
    let mut hasher = blake3::Hasher::new();

    let serialized_config =
        toml::to_string(config).map_err(CacheError::SerializeToml)?;
    hasher.update(serialized_config.as_bytes());

    for source in &frame_set.sources {
        let contents = fs::read(&source.path).map_err(|io_source| CacheError::Io {
            path: source.path.clone(),
            source: io_source,
        })?;

        hasher.update(source.name.as_ref().as_bytes());
        hasher.update(source.path.to_string_lossy().as_bytes());
        hasher.update(blake3::hash(&contents).as_bytes());
    }

    Ok(hasher.finalize().to_hex().to_string())
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{} in {}", source, path.display())]
    DeserializeToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("couldn't serialize cache data: {0}")]
    SerializeToml(#[source] toml::ser::Error),

    #[error("io error on {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
