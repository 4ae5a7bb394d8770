use std::{
    io,
    path::{Path, PathBuf},
};

use fs_err as fs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::glob::Glob;

static CONFIG_FILENAME: &str = "tilepack.toml";

/// The only packing strategy tilepack supports.
pub static PACK_ALGORITHM: &str = "max-rects";

/// Configuration for one atlas build, contained in a tilepack.toml
/// file.
///
/// Every option a sub-stage can receive is enumerated here and checked
/// when the file is read, so a typo'd key fails the build up front
/// instead of being silently ignored at the stage that would have
/// consumed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    /// The base name of the output artifacts: `<name>.png` (or the
    /// optimizer's extension) and `<name>.json`.
    pub name: String,

    /// Pixels of transparent padding added around every frame before
    /// packing and subtracted back out of the emitted rects.
    #[serde(default)]
    pub padding: u32,

    /// Whether the packer may rotate frames 90 degrees.
    #[serde(default)]
    pub rotatable: bool,

    /// Whether the atlas canvas is rounded up per-axis to a power of
    /// two instead of the exact bounding box of the packed frames.
    #[serde(default)]
    pub power_of_two: bool,

    /// The packing strategy. Exactly one value is accepted; the field
    /// exists so configs state their expectation explicitly.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// Sanity bound on a single padded frame's dimensions.
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: u32,

    /// Where artifacts are written, relative to the folder containing
    /// this file.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// The sources frames are gathered from.
    #[serde(default)]
    pub frames: Vec<FrameSourceConfig>,

    /// If present, the external tool the composed atlas is re-encoded
    /// with on its way to the output folder.
    #[serde(default)]
    pub optimize: Option<OptimizeConfig>,

    /// The path that this config came from. Paths from this config
    /// should be relative to the folder containing this file.
    #[serde(skip)]
    pub file_path: PathBuf,
}

impl Config {
    pub fn read_from_folder_or_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        if meta.is_file() {
            Self::read_from_file(path)
        } else {
            Self::read_from_folder(path)
        }
    }

    pub fn read_from_folder<P: AsRef<Path>>(folder_path: P) -> Result<Self, ConfigError> {
        let folder_path = folder_path.as_ref();
        let file_path = &folder_path.join(CONFIG_FILENAME);

        Self::read_from_file(file_path)
    }

    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        let mut config: Self =
            toml::from_slice(&contents).map_err(|source| ConfigError::Toml {
                path: path.to_owned(),
                source,
            })?;
        config.file_path = path.to_owned();

        config.validate()?;

        Ok(config)
    }

    /// The path that paths in this Config should be considered relative
    /// to.
    pub fn folder(&self) -> &Path {
        self.file_path.parent().unwrap()
    }

    /// The resolved folder that final artifacts are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.folder().join(&self.output)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::Invalid {
            path: self.file_path.clone(),
            message,
        };

        if self.algorithm != PACK_ALGORITHM {
            return Err(invalid(format!(
                "unsupported packing algorithm '{}'; the only supported algorithm is '{}'",
                self.algorithm, PACK_ALGORITHM
            )));
        }

        if self.max_frame_size == 0 {
            return Err(invalid("max-frame-size must be nonzero".to_owned()));
        }

        if self.padding > self.max_frame_size / 2 {
            return Err(invalid(format!(
                "padding {} is too large for max-frame-size {}",
                self.padding, self.max_frame_size
            )));
        }

        for source in &self.frames {
            match (&source.glob, &source.path) {
                (Some(_), Some(_)) => {
                    return Err(invalid(
                        "a frame source cannot name both 'glob' and 'path'".to_owned(),
                    ));
                }
                (None, None) => {
                    return Err(invalid(
                        "a frame source must name either 'glob' or 'path'".to_owned(),
                    ));
                }
                (Some(_), None) if source.name.is_some() => {
                    return Err(invalid(
                        "'name' can only be given for a 'path' frame source".to_owned(),
                    ));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

fn default_algorithm() -> String {
    PACK_ALGORITHM.to_owned()
}

fn default_max_frame_size() -> u32 {
    4096
}

fn default_output() -> PathBuf {
    PathBuf::from(".")
}

/// One entry in the `frames` list: either a glob expanded against the
/// config folder or a single explicit file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FrameSourceConfig {
    #[serde(default)]
    pub glob: Option<Glob>,

    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Overrides the logical frame name for a `path` source. Glob
    /// sources always name frames after their file stem.
    #[serde(default)]
    pub name: Option<String>,

    /// Whether transparent borders are trimmed off this source's
    /// frames before packing.
    #[serde(default = "default_true")]
    pub trim: bool,
}

fn default_true() -> bool {
    true
}

/// External re-encode step applied to the composed atlas. The command
/// is run with `{input}`, `{output}` and `{quality}` placeholders
/// substituted into its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct OptimizeConfig {
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default = "default_quality")]
    pub quality: u32,

    /// Extension of the re-encoded artifact, e.g. `webp`.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_quality() -> u32 {
    90
}

fn default_extension() -> String {
    "png".to_owned()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} in {}", source, path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{} in {}", source, path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} in {}", message, path.display())]
    Invalid { path: PathBuf, message: String },
}

impl ConfigError {
    /// Tells whether this ConfigError originated because of a path not
    /// existing.
    pub fn is_not_found(&self) -> bool {
        match self {
            ConfigError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
