//! Turns the `frames` section of a config into a normalized, ordered
//! list of frame sources ready for preprocessing.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use thiserror::Error;
use walkdir::WalkDir;

use crate::{config::Config, frame::FrameName};

/// One normalized frame source: a logical name, the file backing it,
/// and its per-frame options.
#[derive(Debug, Clone)]
pub struct FrameSource {
    pub name: FrameName,
    pub path: PathBuf,
    pub trim: bool,
}

#[derive(Debug, Clone)]
pub struct FrameSet {
    pub sources: Vec<FrameSource>,
}

impl FrameSet {
    /// Expands every frame-source entry of the config, in config order.
    /// Glob matches are sorted by path so the resulting frame order is
    /// stable across runs and filesystems.
    pub fn discover(config: &Config) -> Result<Self, FrameSetError> {
        let folder = config.folder();
        let mut sources = Vec::new();
        let mut seen: HashMap<FrameName, PathBuf> = HashMap::new();

        for source_config in &config.frames {
            if let Some(glob) = &source_config.glob {
                let base_path = folder.join(glob.get_prefix());
                log::trace!(
                    "Searching for frames in '{}' matching '{}'",
                    base_path.display(),
                    glob,
                );

                let mut matched: Vec<PathBuf> = WalkDir::new(&base_path)
                    .into_iter()
                    .filter_map(Result::ok)
                    .filter(|entry| entry.file_type().is_file())
                    .map(|entry| entry.into_path())
                    .filter(|path| {
                        let match_path = path.strip_prefix(folder).unwrap_or(path);
                        is_png(path) && glob.is_match(match_path)
                    })
                    .collect();
                matched.sort();

                for path in matched {
                    let name = name_from_stem(&path)?;
                    push_source(
                        &mut sources,
                        &mut seen,
                        FrameSource {
                            name,
                            path,
                            trim: source_config.trim,
                        },
                    )?;
                }
            } else if let Some(path) = &source_config.path {
                let path = folder.join(path);

                if !path.is_file() {
                    return Err(FrameSetError::MissingFile { path });
                }

                let name = match &source_config.name {
                    Some(name) => FrameName::new(name.as_str()),
                    None => name_from_stem(&path)?,
                };

                push_source(
                    &mut sources,
                    &mut seen,
                    FrameSource {
                        name,
                        path,
                        trim: source_config.trim,
                    },
                )?;
            }
        }

        if sources.is_empty() {
            return Err(FrameSetError::NoFrames);
        }

        log::debug!("Discovered {} frames", sources.len());

        Ok(FrameSet { sources })
    }
}

fn push_source(
    sources: &mut Vec<FrameSource>,
    seen: &mut HashMap<FrameName, PathBuf>,
    source: FrameSource,
) -> Result<(), FrameSetError> {
    if let Some(existing) = seen.insert(source.name.clone(), source.path.clone()) {
        return Err(FrameSetError::DuplicateName {
            name: source.name,
            first: existing,
            second: source.path,
        });
    }

    log::trace!("Found frame {} at {}", source.name, source.path.display());
    sources.push(source);

    Ok(())
}

fn name_from_stem(path: &Path) -> Result<FrameName, FrameSetError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(FrameName::new)
        .ok_or_else(|| FrameSetError::UnusableName {
            path: path.to_owned(),
        })
}

fn is_png(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => true,
        _ => false,
    }
}

#[derive(Debug, Error)]
pub enum FrameSetError {
    #[error("no frames matched the configured frame sources")]
    NoFrames,

    #[error(
        "frame name '{}' is claimed by both {} and {}",
        name,
        first.display(),
        second.display()
    )]
    DuplicateName {
        name: FrameName,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("frame source file {} does not exist", path.display())]
    MissingFile { path: PathBuf },

    #[error("cannot derive a frame name from {}", path.display())]
    UnusableName { path: PathBuf },
}

#[cfg(test)]
mod test {
    use super::*;

    use std::fs;

    fn config_with(contents: &str, files: &[&str]) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();

        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"not actually a png").unwrap();
        }

        fs::write(dir.path().join("tilepack.toml"), contents).unwrap();
        let config = Config::read_from_folder(dir.path()).unwrap();

        (dir, config)
    }

    #[test]
    fn glob_matches_sorted_by_path() {
        let (_dir, config) = config_with(
            r#"
                name = "sprites"

                [[frames]]
                glob = "frames/*.png"
            "#,
            &["frames/walk_1.png", "frames/walk_0.png", "frames/ignore.txt"],
        );

        let frame_set = FrameSet::discover(&config).unwrap();
        let names: Vec<_> = frame_set
            .sources
            .iter()
            .map(|source| source.name.to_string())
            .collect();

        assert_eq!(names, vec!["walk_0", "walk_1"]);
    }

    #[test]
    fn explicit_path_can_rename() {
        let (_dir, config) = config_with(
            r#"
                name = "sprites"

                [[frames]]
                path = "art/explosion-final-v2.png"
                name = "boom_0"
                trim = false
            "#,
            &["art/explosion-final-v2.png"],
        );

        let frame_set = FrameSet::discover(&config).unwrap();

        assert_eq!(frame_set.sources[0].name.to_string(), "boom_0");
        assert!(!frame_set.sources[0].trim);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let (_dir, config) = config_with(
            r#"
                name = "sprites"

                [[frames]]
                glob = "a/*.png"

                [[frames]]
                glob = "b/*.png"
            "#,
            &["a/walk_0.png", "b/walk_0.png"],
        );

        match FrameSet::discover(&config).unwrap_err() {
            FrameSetError::DuplicateName { name, .. } => {
                assert_eq!(name.to_string(), "walk_0");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn empty_set_is_an_error() {
        let (_dir, config) = config_with(
            r#"
                name = "sprites"

                [[frames]]
                glob = "frames/*.png"
            "#,
            &[],
        );

        match FrameSet::discover(&config).unwrap_err() {
            FrameSetError::NoFrames => {}
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let (_dir, config) = config_with(
            r#"
                name = "sprites"

                [[frames]]
                path = "art/boom.png"
            "#,
            &[],
        );

        match FrameSet::discover(&config).unwrap_err() {
            FrameSetError::MissingFile { .. } => {}
            other => panic!("unexpected error: {}", other),
        }
    }
}
