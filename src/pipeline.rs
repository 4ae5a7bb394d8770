//! The build orchestrator.
//!
//! A `BuildSession` runs one atlas build end to end: cache check, then
//! preprocess, pack, composite, optimize, and emit. Composite and
//! optimize failures are recoverable: the session falls back to the
//! previous build's artifacts when they exist instead of failing the
//! caller. Decode, packing, and output I/O failures are hard errors.
//! Cache trouble is never fatal; it just forces a rebuild.

use std::{
    collections::HashMap,
    io,
    path::PathBuf,
};

use fs_err as fs;
use maxrects::{InputItem, MaxRectsPacker};
use thiserror::Error;

use crate::{
    cache::{self, CacheRecord},
    compose::{self, CompositeError},
    config::Config,
    frame::FrameDescriptor,
    frameset::{FrameSet, FrameSetError},
    optimize::{self, OptimizeError},
    preprocess::{self, PreprocessError},
    spritesheet,
};

/// What a build hands back to the host: where the artifacts live and
/// whether this invocation produced them.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub image_path: PathBuf,
    pub document_path: PathBuf,

    /// False when artifacts were reused from the cache, the fallback
    /// path, or a processing-disabled run.
    pub fresh: bool,
}

/// All of the state for a single build of one atlas.
pub struct BuildSession {
    config: Config,
    process: bool,
    cache_enabled: bool,
}

impl BuildSession {
    pub fn new(config: Config, process: bool, cache_enabled: bool) -> Self {
        Self {
            config,
            process,
            cache_enabled,
        }
    }

    pub fn run(self) -> Result<BuildOutput, BuildError> {
        let output_dir = self.config.output_dir();
        fs::create_dir_all(&output_dir).map_err(|source| BuildError::Io {
            path: output_dir.clone(),
            source,
        })?;

        if !self.process {
            log::warn!(
                "Image processing is disabled; reusing {} and {} from the last build",
                self.image_file_name(),
                self.document_file_name()
            );
            return self.reuse_existing_artifacts();
        }

        let frame_set = FrameSet::discover(&self.config)?;

        // A fingerprinting failure is just a forced miss.
        let fingerprint = match cache::fingerprint(&self.config, &frame_set) {
            Ok(fingerprint) => Some(fingerprint),
            Err(err) => {
                log::warn!("Cache fingerprinting failed, rebuilding: {}", err);
                None
            }
        };

        if self.cache_enabled {
            if let Some(output) = self.check_cache(fingerprint.as_deref()) {
                return Ok(output);
            }
        }

        match self.build(&frame_set) {
            Ok(output) => {
                if let Some(fingerprint) = fingerprint {
                    let record = CacheRecord {
                        fingerprint,
                        image: self.image_file_name(),
                        document: self.document_file_name(),
                    };

                    if let Err(err) = record.write_to_folder(&output_dir, &self.config.name) {
                        log::warn!("Couldn't save cache record: {}", err);
                    }
                }

                Ok(output)
            }
            Err(err) if err.is_recoverable() => {
                log::error!("Image processing failed: {}", err);
                self.reuse_existing_artifacts()
            }
            Err(err) => Err(err),
        }
    }

    /// Checks whether the previous build's record matches the current
    /// fingerprint and its artifacts are still on disk.
    fn check_cache(&self, fingerprint: Option<&str>) -> Option<BuildOutput> {
        let fingerprint = fingerprint?;
        let output_dir = self.config.output_dir();

        let record = match CacheRecord::read_from_folder(&output_dir, &self.config.name) {
            Ok(record) => record?,
            Err(err) => {
                log::warn!("Couldn't read cache record, rebuilding: {}", err);
                return None;
            }
        };

        if record.fingerprint != fingerprint {
            log::debug!("Cache miss: inputs changed since the last build");
            return None;
        }

        let image_path = output_dir.join(&record.image);
        let document_path = output_dir.join(&record.document);

        if !image_path.is_file() || !document_path.is_file() {
            log::debug!("Cache miss: recorded artifacts are gone");
            return None;
        }

        log::info!("Cache hit; skipping rebuild of '{}'", self.config.name);

        Some(BuildOutput {
            image_path,
            document_path,
            fresh: false,
        })
    }

    /// The full pipeline on a cache miss: preprocess, pack, composite,
    /// optimize, emit.
    fn build(&self, frame_set: &FrameSet) -> Result<BuildOutput, BuildError> {
        let output_dir = self.config.output_dir();

        // Scoped working directory; removed on every exit path.
        let temp = tempfile::tempdir().map_err(|source| BuildError::Io {
            path: std::env::temp_dir(),
            source,
        })?;

        let mut frames: Vec<FrameDescriptor> = frame_set
            .sources
            .iter()
            .map(|source| {
                FrameDescriptor::new(source.name.clone(), source.path.clone(), source.trim)
            })
            .collect();

        preprocess::preprocess_frames(&mut frames, &self.config, temp.path())?;

        // Items are created in frame order, so the packer's tie-break
        // on equal areas preserves the loader's ordering.
        let mut id_to_frame = HashMap::new();
        let items: Vec<InputItem> = frames
            .iter()
            .enumerate()
            .map(|(frame_index, frame)| {
                let item = InputItem::new(frame.size);
                id_to_frame.insert(item.id(), frame_index);
                item
            })
            .collect();

        let packer = MaxRectsPacker::new()
            .rotatable(self.config.rotatable)
            .power_of_two(self.config.power_of_two);
        let packed = packer.pack(items);

        for (placement_index, item) in packed.items().iter().enumerate() {
            let frame = &mut frames[id_to_frame[&item.id()]];
            frame.position = item.position();
            frame.rotated = item.rotated();
            frame.index = placement_index;
        }

        let canvas_size = packed.size();
        log::info!(
            "Packed {} frames onto a {}x{} canvas",
            frames.len(),
            canvas_size.0,
            canvas_size.1
        );

        let atlas_path = temp.path().join(format!("{}.png", self.config.name));
        compose::compose_atlas(&frames, canvas_size, &atlas_path)?;

        let image_file_name = self.image_file_name();
        let image_path = output_dir.join(&image_file_name);

        match &self.config.optimize {
            Some(optimize_config) => {
                optimize::optimize_atlas(optimize_config, &atlas_path, &image_path)?;
            }
            None => {
                fs::copy(&atlas_path, &image_path).map_err(|source| BuildError::Io {
                    path: image_path.clone(),
                    source,
                })?;
            }
        }

        let document = spritesheet::emit_document(
            &frames,
            canvas_size,
            &image_file_name,
            self.config.padding,
        );
        let serialized =
            serde_json::to_vec_pretty(&document).map_err(|source| BuildError::Document { source })?;

        let document_path = output_dir.join(self.document_file_name());
        fs::write(&document_path, serialized).map_err(|source| BuildError::Io {
            path: document_path.clone(),
            source,
        })?;

        if let Err(err) = temp.close() {
            log::warn!("Couldn't clean up working directory: {}", err);
        }

        Ok(BuildOutput {
            image_path,
            document_path,
            fresh: true,
        })
    }

    /// The fallback path: reuse whatever a previous build left at the
    /// output location, or fail with a remediation hint.
    fn reuse_existing_artifacts(&self) -> Result<BuildOutput, BuildError> {
        let output_dir = self.config.output_dir();
        let image_path = output_dir.join(self.image_file_name());
        let document_path = output_dir.join(self.document_file_name());

        if image_path.is_file() && document_path.is_file() {
            log::warn!(
                "Reusing previously built {} and {}",
                image_path.display(),
                document_path.display()
            );

            Ok(BuildOutput {
                image_path,
                document_path,
                fresh: false,
            })
        } else {
            Err(BuildError::MissingArtifacts {
                image: image_path,
                document: document_path,
            })
        }
    }

    fn image_file_name(&self) -> String {
        let extension = match &self.config.optimize {
            Some(optimize_config) => optimize_config.extension.as_str(),
            None => "png",
        };

        format!("{}.{}", self.config.name, extension)
    }

    fn document_file_name(&self) -> String {
        format!("{}.json", self.config.name)
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    FrameSet(#[from] FrameSetError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Composite(#[from] CompositeError),

    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    #[error("couldn't serialize spritesheet document: {source}")]
    Document {
        #[source]
        source: serde_json::Error,
    },

    #[error("io error on {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(
        "missing previously built artifacts {} and {}; ensure the last build's \
         outputs are present at the configured output location, or re-run with \
         image processing enabled",
        image.display(),
        document.display()
    )]
    MissingArtifacts { image: PathBuf, document: PathBuf },
}

impl BuildError {
    /// Whether the orchestrator may satisfy the build from previously
    /// built artifacts instead of failing. Only failures of external
    /// image tooling qualify; bad source data and output I/O failures
    /// never do.
    fn is_recoverable(&self) -> bool {
        match self {
            BuildError::Composite(_) | BuildError::Optimize(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io::BufWriter;
    use std::path::Path;

    use crate::image::{Image, Pixel};
    use crate::spritesheet::SpriteSheetDocument;

    fn write_png(dir: &Path, name: &str, size: (u32, u32), border: u32, value: u8) {
        let mut image = Image::new_empty_rgba8(size);
        for y in border..size.1 - border {
            for x in border..size.0 - border {
                image.set_pixel((x, y), Pixel::new(value, value, value, 255));
            }
        }

        let file = std::fs::File::create(dir.join(format!("{}.png", name))).unwrap();
        image.encode_png(BufWriter::new(file)).unwrap();
    }

    fn project(config: &str, frames: &[(&str, (u32, u32), u32)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let frames_dir = dir.path().join("frames");
        std::fs::create_dir_all(&frames_dir).unwrap();

        for (index, (name, size, border)) in frames.iter().enumerate() {
            write_png(&frames_dir, name, *size, *border, 50 + index as u8);
        }

        std::fs::write(dir.path().join("tilepack.toml"), config).unwrap();
        dir
    }

    fn run(dir: &Path, process: bool, cache: bool) -> Result<BuildOutput, BuildError> {
        let config = Config::read_from_folder(dir).unwrap();
        BuildSession::new(config, process, cache).run()
    }

    static BASIC_CONFIG: &str = r#"
        name = "sprites"
        padding = 1
        output = "dist"

        [[frames]]
        glob = "frames/*.png"
    "#;

    fn basic_frames() -> Vec<(&'static str, (u32, u32), u32)> {
        vec![
            ("walk_0", (16, 16), 0),
            ("walk_1", (16, 16), 0),
            ("walk_2", (16, 16), 0),
            ("idle_0", (16, 16), 4),
        ]
    }

    #[test]
    fn full_build_produces_atlas_and_document() {
        let dir = project(BASIC_CONFIG, &basic_frames());

        let output = run(dir.path(), true, true).unwrap();
        assert!(output.fresh);

        let atlas =
            Image::decode_png(std::fs::File::open(&output.image_path).unwrap()).unwrap();
        let document: SpriteSheetDocument =
            serde_json::from_slice(&std::fs::read(&output.document_path).unwrap()).unwrap();

        assert_eq!(document.meta.image, "sprites.png");
        assert_eq!((document.meta.size.w, document.meta.size.h), atlas.size());
        assert_eq!(document.frames.len(), 4);
        assert_eq!(
            document.animations["walk"],
            vec!["walk_0.png", "walk_1.png", "walk_2.png"]
        );
        assert_eq!(document.animations["idle"], vec!["idle_0.png"]);

        // The canvas never shrinks below what the frames logically
        // cover.
        let source_area: u32 = document
            .frames
            .values()
            .map(|sprite| sprite.source_size.w * sprite.source_size.h)
            .sum();
        assert!(source_area <= document.meta.size.w * document.meta.size.h);

        // idle_0 has a 4px transparent border around an 8x8 core.
        let idle = &document.frames["idle_0.png"];
        assert!(idle.trimmed);
        assert_eq!((idle.source_size.w, idle.source_size.h), (16, 16));
        assert_eq!(
            (
                idle.sprite_source_size.x,
                idle.sprite_source_size.y,
                idle.sprite_source_size.w,
                idle.sprite_source_size.h
            ),
            (4, 4, 8, 8)
        );
    }

    #[test]
    fn second_run_is_a_cache_hit() {
        let dir = project(BASIC_CONFIG, &basic_frames());

        let first = run(dir.path(), true, true).unwrap();
        assert!(first.fresh);
        let first_document = std::fs::read(&first.document_path).unwrap();

        let second = run(dir.path(), true, true).unwrap();
        assert!(!second.fresh);
        assert_eq!(std::fs::read(&second.document_path).unwrap(), first_document);
    }

    #[test]
    fn changed_artwork_misses_the_cache() {
        let dir = project(BASIC_CONFIG, &basic_frames());

        run(dir.path(), true, true).unwrap();
        write_png(&dir.path().join("frames"), "walk_1", (16, 16), 2, 200);

        let rebuilt = run(dir.path(), true, true).unwrap();
        assert!(rebuilt.fresh);
    }

    #[test]
    fn disabled_cache_always_rebuilds() {
        let dir = project(BASIC_CONFIG, &basic_frames());

        assert!(run(dir.path(), true, false).unwrap().fresh);
        assert!(run(dir.path(), true, false).unwrap().fresh);
    }

    #[test]
    fn no_process_reuses_artifacts_or_fails() {
        let dir = project(BASIC_CONFIG, &basic_frames());

        // Nothing has been built yet.
        match run(dir.path(), false, true).unwrap_err() {
            BuildError::MissingArtifacts { .. } => {}
            other => panic!("unexpected error: {}", other),
        }

        run(dir.path(), true, true).unwrap();

        let reused = run(dir.path(), false, true).unwrap();
        assert!(!reused.fresh);
    }

    #[test]
    fn only_image_tooling_failures_are_recoverable() {
        let composite = BuildError::Composite(CompositeError::Io {
            path: PathBuf::from("atlas.png"),
            source: io::Error::new(io::ErrorKind::Other, "disk trouble"),
        });
        let optimize = BuildError::Optimize(OptimizeError::Failed {
            command: "cwebp".to_owned(),
            code: Some(1),
        });
        assert!(composite.is_recoverable());
        assert!(optimize.is_recoverable());

        let preprocess = BuildError::Preprocess(PreprocessError::BadDimensions {
            name: crate::frame::FrameName::new("walk_0"),
            size: (0, 0),
            max: 4096,
        });
        let output_io = BuildError::Io {
            path: PathBuf::from("sprites.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        };
        let missing = BuildError::MissingArtifacts {
            image: PathBuf::from("sprites.png"),
            document: PathBuf::from("sprites.json"),
        };
        assert!(!preprocess.is_recoverable());
        assert!(!output_io.is_recoverable());
        assert!(!missing.is_recoverable());
    }

    #[test]
    fn composite_failure_settles_on_previous_artifacts() {
        let dir = project(BASIC_CONFIG, &basic_frames());
        let first = run(dir.path(), true, true).unwrap();

        // A compositing failure on a later build is recoverable, and
        // the session settles on the artifacts already at the output
        // location.
        let err = BuildError::Composite(CompositeError::Encode {
            path: PathBuf::from("sprites.png"),
            source: png::EncodingError::IoError(io::Error::new(
                io::ErrorKind::Other,
                "encoder exploded",
            )),
        });
        assert!(err.is_recoverable());

        let config = Config::read_from_folder(dir.path()).unwrap();
        let session = BuildSession::new(config, true, true);
        let output = session.reuse_existing_artifacts().unwrap();

        assert!(!output.fresh);
        assert_eq!(output.image_path, first.image_path);
        assert_eq!(output.document_path, first.document_path);
    }

    #[test]
    fn optimizer_failure_falls_back_to_previous_artifacts() {
        let config = r#"
            name = "sprites"
            output = "dist"

            [[frames]]
            glob = "frames/*.png"

            [optimize]
            command = "tilepack-test-no-such-binary"
            args = ["{input}", "{output}"]
        "#;

        let dir = project(config, &basic_frames());

        // No previous build: the fallback has nothing to offer.
        match run(dir.path(), true, true).unwrap_err() {
            BuildError::MissingArtifacts { .. } => {}
            other => panic!("unexpected error: {}", other),
        }

        // With artifacts from a previous build present, the same
        // failure becomes a warning and the build settles on them.
        let dist = dir.path().join("dist");
        std::fs::write(dist.join("sprites.png"), b"old atlas").unwrap();
        std::fs::write(dist.join("sprites.json"), b"{}").unwrap();

        let output = run(dir.path(), true, true).unwrap();
        assert!(!output.fresh);
        assert_eq!(std::fs::read(&output.image_path).unwrap(), b"old atlas");
    }

    #[test]
    fn corrupt_source_is_fatal_even_with_prior_artifacts() {
        let dir = project(BASIC_CONFIG, &basic_frames());

        run(dir.path(), true, true).unwrap();
        std::fs::write(dir.path().join("frames/walk_0.png"), b"garbage").unwrap();

        match run(dir.path(), true, true).unwrap_err() {
            BuildError::Preprocess(PreprocessError::Decode { .. }) => {}
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn rotation_survives_the_whole_pipeline() {
        let config = r#"
            name = "sprites"
            rotatable = true

            [[frames]]
            glob = "frames/*.png"
        "#;

        let dir = project(
            config,
            &[("base_0", (30, 30), 0), ("spin_0", (10, 30), 0)],
        );

        let output = run(dir.path(), true, true).unwrap();
        let document: SpriteSheetDocument =
            serde_json::from_slice(&std::fs::read(&output.document_path).unwrap()).unwrap();

        let spin = &document.frames["spin_0.png"];
        // Logical dimensions survive rotation.
        assert_eq!((spin.frame.w, spin.frame.h), (10, 30));
    }
}
