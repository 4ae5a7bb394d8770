//! The frame preprocessing stage: trim detection and padding.
//!
//! For every frame this decodes the source image, finds the bounding
//! box of its non-transparent pixels, and materializes a padded working
//! image in the build's temp directory with the artwork re-anchored at
//! `(padding, padding)`. The descriptor's size becomes the working
//! image's size; the emitter reverses the padding at the end of the
//! pipeline.

use std::{
    io::{self, BufReader, BufWriter},
    path::{Path, PathBuf},
};

use fs_err as fs;
use indicatif::ProgressBar;
use thiserror::Error;

use crate::{
    config::Config,
    frame::{FrameDescriptor, FrameName, TrimBox},
    image::{DecodeError, Image},
};

pub fn preprocess_frames(
    frames: &mut [FrameDescriptor],
    config: &Config,
    work_dir: &Path,
) -> Result<(), PreprocessError> {
    let progress = ProgressBar::new(frames.len() as u64);

    for frame in frames.iter_mut() {
        preprocess_frame(frame, config, work_dir)?;
        progress.inc(1);
    }

    progress.finish_and_clear();

    Ok(())
}

fn preprocess_frame(
    frame: &mut FrameDescriptor,
    config: &Config,
    work_dir: &Path,
) -> Result<(), PreprocessError> {
    let file = fs::File::open(&frame.source_path).map_err(|source| PreprocessError::Io {
        path: frame.source_path.clone(),
        source,
    })?;

    let source = Image::decode_png(BufReader::new(file)).map_err(|source| {
        PreprocessError::Decode {
            name: frame.name.clone(),
            path: frame.source_path.clone(),
            source,
        }
    })?;

    let source_size = source.size();

    // The smallest box around the artwork. A fully transparent frame
    // has no such box; it stays untrimmed at its full source size so
    // consumers still see the authored dimensions.
    let bounds = if frame.trim_enabled {
        source.opaque_bounds()
    } else {
        None
    };

    let artwork = match bounds {
        Some((x, y, w, h)) if (w, h) != source_size => {
            frame.trimmed = true;
            frame.trim = Some(TrimBox {
                x,
                y,
                width: source_size.0,
                height: source_size.1,
            });

            log::trace!(
                "Trimmed frame {} from {:?} to {}x{} at ({}, {})",
                frame.name,
                source_size,
                w,
                h,
                x,
                y
            );

            source.crop((x, y), (w, h))
        }
        _ => {
            frame.trimmed = false;
            frame.trim = None;
            source
        }
    };

    let padding = config.padding;
    let art_size = artwork.size();

    // Config validation bounds the padding, but the arithmetic stays
    // checked so a config constructed another way can't overflow past
    // the max-frame-size check.
    let padded = padding
        .checked_mul(2)
        .and_then(|total| {
            Some((
                art_size.0.checked_add(total)?,
                art_size.1.checked_add(total)?,
            ))
        })
        .filter(|&(w, h)| {
            w > 0 && h > 0 && w <= config.max_frame_size && h <= config.max_frame_size
        })
        .ok_or_else(|| PreprocessError::BadDimensions {
            name: frame.name.clone(),
            size: (
                art_size.0.saturating_add(padding.saturating_mul(2)),
                art_size.1.saturating_add(padding.saturating_mul(2)),
            ),
            max: config.max_frame_size,
        })?;

    let mut working = Image::new_empty_rgba8(padded);
    working.blit(&artwork, (padding, padding));

    let working_path = work_dir.join(format!("{}.png", frame.name));
    let out = fs::File::create(&working_path).map_err(|source| PreprocessError::Io {
        path: working_path.clone(),
        source,
    })?;
    working
        .encode_png(BufWriter::new(out))
        .map_err(|source| PreprocessError::Encode {
            path: working_path.clone(),
            source,
        })?;

    frame.size = padded;
    frame.working_path = working_path;

    Ok(())
}

#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("frame '{}' ({}) could not be decoded: {}", name, path.display(), source)]
    Decode {
        name: FrameName,
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error(
        "frame '{}' has unusable padded dimensions {}x{} (limit {})",
        name,
        size.0,
        size.1,
        max
    )]
    BadDimensions {
        name: FrameName,
        size: (u32, u32),
        max: u32,
    },

    #[error("io error on {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't encode working image {}: {}", path.display(), source)]
    Encode {
        path: PathBuf,
        #[source]
        source: png::EncodingError,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::image::Pixel;

    fn test_config(padding: u32, max_frame_size: u32) -> Config {
        Config {
            name: "sprites".to_owned(),
            padding,
            rotatable: false,
            power_of_two: false,
            algorithm: crate::config::PACK_ALGORITHM.to_owned(),
            max_frame_size,
            output: PathBuf::from("."),
            frames: Vec::new(),
            optimize: None,
            file_path: PathBuf::new(),
        }
    }

    fn write_bordered_png(dir: &Path, name: &str, size: (u32, u32), border: u32) -> PathBuf {
        let mut image = Image::new_empty_rgba8(size);
        for y in border..size.1 - border {
            for x in border..size.0 - border {
                image.set_pixel((x, y), Pixel::new(200, 100, 50, 255));
            }
        }

        let path = dir.join(format!("{}.png", name));
        let file = std::fs::File::create(&path).unwrap();
        image.encode_png(BufWriter::new(file)).unwrap();

        path
    }

    fn descriptor(name: &str, path: PathBuf, trim: bool) -> FrameDescriptor {
        FrameDescriptor::new(FrameName::new(name), path, trim)
    }

    #[test]
    fn transparent_border_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bordered_png(dir.path(), "walk_0", (64, 64), 16);

        let mut frames = vec![descriptor("walk_0", path, true)];
        preprocess_frames(&mut frames, &test_config(2, 4096), dir.path()).unwrap();

        let frame = &frames[0];
        assert!(frame.trimmed);
        assert_eq!(
            frame.trim,
            Some(TrimBox {
                x: 16,
                y: 16,
                width: 64,
                height: 64,
            })
        );
        assert_eq!(frame.size, (36, 36));

        let working =
            Image::decode_png(std::fs::File::open(&frame.working_path).unwrap()).unwrap();
        assert_eq!(working.size(), (36, 36));
        // Artwork re-anchored at (padding, padding).
        assert_eq!(working.get_pixel((2, 2)).a, 255);
        assert_eq!(working.get_pixel((1, 1)).a, 0);
    }

    #[test]
    fn solid_frame_is_not_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bordered_png(dir.path(), "idle_0", (10, 10), 0);

        let mut frames = vec![descriptor("idle_0", path, true)];
        preprocess_frames(&mut frames, &test_config(1, 4096), dir.path()).unwrap();

        let frame = &frames[0];
        assert!(!frame.trimmed);
        assert_eq!(frame.trim, None);
        assert_eq!(frame.size, (12, 12));
    }

    #[test]
    fn fully_transparent_frame_stays_untrimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ghost_0.png");
        let file = std::fs::File::create(&path).unwrap();
        Image::new_empty_rgba8((20, 12))
            .encode_png(BufWriter::new(file))
            .unwrap();

        let mut frames = vec![descriptor("ghost_0", path, true)];
        preprocess_frames(&mut frames, &test_config(0, 4096), dir.path()).unwrap();

        assert!(!frames[0].trimmed);
        assert_eq!(frames[0].size, (20, 12));
    }

    #[test]
    fn trim_can_be_disabled_per_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bordered_png(dir.path(), "walk_0", (64, 64), 16);

        let mut frames = vec![descriptor("walk_0", path, false)];
        preprocess_frames(&mut frames, &test_config(0, 4096), dir.path()).unwrap();

        assert!(!frames[0].trimmed);
        assert_eq!(frames[0].size, (64, 64));
    }

    #[test]
    fn corrupt_source_fails_with_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"this is not a png").unwrap();

        let mut frames = vec![descriptor("broken", path, true)];
        let err = preprocess_frames(&mut frames, &test_config(0, 4096), dir.path()).unwrap_err();

        match err {
            PreprocessError::Decode { name, .. } => assert_eq!(name.to_string(), "broken"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn overflowing_padding_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bordered_png(dir.path(), "walk_0", (10, 10), 0);

        // Parse-time validation normally bounds the padding; a config
        // built directly must still come out as BadDimensions rather
        // than overflowing.
        let mut frames = vec![descriptor("walk_0", path, true)];
        let err = preprocess_frames(&mut frames, &test_config(3_000_000_000, 4096), dir.path())
            .unwrap_err();

        match err {
            PreprocessError::BadDimensions { name, .. } => {
                assert_eq!(name.to_string(), "walk_0")
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_bordered_png(dir.path(), "huge", (10, 10), 0);

        let mut frames = vec![descriptor("huge", path, true)];
        let err = preprocess_frames(&mut frames, &test_config(0, 8), dir.path()).unwrap_err();

        match err {
            PreprocessError::BadDimensions { size, .. } => assert_eq!(size, (10, 10)),
            other => panic!("unexpected error: {}", other),
        }
    }
}
