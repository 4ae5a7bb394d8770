//! The compositing stage: draws every packed frame onto a transparent
//! canvas and serializes the canvas as a PNG.

use std::{
    io::{self, BufReader, BufWriter},
    path::{Path, PathBuf},
};

use fs_err as fs;
use thiserror::Error;

use crate::{
    frame::FrameDescriptor,
    image::{DecodeError, Image},
};

/// Composes the atlas image at `atlas_path`.
///
/// Frames are drawn in ascending `index` order. The packer guarantees
/// placements never overlap, so this order only matters as a stable
/// tie-break if that invariant is ever violated upstream.
pub fn compose_atlas(
    frames: &[FrameDescriptor],
    canvas_size: (u32, u32),
    atlas_path: &Path,
) -> Result<(), CompositeError> {
    let mut order: Vec<&FrameDescriptor> = frames.iter().collect();
    order.sort_by_key(|frame| frame.index);

    let mut canvas = Image::new_empty_rgba8(canvas_size);

    for frame in order {
        let file = fs::File::open(&frame.working_path).map_err(|source| CompositeError::Io {
            path: frame.working_path.clone(),
            source,
        })?;

        let working =
            Image::decode_png(BufReader::new(file)).map_err(|source| CompositeError::Decode {
                path: frame.working_path.clone(),
                source,
            })?;

        let stamped = if frame.rotated {
            working.rotated90()
        } else {
            working
        };

        log::trace!(
            "Drawing frame {} at {:?} (rotated: {})",
            frame.name,
            frame.position,
            frame.rotated
        );

        canvas.blit(&stamped, frame.position);
    }

    let out = fs::File::create(atlas_path).map_err(|source| CompositeError::Io {
        path: atlas_path.to_owned(),
        source,
    })?;
    canvas
        .encode_png(BufWriter::new(out))
        .map_err(|source| CompositeError::Encode {
            path: atlas_path.to_owned(),
            source,
        })?;

    Ok(())
}

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("io error on {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't read working image {}: {}", path.display(), source)]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("couldn't encode atlas {}: {}", path.display(), source)]
    Encode {
        path: PathBuf,
        #[source]
        source: png::EncodingError,
    },
}
