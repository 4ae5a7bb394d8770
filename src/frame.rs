use std::{fmt, path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};

/// The logical name of a frame inside an atlas.
///
/// This is really just a string, but by making it have an explicit type
/// with known conversions, we can avoid some kinds of error mixing up
/// frame names with file names or paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameName(Arc<str>);

impl FrameName {
    pub fn new<S: Into<Arc<str>>>(name: S) -> Self {
        FrameName(name.into())
    }

    /// The key this frame is stored under in the emitted spritesheet
    /// document.
    pub fn output_key(&self) -> String {
        format!("{}.png", self.0)
    }
}

impl AsRef<str> for FrameName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameName {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Where the artwork of a trimmed frame sat inside its source image.
///
/// `x` and `y` are the offset of the artwork's bounding box; `width`
/// and `height` are the dimensions of the original, untrimmed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// All of the state tracked for one frame over the course of a single
/// build.
///
/// A descriptor is created by the frameset loader, filled in by the
/// preprocessing and packing stages, and consumed by the compositor and
/// the document emitter. It is owned by exactly one build and never
/// outlives it.
#[derive(Debug, Clone)]
pub struct FrameDescriptor {
    pub name: FrameName,
    pub source_path: PathBuf,

    /// Whether trim detection should run for this frame at all. Comes
    /// from the frame-source configuration.
    pub trim_enabled: bool,

    /// The frame's working size: artwork bounding box plus padding on
    /// every side. Set during preprocessing.
    pub size: (u32, u32),

    pub trimmed: bool,
    pub trim: Option<TrimBox>,

    /// Path of the padded working image inside the build's temp
    /// directory. Set during preprocessing.
    pub working_path: PathBuf,

    /// Set by the packer.
    pub position: (u32, u32),
    pub rotated: bool,

    /// Assignment order in the final atlas; doubles as the drawing
    /// order for the compositor.
    pub index: usize,
}

impl FrameDescriptor {
    pub fn new(name: FrameName, source_path: PathBuf, trim_enabled: bool) -> Self {
        Self {
            name,
            source_path,
            trim_enabled,
            size: (0, 0),
            trimmed: false,
            trim: None,
            working_path: PathBuf::new(),
            position: (0, 0),
            rotated: false,
            index: 0,
        }
    }
}
