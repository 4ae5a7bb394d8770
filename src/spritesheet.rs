//! The spritesheet document: the JSON artifact renderers consume to
//! look frames back up inside the atlas.
//!
//! `emit_document` is a pure function over the packed frame list. It
//! reverses the padding the preprocessor applied, so emitted rects
//! describe the trimmed artwork, not the padded working rectangle.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::frame::FrameDescriptor;

lazy_static! {
    /// Frames named `<base>_<digits>` belong to the `<base>` animation.
    static ref ANIMATION_FRAME: Regex = Regex::new(r"^(.*)_\d+$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteSheetDocument {
    pub meta: SheetMeta,
    pub frames: BTreeMap<String, SpriteFrame>,
    pub animations: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetMeta {
    pub image: String,
    pub size: SheetSize,
    pub scale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SheetSize {
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteFrame {
    pub frame: FrameRect,
    pub rotated: bool,
    pub trimmed: bool,

    #[serde(rename = "spriteSourceSize")]
    pub sprite_source_size: FrameRect,

    #[serde(rename = "sourceSize")]
    pub source_size: SheetSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Derives the document from packed frames.
///
/// Frames are visited in ascending `index` order; animation member
/// lists follow that processing order, not the numeric order of the
/// name suffixes. Sources supplied out of numeric order therefore emit
/// members out of numeric order, matching the behavior renderers
/// already depend on.
pub fn emit_document(
    frames: &[FrameDescriptor],
    canvas_size: (u32, u32),
    image_file_name: &str,
    padding: u32,
) -> SpriteSheetDocument {
    let mut order: Vec<&FrameDescriptor> = frames.iter().collect();
    order.sort_by_key(|frame| frame.index);

    let mut sheet_frames = BTreeMap::new();
    let mut animations: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for frame in order {
        // Undo the padding applied during preprocessing: the emitted
        // rect is the artwork itself. Dimensions stay logical
        // (unrotated) even for rotated frames.
        let x = frame.position.0 + padding;
        let y = frame.position.1 + padding;
        let w = frame.size.0 - padding * 2;
        let h = frame.size.1 - padding * 2;

        let (sprite_source_size, source_size) = match frame.trim {
            Some(trim) => (
                FrameRect {
                    x: trim.x,
                    y: trim.y,
                    w,
                    h,
                },
                SheetSize {
                    w: trim.width,
                    h: trim.height,
                },
            ),
            None => (FrameRect { x: 0, y: 0, w, h }, SheetSize { w, h }),
        };

        let key = frame.name.output_key();

        sheet_frames.insert(
            key.clone(),
            SpriteFrame {
                frame: FrameRect { x, y, w, h },
                rotated: frame.rotated,
                trimmed: frame.trimmed,
                sprite_source_size,
                source_size,
            },
        );

        if let Some(captures) = ANIMATION_FRAME.captures(frame.name.as_ref()) {
            let base = captures.get(1).unwrap().as_str().to_owned();
            animations.entry(base).or_insert_with(Vec::new).push(key);
        }
    }

    SpriteSheetDocument {
        meta: SheetMeta {
            image: image_file_name.to_owned(),
            size: SheetSize {
                w: canvas_size.0,
                h: canvas_size.1,
            },
            scale: "1".to_owned(),
        },
        frames: sheet_frames,
        animations,
    }
}
