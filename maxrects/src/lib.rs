//! Maxrects is a small library for packing rectangles onto a single
//! growing canvas. It was built for tilepack, a tool that packs sprite
//! frames into texture atlases, but it carries no image-specific logic.
//!
//! The packing strategy is a free-rectangle heuristic from the
//! "max-rects" family: placements are chosen by best-area-fit with a
//! best-short-side-fit tie break, consumed free rectangles are split by
//! the guillotine method, and the canvas doubles its smaller dimension
//! whenever an item fails to fit anywhere.
//!
//! ## Example
//! ```
//! use maxrects::{InputItem, MaxRectsPacker};
//!
//! // First, transform the rectangles you want to pack into the
//! // InputItem type.
//! let my_items = vec![
//!     InputItem::new((128, 64)),
//!     InputItem::new((64, 64)),
//!     InputItem::new((1, 300)),
//! ];
//!
//! // Construct a packer and configure it with your constraints.
//! let packer = MaxRectsPacker::new().rotatable(true);
//!
//! // Compute a solution. Use the ids on the output items to correlate
//! // placements back to your own objects.
//! let output = packer.pack(my_items);
//! assert!(output.size().0 > 0);
//! ```

mod geometry;
mod id;
mod packer;
mod types;

pub use id::*;
pub use packer::*;
pub use types::*;
