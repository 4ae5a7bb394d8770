use crate::{geometry::Rect, id::Id};

/// An input to the packing routine.
///
/// `InputItem` is just a 2D size and a maxrects-generated unique
/// identifier. It's expected that consumers will assign meaning to the
/// given ids and then use them to associate the packing results back to
/// the application's own objects.
#[derive(Debug, Clone, Copy)]
pub struct InputItem {
    pub(crate) id: Id,
    pub(crate) size: (u32, u32),
}

impl InputItem {
    #[inline]
    pub fn new(size: (u32, u32)) -> Self {
        Self {
            id: Id::new(),
            size,
        }
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    pub(crate) fn area(&self) -> u32 {
        self.size.0 * self.size.1
    }
}

/// An item that was placed by the packing routine.
///
/// `OutputItem` corresponds 1:1 to the `InputItem` objects that were
/// passed into the packer. When `rotated` is set, `size` is the placed
/// footprint on the canvas: the input's dimensions swapped.
#[derive(Debug, Clone, Copy)]
pub struct OutputItem {
    pub(crate) id: Id,
    pub(crate) rect: Rect,
    pub(crate) rotated: bool,
}

impl OutputItem {
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    #[inline]
    pub fn position(&self) -> (u32, u32) {
        self.rect.pos
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.rect.size
    }

    #[inline]
    pub fn max(&self) -> (u32, u32) {
        self.rect.max()
    }

    /// Whether the packer placed this item rotated 90 degrees.
    #[inline]
    pub fn rotated(&self) -> bool {
        self.rotated
    }
}

/// The results from running the packer.
///
/// Items appear in placement order, which consumers may use as a stable
/// drawing order.
#[derive(Debug, Clone)]
pub struct PackOutput {
    pub(crate) size: (u32, u32),
    pub(crate) items: Vec<OutputItem>,
}

impl PackOutput {
    /// The finalized canvas size enclosing every placed item.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    #[inline]
    pub fn items(&self) -> &[OutputItem] {
        &self.items
    }
}
