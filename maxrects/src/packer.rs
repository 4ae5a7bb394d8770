use std::cmp::Reverse;

use crate::{
    geometry::Rect,
    types::{InputItem, OutputItem, PackOutput},
};

/// Packs rectangles onto a single canvas using a free-rectangle
/// best-area-fit heuristic, growing the canvas when items don't fit.
#[derive(Debug, Clone)]
pub struct MaxRectsPacker {
    min_size: (u32, u32),
    rotatable: bool,
    power_of_two: bool,
}

impl MaxRectsPacker {
    pub fn new() -> Self {
        Self {
            min_size: (128, 128),
            rotatable: false,
            power_of_two: false,
        }
    }

    /// The canvas size the packer starts from before any growth.
    pub fn min_size(mut self, min_size: (u32, u32)) -> Self {
        assert!(min_size.0 > 0 && min_size.1 > 0);
        self.min_size = min_size;
        self
    }

    /// Whether items may be placed rotated 90 degrees.
    pub fn rotatable(mut self, rotatable: bool) -> Self {
        self.rotatable = rotatable;
        self
    }

    /// Whether the finalized canvas size is rounded up per-axis to a
    /// power of two instead of the exact bounding box.
    pub fn power_of_two(mut self, power_of_two: bool) -> Self {
        self.power_of_two = power_of_two;
        self
    }

    pub fn pack<I: IntoIterator<Item = InputItem>>(&self, items: I) -> PackOutput {
        let mut items: Vec<_> = items.into_iter().collect();

        // Descending area. The sort is stable, so equal-area items keep
        // their insertion order, which makes repeated runs over the same
        // input produce identical placements.
        items.sort_by_key(|item| Reverse(item.area()));

        log::trace!("Packing {} items", items.len());

        if items.is_empty() {
            return PackOutput {
                size: (0, 0),
                items: Vec::new(),
            };
        }

        let mut canvas = self.min_size;

        let placed = loop {
            match self.try_pack(&items, canvas) {
                Some(placed) => break placed,
                None => {
                    // Double the smaller dimension and try again. Every
                    // retry strictly increases the canvas area, so a
                    // canvas admitting all items is eventually reached.
                    if canvas.0 <= canvas.1 {
                        canvas.0 *= 2;
                    } else {
                        canvas.1 *= 2;
                    }

                    log::trace!("Canvas too small, growing to {:?}", canvas);
                }
            }
        };

        let size = self.finalize_size(&placed);

        log::trace!("Finished packing {} items into {:?}", placed.len(), size);

        PackOutput {
            size,
            items: placed,
        }
    }

    fn try_pack(&self, items: &[InputItem], canvas: (u32, u32)) -> Option<Vec<OutputItem>> {
        let mut free = vec![Rect {
            pos: (0, 0),
            size: canvas,
        }];
        let mut placed = Vec::with_capacity(items.len());

        for item in items {
            let choice = self.best_placement(&free, item.size())?;

            let consumed = free.remove(choice.free_index);
            let rect = Rect {
                pos: consumed.pos,
                size: choice.size,
            };

            debug_assert!(
                placed
                    .iter()
                    .all(|other: &OutputItem| !other.rect.intersects(&rect)),
                "free rectangles admitted an overlapping placement"
            );

            log::trace!(
                "Placed item {:?} at {:?} (rotated: {})",
                item.id(),
                rect.pos,
                choice.rotated
            );

            split_guillotine(&mut free, consumed, choice.size);
            prune_contained(&mut free);

            placed.push(OutputItem {
                id: item.id(),
                rect,
                rotated: choice.rotated,
            });
        }

        Some(placed)
    }

    /// Evaluates every free rectangle (and both orientations of the item
    /// when rotation is enabled) and picks the placement leaving the
    /// least free area, breaking ties on the shorter leftover side and
    /// then on the lowest free-rect index.
    fn best_placement(&self, free: &[Rect], size: (u32, u32)) -> Option<Placement> {
        let mut best: Option<(Placement, (u32, u32))> = None;

        let mut orientations = vec![(size, false)];
        if self.rotatable && size.0 != size.1 {
            orientations.push(((size.1, size.0), true));
        }

        for (free_index, candidate) in free.iter().enumerate() {
            for &(oriented, rotated) in &orientations {
                if !candidate.admits(oriented) {
                    continue;
                }

                let leftover_area = candidate.area() - oriented.0 * oriented.1;
                let short_side = (candidate.size.0 - oriented.0).min(candidate.size.1 - oriented.1);
                let score = (leftover_area, short_side);

                let better = match &best {
                    Some((_, best_score)) => score < *best_score,
                    None => true,
                };

                if better {
                    best = Some((
                        Placement {
                            free_index,
                            size: oriented,
                            rotated,
                        },
                        score,
                    ));
                }
            }
        }

        best.map(|(placement, _)| placement)
    }

    fn finalize_size(&self, placed: &[OutputItem]) -> (u32, u32) {
        let mut size = (0, 0);
        for item in placed {
            let max = item.max();
            size.0 = size.0.max(max.0);
            size.1 = size.1.max(max.1);
        }

        if self.power_of_two {
            size = (size.0.next_power_of_two(), size.1.next_power_of_two());
        }

        size
    }
}

impl Default for MaxRectsPacker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct Placement {
    free_index: usize,
    size: (u32, u32),
    rotated: bool,
}

/// Splits the consumed free rectangle into its two guillotine
/// remainders: the strip right of the placed item (at the item's
/// height) and the strip below it (at the full width).
fn split_guillotine(free: &mut Vec<Rect>, consumed: Rect, placed: (u32, u32)) {
    let right = Rect {
        pos: (consumed.pos.0 + placed.0, consumed.pos.1),
        size: (consumed.size.0 - placed.0, placed.1),
    };
    let bottom = Rect {
        pos: (consumed.pos.0, consumed.pos.1 + placed.1),
        size: (consumed.size.0, consumed.size.1 - placed.1),
    };

    for remainder in &[right, bottom] {
        if remainder.size.0 > 0 && remainder.size.1 > 0 {
            free.push(*remainder);
        }
    }
}

/// Removes every free rectangle fully contained in another one.
fn prune_contained(free: &mut Vec<Rect>) {
    let mut index = 0;
    while index < free.len() {
        let rect = free[index];
        let redundant = free.iter().enumerate().any(|(other_index, other)| {
            // When two rects are identical, only the later one is
            // dropped.
            other_index != index
                && other.contains(&rect)
                && !(rect == *other && other_index > index)
        });

        if redundant {
            free.remove(index);
        } else {
            index += 1;
        }
    }
}
