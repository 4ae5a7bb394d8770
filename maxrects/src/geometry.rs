#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rect {
    pub pos: (u32, u32),
    pub size: (u32, u32),
}

impl Rect {
    pub fn area(&self) -> u32 {
        self.size.0 * self.size.1
    }

    pub fn max(&self) -> (u32, u32) {
        (self.pos.0 + self.size.0, self.pos.1 + self.size.1)
    }

    /// Tells whether an item of the given size fits inside this rect.
    pub fn admits(&self, size: (u32, u32)) -> bool {
        size.0 <= self.size.0 && size.1 <= self.size.1
    }

    /// Tells whether `other` lies entirely inside this rect.
    pub fn contains(&self, other: &Rect) -> bool {
        self.pos.0 <= other.pos.0
            && self.pos.1 <= other.pos.1
            && self.max().0 >= other.max().0
            && self.max().1 >= other.max().1
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.pos.0 < other.max().0
            && other.pos.0 < self.max().0
            && self.pos.1 < other.max().1
            && other.pos.1 < self.max().1
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rect(pos: (u32, u32), size: (u32, u32)) -> Rect {
        Rect { pos, size }
    }

    #[test]
    fn contains_self_and_inner() {
        let outer = rect((0, 0), (10, 10));
        assert!(outer.contains(&outer));
        assert!(outer.contains(&rect((2, 3), (4, 5))));
        assert!(!outer.contains(&rect((8, 8), (4, 4))));
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let left = rect((0, 0), (5, 5));
        let right = rect((5, 0), (5, 5));
        assert!(!left.intersects(&right));
        assert!(left.intersects(&rect((4, 4), (5, 5))));
    }
}
