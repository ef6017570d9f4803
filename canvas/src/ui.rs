//! Layout rectangles in whole pixels.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_size(w: u32, h: u32) -> Self {
        Self::new(0, 0, w, h)
    }

    /// Square of `side` pixels at column `col`, row `row` of a grid whose cells are `pitch`
    /// pixels apart. A `side` smaller than `pitch` leaves a gap after each cell.
    pub fn grid_cell(col: u32, row: u32, pitch: u32, side: u32) -> Self {
        Self::new(col.saturating_mul(pitch), row.saturating_mul(pitch), side, side)
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    /// Half-open: the right and bottom edges are outside.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        (self.x..self.right()).contains(&px) && (self.y..self.bottom()).contains(&py)
    }

    /// Inner content area. Oversized insets collapse the result to zero width/height.
    pub fn inset(&self, insets: Insets) -> Self {
        Self {
            x: self.x.saturating_add(insets.left),
            y: self.y.saturating_add(insets.top),
            w: self.w.saturating_sub(insets.left.saturating_add(insets.right)),
            h: self.h.saturating_sub(insets.top.saturating_add(insets.bottom)),
        }
    }

    /// Two equal columns separated by `gap`; any odd pixel goes to neither.
    pub fn split_columns(&self, gap: u32) -> (Self, Self) {
        let w = self.w.saturating_sub(gap) / 2;
        let left = Self::new(self.x, self.y, w, self.h);
        let right = Self::new(self.right().saturating_sub(w), self.y, w, self.h);
        (left, right)
    }

    /// A `h`-pixel band of the same width starting `gap` pixels below this rect.
    pub fn below(&self, gap: u32, h: u32) -> Self {
        Self::new(self.x, self.bottom().saturating_add(gap), self.w, h)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Insets {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Insets {
    pub const fn all(v: u32) -> Self {
        Self {
            left: v,
            top: v,
            right: v,
            bottom: v,
        }
    }
}
