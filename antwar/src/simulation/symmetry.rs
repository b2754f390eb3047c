// Mirrored layouts for painting and colony placement.
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymmetryMode {
    #[default]
    None,
    MirrorVertical,
    MirrorHorizontal,
    MirrorBoth,
    Center,
}

impl SymmetryMode {
    /// `horizontal` flips x, `vertical` flips y.
    pub fn from_mirrors(horizontal: bool, vertical: bool) -> Self {
        match (horizontal, vertical) {
            (true, true) => SymmetryMode::MirrorBoth,
            (true, false) => SymmetryMode::MirrorHorizontal,
            (false, true) => SymmetryMode::MirrorVertical,
            (false, false) => SymmetryMode::None,
        }
    }

    /// Number of positions in one symmetric group, the source position included.
    pub fn fold(&self) -> usize {
        match self {
            SymmetryMode::None => 1,
            SymmetryMode::MirrorVertical | SymmetryMode::MirrorHorizontal | SymmetryMode::Center => 2,
            SymmetryMode::MirrorBoth => 4,
        }
    }

    /// The `k`-th member of the group spanned by `pos`, reflected inside `extent`.
    /// `k == 0` is `pos` itself.
    pub fn reflection(&self, pos: Vec2, extent: Vec2, k: usize) -> Vec2 {
        let flip_x = Vec2::new(extent.x - pos.x, pos.y);
        let flip_y = Vec2::new(pos.x, extent.y - pos.y);
        let flip_both = extent - pos;
        match (self, k % self.fold()) {
            (_, 0) => pos,
            (SymmetryMode::MirrorHorizontal, _) => flip_x,
            (SymmetryMode::MirrorVertical, _) => flip_y,
            (SymmetryMode::Center, _) => flip_both,
            (SymmetryMode::MirrorBoth, 1) => flip_x,
            (SymmetryMode::MirrorBoth, 2) => flip_y,
            _ => flip_both,
        }
    }

    /// Calculates symmetric positions, duplicates removed (a point on a mirror line maps onto itself).
    pub fn symmetric_positions(&self, pos: Vec2, extent: Vec2) -> Vec<Vec2> {
        let mut positions: Vec<Vec2> = Vec::with_capacity(self.fold());
        for k in 0..self.fold() {
            let candidate = self.reflection(pos, extent, k);
            if !positions
                .iter()
                .any(|p| (p.x - candidate.x).abs() < 0.01 && (p.y - candidate.y).abs() < 0.01)
            {
                positions.push(candidate);
            }
        }
        positions
    }
}
