//! Grid positions of world sections and the columns holding them.
//!
//! A [`Section`] is a 3D CubicChunks region (`x.y.z.3dr`), a cube of
//! [`Section::SIZE`] blocks. A [`Column`] is the vertical stack of sections
//! sharing the same horizontal footprint, and is what ground elevation is
//! sampled and cached for.

use std::fmt;

use serde::Serialize;

use crate::range::Range;

/// Blocks covered by cell `index` of a grid with `size`-block cells.
fn cell_range(index: i32, size: i64) -> Range {
    let lower = index as i64 * size;
    Range::point(lower).extend_up(size - 1).unwrap_or(Range::point(lower))
}

/// The horizontal position of a vertical column of 3D regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Column {
    x: i32,
    z: i32,
}

impl Column {
    /// Width of a column along X and Z, in blocks.
    pub const SIZE: i64 = 256;

    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    /// Blocks covered along the X axis.
    pub fn range_x(&self) -> Range {
        cell_range(self.x, Self::SIZE)
    }

    /// Blocks covered along the Z axis.
    pub fn range_z(&self) -> Range {
        cell_range(self.z, Self::SIZE)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.x, self.z)
    }
}

/// The position of a 3D region in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Section {
    x: i32,
    y: i32,
    z: i32,
}

impl Section {
    /// Edge length of a section, in blocks.
    pub const SIZE: i64 = 256;

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn z(&self) -> i32 {
        self.z
    }

    /// Blocks covered along the X axis.
    pub fn range_x(&self) -> Range {
        cell_range(self.x, Self::SIZE)
    }

    /// Blocks covered along the Y axis (height).
    pub fn range_y(&self) -> Range {
        cell_range(self.y, Self::SIZE)
    }

    /// Blocks covered along the Z axis.
    pub fn range_z(&self) -> Range {
        cell_range(self.z, Self::SIZE)
    }

    /// The column this section is part of.
    pub fn column(&self) -> Column {
        Column::new(self.x, self.z)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_section_ranges() {
        let section = Section::new(0, -1, 2);
        assert_eq!(section.range_x(), Range::new(0, 255).unwrap());
        assert_eq!(section.range_y(), Range::new(-256, -1).unwrap());
        assert_eq!(section.range_z(), Range::new(512, 767).unwrap());
    }

    #[test]
    fn test_column_ranges() {
        let column = Column::new(-1, 3);
        assert_eq!(column.range_x(), Range::new(-256, -1).unwrap());
        assert_eq!(column.range_z(), Range::new(768, 1023).unwrap());
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let section = Section::new(i32::MAX, i32::MIN, 0);
        assert_eq!(section.range_x().size(), Section::SIZE - 1);
        assert_eq!(section.range_y().lower_bound(), i32::MIN as i64 * 256);
    }

    #[test]
    fn test_sections_share_column() {
        let a = Section::new(11139, 0, -19726);
        let b = Section::new(11139, 50, -19726);
        assert_eq!(a.column(), b.column());
        assert_ne!(a.column(), Section::new(11140, 0, -19726).column());

        let set: HashSet<Column> = [a.column(), b.column()].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(Section::new(1, -2, 3).to_string(), "1.-2.3");
        assert_eq!(Column::new(1, 3).to_string(), "1.3");
    }
}
