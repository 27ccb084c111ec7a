//! 2×2 pixel-expansion blocks.
//!
//! Both canonical patterns have exactly two black cells on a diagonal, so a
//! block seen alone is 50% gray whatever bit it carries.

use super::BinaryImage;

/// One of the two canonical 2×2 expansion patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    /// `[[1,0],[0,1]]`: black on the main diagonal
    P0,
    /// `[[0,1],[1,0]]`: black on the anti-diagonal
    P1,
}

impl Block {
    /// Pick a pattern from one random bit
    pub fn from_bit(bit: bool) -> Self {
        if bit { Block::P1 } else { Block::P0 }
    }

    /// The other pattern (bitwise complement of this one)
    pub fn complement(self) -> Self {
        match self {
            Block::P0 => Block::P1,
            Block::P1 => Block::P0,
        }
    }

    /// Cell values, row-major, black = `true`
    pub fn cells(self) -> [[bool; 2]; 2] {
        match self {
            Block::P0 => [[true, false], [false, true]],
            Block::P1 => [[false, true], [true, false]],
        }
    }

    /// Write this pattern into `image` at block coordinates (bx, by)
    pub fn write(self, image: &mut BinaryImage, bx: usize, by: usize) {
        let cells = self.cells();
        for (dy, row) in cells.iter().enumerate() {
            for (dx, &black) in row.iter().enumerate() {
                image.set(bx * 2 + dx, by * 2 + dy, black);
            }
        }
    }

    /// Read the pattern stored at block coordinates (bx, by), if it is canonical
    pub fn read(image: &BinaryImage, bx: usize, by: usize) -> Option<Self> {
        let cells = [
            [image.get(bx * 2, by * 2), image.get(bx * 2 + 1, by * 2)],
            [image.get(bx * 2, by * 2 + 1), image.get(bx * 2 + 1, by * 2 + 1)],
        ];
        [Block::P0, Block::P1].into_iter().find(|b| b.cells() == cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_are_half_black() {
        for block in [Block::P0, Block::P1] {
            let black = block.cells().iter().flatten().filter(|&&c| c).count();
            assert_eq!(black, 2);
        }
    }

    #[test]
    fn test_complement_flips_every_cell() {
        let a = Block::P0.cells();
        let b = Block::P0.complement().cells();
        for y in 0..2 {
            for x in 0..2 {
                assert_ne!(a[y][x], b[y][x]);
            }
        }
    }

    #[test]
    fn test_write_then_read() {
        let mut image = BinaryImage::new(4, 4);
        Block::P1.write(&mut image, 1, 0);
        Block::P0.write(&mut image, 0, 1);
        assert_eq!(Block::read(&image, 1, 0), Some(Block::P1));
        assert_eq!(Block::read(&image, 0, 1), Some(Block::P0));
        // untouched block is all white, not a canonical pattern
        assert_eq!(Block::read(&image, 0, 0), None);
    }
}
