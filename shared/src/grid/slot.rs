use gridvault_serde::{BitReader, BitWrite, Serde, SerdeErr, SignedVariableInteger, UnsignedVariableInteger};

/// Half-open rectangle `[x, x + width) × [y, y + height)`, origin top-left
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Slot {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Same size, different origin
    pub fn moved_to(&self, x: i32, y: i32) -> Self {
        Self::new(x, y, self.width, self.height)
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains_cell(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Whether the rectangle is non-empty and lies within a `width × height` grid
    pub fn fits_within(&self, width: i32, height: i32) -> bool {
        self.width >= 1
            && self.height >= 1
            && self.x >= 0
            && self.y >= 0
            && self.right() <= width
            && self.bottom() <= height
    }

    /// Row-major ordering key, top row first
    pub fn reading_order(&self) -> (i32, i32) {
        (self.y, self.x)
    }
}

impl Serde for Slot {
    fn ser(&self, writer: &mut dyn BitWrite) {
        SignedVariableInteger::<7>::new(self.x).ser(writer);
        SignedVariableInteger::<7>::new(self.y).ser(writer);
        UnsignedVariableInteger::<4>::new(self.width.max(0)).ser(writer);
        UnsignedVariableInteger::<4>::new(self.height.max(0)).ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let x = SignedVariableInteger::<7>::de(reader)?.try_to()?;
        let y = SignedVariableInteger::<7>::de(reader)?.try_to()?;
        let width = UnsignedVariableInteger::<4>::de(reader)?.try_to()?;
        let height = UnsignedVariableInteger::<4>::de(reader)?.try_to()?;
        Ok(Self::new(x, y, width, height))
    }
}
