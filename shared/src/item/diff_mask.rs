/// Growable bitset of property indices changed since the last sync
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffMask {
    bytes: Vec<u8>,
}

impl DiffMask {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn bit(&self, index: u8) -> bool {
        let byte = usize::from(index / 8);
        match self.bytes.get(byte) {
            Some(value) => value & (1 << (index % 8)) != 0,
            None => false,
        }
    }

    pub fn set_bit(&mut self, index: u8, value: bool) {
        let byte = usize::from(index / 8);
        if byte >= self.bytes.len() {
            if !value {
                return;
            }
            self.bytes.resize(byte + 1, 0);
        }
        if value {
            self.bytes[byte] |= 1 << (index % 8);
        } else {
            self.bytes[byte] &= !(1 << (index % 8));
        }
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn is_clear(&self) -> bool {
        self.bytes.iter().all(|byte| *byte == 0)
    }

    /// Indices of set bits, ascending
    pub fn indices(&self) -> Vec<u8> {
        let mut output = Vec::new();
        for (byte_index, byte) in self.bytes.iter().enumerate() {
            for bit in 0..8 {
                if byte & (1 << bit) != 0 {
                    // byte_index never exceeds 31, the mask is indexed by u8
                    output.push((byte_index * 8 + bit) as u8);
                }
            }
        }
        output
    }
}
