use crate::{BitCounter, BitReader, BitWrite, SerdeErr};

/// A type that can be written into, and read back from, a bit stream
pub trait Serde: Sized + Clone + PartialEq {
    /// Writes the value into the outgoing stream
    fn ser(&self, writer: &mut dyn BitWrite);

    /// Reads a value from the incoming stream
    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr>;

    /// Number of bits `ser` will write for this value
    fn bit_length(&self) -> u32 {
        let mut counter = BitCounter::new();
        self.ser(&mut counter);
        counter.bits_needed()
    }
}
