use std::collections::BTreeMap;

use crate::{BitReader, BitWrite, Serde, SerdeErr, UnsignedVariableInteger};

// Unit

impl Serde for () {
    fn ser(&self, _writer: &mut dyn BitWrite) {}

    fn de(_reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok(())
    }
}

// Bool

impl Serde for bool {
    fn ser(&self, writer: &mut dyn BitWrite) {
        writer.write_bit(*self);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        reader.read_bit()
    }
}

// Numbers, written little-endian a byte at a time

macro_rules! impl_serde_for_number {
    ($($number_type:ty),*) => {
        $(
            impl Serde for $number_type {
                fn ser(&self, writer: &mut dyn BitWrite) {
                    for byte in self.to_le_bytes() {
                        writer.write_byte(byte);
                    }
                }

                fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
                    let mut bytes = [0u8; std::mem::size_of::<$number_type>()];
                    for byte in bytes.iter_mut() {
                        *byte = reader.read_byte()?;
                    }
                    Ok(<$number_type>::from_le_bytes(bytes))
                }

                fn bit_length(&self) -> u32 {
                    (std::mem::size_of::<$number_type>() as u32) * 8
                }
            }
        )*
    };
}

impl_serde_for_number!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

// Strings

impl Serde for String {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<9>::new(self.len() as u64).ser(writer);
        for byte in self.as_bytes() {
            writer.write_byte(*byte);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length: usize = UnsignedVariableInteger::<9>::de(reader)?.try_to()?;
        let mut bytes = Vec::with_capacity(length.min(4096));
        for _ in 0..length {
            bytes.push(reader.read_byte()?);
        }
        String::from_utf8(bytes).map_err(|_| SerdeErr::InvalidUtf8)
    }
}

// Containers

impl<T: Serde> Serde for Option<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        match self {
            Some(value) => {
                writer.write_bit(true);
                value.ser(writer);
            }
            None => writer.write_bit(false),
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        if reader.read_bit()? {
            Ok(Some(T::de(reader)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Serde> Serde for Vec<T> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<5>::new(self.len() as u64).ser(writer);
        for value in self {
            value.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length: usize = UnsignedVariableInteger::<5>::de(reader)?.try_to()?;
        let mut output = Vec::with_capacity(length.min(1024));
        for _ in 0..length {
            output.push(T::de(reader)?);
        }
        Ok(output)
    }
}

impl<K: Serde + Ord, V: Serde> Serde for BTreeMap<K, V> {
    fn ser(&self, writer: &mut dyn BitWrite) {
        UnsignedVariableInteger::<5>::new(self.len() as u64).ser(writer);
        for (key, value) in self {
            key.ser(writer);
            value.ser(writer);
        }
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let length: usize = UnsignedVariableInteger::<5>::de(reader)?.try_to()?;
        let mut output = BTreeMap::new();
        for _ in 0..length {
            let key = K::de(reader)?;
            let value = V::de(reader)?;
            output.insert(key, value);
        }
        Ok(output)
    }
}

impl<A: Serde, B: Serde> Serde for (A, B) {
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.0.ser(writer);
        self.1.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        Ok((A::de(reader)?, B::de(reader)?))
    }
}
