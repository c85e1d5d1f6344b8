use crate::{BitReader, BitWrite, Serde, SerdeErr};

pub trait SerdeIntegerConversion<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    fn from(value: &SerdeInteger<SIGNED, VARIABLE, BITS>) -> Self;
}

pub type UnsignedInteger<const BITS: u8> = SerdeInteger<false, false, BITS>;
pub type SignedInteger<const BITS: u8> = SerdeInteger<true, false, BITS>;
pub type UnsignedVariableInteger<const BITS: u8> = SerdeInteger<false, true, BITS>;
pub type SignedVariableInteger<const BITS: u8> = SerdeInteger<true, true, BITS>;

/// Integer written with a configurable bit width. Variable integers are
/// written in `BITS`-sized chunks, each preceded by a continuation bit.
// The const generics only pick the encoding, the shared logic sits in the
// non-generic inner type to keep monomorphization small.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SerdeInteger<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> {
    inner: IntegerInner,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
struct IntegerInner {
    value: i128,
    signed: bool,
    variable: bool,
    bits: u8,
}

impl IntegerInner {
    fn new(signed: bool, variable: bool, bits: u8, value: i128) -> Self {
        if bits == 0 || bits > 64 {
            panic!("integer bit width must be within 1..=64, got {}", bits);
        }
        if !signed && value < 0 {
            panic!("can't encode a negative number with an unsigned integer");
        }
        if !variable {
            let limit: i128 = 1_i128 << bits;
            if value.abs() >= limit {
                panic!("with {} bits, can't encode {}", bits, value);
            }
        }

        Self {
            value,
            signed,
            variable,
            bits,
        }
    }

    fn ser(&self, writer: &mut dyn BitWrite) {
        if self.signed {
            writer.write_bit(self.value < 0);
        }
        let mut magnitude = self.value.unsigned_abs();

        if self.variable {
            loop {
                let proceed = magnitude >= (1_u128 << self.bits);
                writer.write_bit(proceed);
                for _ in 0..self.bits {
                    writer.write_bit(magnitude & 1 != 0);
                    magnitude >>= 1;
                }
                if !proceed {
                    return;
                }
            }
        }

        for _ in 0..self.bits {
            writer.write_bit(magnitude & 1 != 0);
            magnitude >>= 1;
        }
    }

    fn de(reader: &mut BitReader, signed: bool, variable: bool, bits: u8) -> Result<Self, SerdeErr> {
        let negative = signed && reader.read_bit()?;

        let mut magnitude: u128 = 0;
        let mut shift: u32 = 0;
        loop {
            let proceed = if variable { reader.read_bit()? } else { false };
            for _ in 0..bits {
                if reader.read_bit()? {
                    if shift >= 127 {
                        return Err(SerdeErr::InvalidValue {
                            type_name: "SerdeInteger",
                        });
                    }
                    magnitude |= 1 << shift;
                }
                shift += 1;
            }
            if !proceed {
                break;
            }
        }

        let magnitude = i128::try_from(magnitude).map_err(|_| SerdeErr::InvalidValue {
            type_name: "SerdeInteger",
        })?;
        let value = if negative { -magnitude } else { magnitude };

        Ok(Self {
            value,
            signed,
            variable,
            bits,
        })
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> SerdeInteger<SIGNED, VARIABLE, BITS> {
    pub fn new<T: Into<i128>>(value: T) -> Self {
        Self {
            inner: IntegerInner::new(SIGNED, VARIABLE, BITS, value.into()),
        }
    }

    pub fn get(&self) -> i128 {
        self.inner.value
    }

    pub fn to<T: SerdeIntegerConversion<SIGNED, VARIABLE, BITS>>(&self) -> T {
        T::from(self)
    }

    /// Converts into `T`, failing instead of panicking when out of range
    pub fn try_to<T: TryFrom<i128>>(&self) -> Result<T, SerdeErr> {
        T::try_from(self.inner.value).map_err(|_| SerdeErr::InvalidValue {
            type_name: std::any::type_name::<T>(),
        })
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8> Serde
    for SerdeInteger<SIGNED, VARIABLE, BITS>
{
    fn ser(&self, writer: &mut dyn BitWrite) {
        self.inner.ser(writer);
    }

    fn de(reader: &mut BitReader) -> Result<Self, SerdeErr> {
        let inner = IntegerInner::de(reader, SIGNED, VARIABLE, BITS)?;
        Ok(Self { inner })
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8, T: Into<i128>> From<T>
    for SerdeInteger<SIGNED, VARIABLE, BITS>
{
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<const SIGNED: bool, const VARIABLE: bool, const BITS: u8, T: TryFrom<i128>>
    SerdeIntegerConversion<SIGNED, VARIABLE, BITS> for T
{
    fn from(value: &SerdeInteger<SIGNED, VARIABLE, BITS>) -> Self {
        let Ok(t_value) = T::try_from(value.get()) else {
            panic!("SerdeInteger's value is out of range to convert to this type.");
        };
        t_value
    }
}
