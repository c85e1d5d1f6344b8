use thiserror::Error;

/// Errors raised while decoding a value from a bit stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// Tried to read past the end of the buffer
    #[error("Attempted to read past the end of the buffer")]
    EndOfBuffer,

    /// A decoded value could not be converted into its target type
    #[error("Decoded value is not valid for {type_name}")]
    InvalidValue { type_name: &'static str },

    /// A decoded string was not valid utf-8
    #[error("Decoded string is not valid utf-8")]
    InvalidUtf8,
}
