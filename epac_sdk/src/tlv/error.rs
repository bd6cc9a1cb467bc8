/// An error type to indicate something went wrong with decoding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    UnexpectedEnd,
    UnexpectedType { expected: u64, found: u64 },
    UnknownPacketType(u64),
    InvalidLength,
    InvalidNumber,
    TrailingGarbage,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            DecodeError::UnexpectedType { expected, found } => {
                write!(f, "expected TLV type {expected:#x}, found {found:#x}")
            }
            DecodeError::UnknownPacketType(found) => write!(f, "unknown packet type {found:#x}"),
            other => write!(f, "{:?}", other),
        }
    }
}

impl std::error::Error for DecodeError {}
