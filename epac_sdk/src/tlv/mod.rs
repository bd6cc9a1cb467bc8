pub mod decode;
pub mod encode;
pub mod error;
mod packet;

pub use error::DecodeError;
pub use packet::{decode_packet, encode_packet};

pub(crate) mod types {
    pub const INTEREST: u64 = 0x05;
    pub const DATA: u64 = 0x06;
    pub const NAME: u64 = 0x07;
    pub const NAME_COMPONENT: u64 = 0x08;
    pub const SELECTORS: u64 = 0x09;
    pub const NONCE: u64 = 0x0a;
    pub const INTEREST_LIFETIME: u64 = 0x0c;
    pub const MIN_SUFFIX_COMPONENTS: u64 = 0x0d;
    pub const MAX_SUFFIX_COMPONENTS: u64 = 0x0e;
    pub const CHILD_SELECTOR: u64 = 0x11;
    pub const MUST_BE_FRESH: u64 = 0x12;
    pub const META_INFO: u64 = 0x14;
    pub const CONTENT: u64 = 0x15;
    pub const SIGNATURE_INFO: u64 = 0x16;
    pub const SIGNATURE_VALUE: u64 = 0x17;
    pub const CONTENT_TYPE: u64 = 0x18;
    pub const FRESHNESS_PERIOD: u64 = 0x19;
    pub const FINAL_BLOCK_ID: u64 = 0x1a;
    pub const SIGNATURE_TYPE: u64 = 0x1b;
    pub const KEY_LOCATOR: u64 = 0x1c;
    pub const FORWARDING_HINT: u64 = 0x1e;
    pub const DELEGATION: u64 = 0x1f;
    pub const PREFERENCE: u64 = 0x1e;
    pub const FRAGMENT: u64 = 0x50;
    pub const LP_PACKET: u64 = 0x64;
    pub const CONTROL_RESPONSE: u64 = 0x65;
    pub const STATUS_CODE: u64 = 0x66;
    pub const STATUS_TEXT: u64 = 0x67;
    pub const CONTROL_PARAMETERS: u64 = 0x68;
    pub const NACK: u64 = 0x0320;
    pub const NACK_REASON: u64 = 0x0321;
}
