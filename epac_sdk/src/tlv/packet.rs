use std::time::Duration;

use super::{
    decode::{
        decode_expected, decode_nonneg_integer, decode_optional, decode_optional_nonneg,
        decode_tlv, peek_type,
    },
    encode::{encode_nonneg_tlv, encode_tlv},
    error::DecodeError,
    types::*,
};
use crate::{
    definitions::{
        ControlResponse, Delegation, MetaInfo, Nack, NackReason, Packet, Request, Response,
        Selectors, SignatureInfo,
    },
    name::{Component, Name},
};

fn finish(stream: &[u8]) -> Result<(), DecodeError> {
    if stream.is_empty() {
        Ok(())
    } else {
        Err(DecodeError::TrailingGarbage)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn encode_name(name: &Name, stream: &mut Vec<u8>) {
    let mut value = Vec::new();
    for component in name.components() {
        encode_tlv(NAME_COMPONENT, component.as_bytes(), &mut value);
    }
    encode_tlv(NAME, &value, stream);
}

fn decode_name_value(mut value: &[u8]) -> Result<Name, DecodeError> {
    let mut name = Name::new();
    while !value.is_empty() {
        name.push(Component::new(decode_expected(NAME_COMPONENT, &mut value)?));
    }

    Ok(name)
}

fn decode_name(stream: &mut &[u8]) -> Result<Name, DecodeError> {
    decode_name_value(decode_expected(NAME, stream)?)
}

impl Request {
    pub fn wire_encode(&self) -> Vec<u8> {
        let mut value = Vec::with_capacity(64);
        encode_name(&self.name, &mut value);

        if !self.selectors.is_empty() {
            let mut selectors = Vec::new();
            if let Some(min) = self.selectors.min_suffix_components {
                encode_nonneg_tlv(MIN_SUFFIX_COMPONENTS, min, &mut selectors);
            }
            if let Some(max) = self.selectors.max_suffix_components {
                encode_nonneg_tlv(MAX_SUFFIX_COMPONENTS, max, &mut selectors);
            }
            if let Some(child) = self.selectors.child_selector {
                encode_nonneg_tlv(CHILD_SELECTOR, child as u64, &mut selectors);
            }
            if self.selectors.must_be_fresh {
                encode_tlv(MUST_BE_FRESH, &[], &mut selectors);
            }
            encode_tlv(SELECTORS, &selectors, &mut value);
        }

        encode_tlv(NONCE, &self.nonce.to_be_bytes(), &mut value);

        if let Some(lifetime) = self.lifetime {
            encode_nonneg_tlv(INTEREST_LIFETIME, millis(lifetime), &mut value);
        }

        if !self.forwarding_hint.is_empty() {
            let mut hint = Vec::new();
            for delegation in &self.forwarding_hint {
                let mut inner = Vec::new();
                encode_nonneg_tlv(PREFERENCE, delegation.preference, &mut inner);
                encode_name(&delegation.name, &mut inner);
                encode_tlv(DELEGATION, &inner, &mut hint);
            }
            encode_tlv(FORWARDING_HINT, &hint, &mut value);
        }

        let mut wire = Vec::with_capacity(value.len() + 4);
        encode_tlv(INTEREST, &value, &mut wire);

        wire
    }

    pub fn wire_decode(wire: &[u8]) -> Result<Self, DecodeError> {
        let mut stream = wire;
        let request = Self::decode_value(decode_expected(INTEREST, &mut stream)?)?;
        finish(stream)?;

        Ok(request)
    }

    fn decode_value(mut stream: &[u8]) -> Result<Self, DecodeError> {
        let name = decode_name(&mut stream)?;

        let mut selectors = Selectors::default();
        if let Some(mut inner) = decode_optional(SELECTORS, &mut stream)? {
            selectors.min_suffix_components =
                decode_optional_nonneg(MIN_SUFFIX_COMPONENTS, &mut inner)?;
            selectors.max_suffix_components =
                decode_optional_nonneg(MAX_SUFFIX_COMPONENTS, &mut inner)?;
            selectors.child_selector = decode_optional_nonneg(CHILD_SELECTOR, &mut inner)?
                .map(|child| u8::try_from(child).map_err(|_| DecodeError::InvalidNumber))
                .transpose()?;
            selectors.must_be_fresh = decode_optional(MUST_BE_FRESH, &mut inner)?.is_some();
            finish(inner)?;
        }

        let nonce: [u8; 4] = decode_expected(NONCE, &mut stream)?
            .try_into()
            .map_err(|_| DecodeError::InvalidLength)?;

        let lifetime =
            decode_optional_nonneg(INTEREST_LIFETIME, &mut stream)?.map(Duration::from_millis);

        let mut forwarding_hint = Vec::new();
        if let Some(mut hint) = decode_optional(FORWARDING_HINT, &mut stream)? {
            while !hint.is_empty() {
                let mut inner = decode_expected(DELEGATION, &mut hint)?;
                let preference = decode_nonneg_integer(decode_expected(PREFERENCE, &mut inner)?)?;
                let name = decode_name(&mut inner)?;
                finish(inner)?;
                forwarding_hint.push(Delegation { preference, name });
            }
        }

        finish(stream)?;

        Ok(Self {
            name,
            selectors,
            nonce: u32::from_be_bytes(nonce),
            lifetime,
            forwarding_hint,
        })
    }
}

impl Response {
    /// The bytes covered by the signature: name, meta info, content and signature info
    pub fn signed_portion(&self) -> Vec<u8> {
        let mut value = Vec::with_capacity(self.content.len() + 64);
        encode_name(&self.name, &mut value);

        let mut meta = Vec::new();
        let content_type: u64 = self.meta_info.content_type.into();
        if content_type != 0 {
            encode_nonneg_tlv(CONTENT_TYPE, content_type, &mut meta);
        }
        if let Some(period) = self.meta_info.freshness_period {
            encode_nonneg_tlv(FRESHNESS_PERIOD, millis(period), &mut meta);
        }
        if let Some(final_block_id) = &self.meta_info.final_block_id {
            let mut component = Vec::new();
            encode_tlv(NAME_COMPONENT, final_block_id.as_bytes(), &mut component);
            encode_tlv(FINAL_BLOCK_ID, &component, &mut meta);
        }
        encode_tlv(META_INFO, &meta, &mut value);

        encode_tlv(CONTENT, &self.content, &mut value);

        let mut info = Vec::new();
        encode_nonneg_tlv(
            SIGNATURE_TYPE,
            self.signature_info.signature_type.into(),
            &mut info,
        );
        if let Some(locator) = &self.signature_info.key_locator {
            let mut inner = Vec::new();
            encode_name(locator, &mut inner);
            encode_tlv(KEY_LOCATOR, &inner, &mut info);
        }
        encode_tlv(SIGNATURE_INFO, &info, &mut value);

        value
    }

    pub fn wire_encode(&self) -> Vec<u8> {
        let mut value = self.signed_portion();
        encode_tlv(SIGNATURE_VALUE, &self.signature_value, &mut value);

        let mut wire = Vec::with_capacity(value.len() + 4);
        encode_tlv(DATA, &value, &mut wire);

        wire
    }

    pub fn wire_decode(wire: &[u8]) -> Result<Self, DecodeError> {
        let mut stream = wire;
        let response = Self::decode_value(decode_expected(DATA, &mut stream)?)?;
        finish(stream)?;

        Ok(response)
    }

    fn decode_value(mut stream: &[u8]) -> Result<Self, DecodeError> {
        let name = decode_name(&mut stream)?;

        let mut meta_info = MetaInfo::default();
        if let Some(mut meta) = decode_optional(META_INFO, &mut stream)? {
            if let Some(content_type) = decode_optional_nonneg(CONTENT_TYPE, &mut meta)? {
                meta_info.content_type = content_type.into();
            }
            meta_info.freshness_period =
                decode_optional_nonneg(FRESHNESS_PERIOD, &mut meta)?.map(Duration::from_millis);
            if let Some(mut final_block_id) = decode_optional(FINAL_BLOCK_ID, &mut meta)? {
                let component = decode_expected(NAME_COMPONENT, &mut final_block_id)?;
                finish(final_block_id)?;
                meta_info.final_block_id = Some(Component::new(component));
            }
            finish(meta)?;
        }

        let content = decode_optional(CONTENT, &mut stream)?
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        let mut info = decode_expected(SIGNATURE_INFO, &mut stream)?;
        let signature_type =
            decode_nonneg_integer(decode_expected(SIGNATURE_TYPE, &mut info)?)?.into();
        let key_locator = decode_optional(KEY_LOCATOR, &mut info)?
            .map(|mut locator| {
                let name = decode_name(&mut locator)?;
                finish(locator)?;
                Ok::<_, DecodeError>(name)
            })
            .transpose()?;
        finish(info)?;

        let signature_value = decode_expected(SIGNATURE_VALUE, &mut stream)?.to_vec();
        finish(stream)?;

        Ok(Self {
            name,
            meta_info,
            content,
            signature_info: SignatureInfo {
                signature_type,
                key_locator,
            },
            signature_value,
        })
    }
}

impl Nack {
    pub fn wire_encode(&self) -> Vec<u8> {
        let mut header = Vec::new();
        if self.reason != NackReason::None {
            encode_nonneg_tlv(NACK_REASON, self.reason.into(), &mut header);
        }

        let mut value = Vec::new();
        encode_tlv(NACK, &header, &mut value);
        encode_tlv(FRAGMENT, &self.request.wire_encode(), &mut value);

        let mut wire = Vec::with_capacity(value.len() + 4);
        encode_tlv(LP_PACKET, &value, &mut wire);

        wire
    }

    pub fn wire_decode(wire: &[u8]) -> Result<Self, DecodeError> {
        let mut stream = wire;
        let nack = Self::decode_value(decode_expected(LP_PACKET, &mut stream)?)?;
        finish(stream)?;

        Ok(nack)
    }

    fn decode_value(mut stream: &[u8]) -> Result<Self, DecodeError> {
        let mut header = decode_expected(NACK, &mut stream)?;
        let reason = decode_optional_nonneg(NACK_REASON, &mut header)?
            .map(NackReason::from)
            .unwrap_or_default();
        finish(header)?;

        let request = Request::wire_decode(decode_expected(FRAGMENT, &mut stream)?)?;
        finish(stream)?;

        Ok(Self { reason, request })
    }
}

/// Encode any packet into its TLV wire form
pub fn encode_packet(packet: &Packet) -> Vec<u8> {
    match packet {
        Packet::Request(request) => request.wire_encode(),
        Packet::Response(response) => response.wire_encode(),
        Packet::Nack(nack) => nack.wire_encode(),
        Packet::Register(prefix) => {
            let mut value = Vec::new();
            encode_name(prefix, &mut value);

            let mut wire = Vec::new();
            encode_tlv(CONTROL_PARAMETERS, &value, &mut wire);
            wire
        }
        Packet::RegisterResult(result) => {
            let mut value = Vec::new();
            encode_nonneg_tlv(STATUS_CODE, result.status_code, &mut value);
            encode_tlv(STATUS_TEXT, result.status_text.as_bytes(), &mut value);

            let mut wire = Vec::new();
            encode_tlv(CONTROL_RESPONSE, &value, &mut wire);
            wire
        }
    }
}

/// Decode a single packet; the input must contain exactly one outer element
pub fn decode_packet(wire: &[u8]) -> Result<Packet, DecodeError> {
    let packet_type = peek_type(wire)?;
    let mut stream = wire;
    let (_, mut value) = decode_tlv(&mut stream)?;
    finish(stream)?;

    let packet = match packet_type {
        INTEREST => Packet::Request(Request::decode_value(value)?),
        DATA => Packet::Response(Response::decode_value(value)?),
        LP_PACKET => Packet::Nack(Nack::decode_value(value)?),
        CONTROL_PARAMETERS => {
            let prefix = decode_name(&mut value)?;
            finish(value)?;
            Packet::Register(prefix)
        }
        CONTROL_RESPONSE => {
            let status_code = decode_nonneg_integer(decode_expected(STATUS_CODE, &mut value)?)?;
            let status_text = decode_optional(STATUS_TEXT, &mut value)?
                .map(|text| String::from_utf8_lossy(text).into_owned())
                .unwrap_or_default();
            finish(value)?;
            Packet::RegisterResult(ControlResponse {
                status_code,
                status_text,
            })
        }
        other => return Err(DecodeError::UnknownPacketType(other)),
    };

    Ok(packet)
}
