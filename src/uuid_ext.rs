//! `uuid` extension boxes, keyed by their 16-byte extended type.
//!
//! Five PIFF shapes are recognised. Any other UUID yields just the raw UUID
//! and `box_type = "unknown"`.

use crate::boxes::{AttrValue, Attributes};
use crate::error::ReadError;
use crate::reader::Reader;
use crate::registry::{BoxDecoder, DecodeContext};

pub const PIFF_TFRF: [u8; 16] = [
    0xd4, 0x80, 0x7e, 0xf2, 0xca, 0x39, 0x46, 0x95, 0x8e, 0x54, 0x26, 0xcb, 0x9e, 0x46, 0xa7, 0x9f,
];
pub const PIFF_TFXD: [u8; 16] = [
    0x6d, 0x1d, 0x9b, 0x05, 0x42, 0xd5, 0x44, 0xe6, 0x80, 0xe2, 0x14, 0x1d, 0xaf, 0xf7, 0x57, 0xb2,
];
pub const PIFF_SAMPLE_ENCRYPTION: [u8; 16] = [
    0xa2, 0x39, 0x4f, 0x52, 0x5a, 0x9b, 0x4f, 0x14, 0xa2, 0x44, 0x6c, 0x42, 0x7c, 0x64, 0x8d, 0xf4,
];
pub const PIFF_TRACK_ENCRYPTION: [u8; 16] = [
    0x89, 0x74, 0xdb, 0xce, 0x7b, 0xe7, 0x4c, 0x51, 0x84, 0xf9, 0x71, 0x48, 0xf9, 0x88, 0x25, 0x54,
];
pub const PIFF_PSSH: [u8; 16] = [
    0xd0, 0x8a, 0x4f, 0x18, 0x10, 0xf3, 0x4a, 0x82, 0xb6, 0xc8, 0x32, 0xd8, 0xab, 0xa1, 0x83, 0xd3,
];

// SampleEncryption flags
const OVERRIDE_TRACK_ENCRYPTION: u32 = 0x01;
const USE_SUBSAMPLE_ENCRYPTION: u32 = 0x02;

const DEFAULT_IV_SIZE: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiffBox {
    FragmentRun,
    FragmentTime,
    SampleEncryption,
    TrackEncryption,
    Pssh,
}

impl PiffBox {
    pub fn from_uuid(uuid: &[u8]) -> Option<Self> {
        let uuid: [u8; 16] = uuid.try_into().ok()?;
        match uuid {
            PIFF_TFRF => Some(PiffBox::FragmentRun),
            PIFF_TFXD => Some(PiffBox::FragmentTime),
            PIFF_SAMPLE_ENCRYPTION => Some(PiffBox::SampleEncryption),
            PIFF_TRACK_ENCRYPTION => Some(PiffBox::TrackEncryption),
            PIFF_PSSH => Some(PiffBox::Pssh),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PiffBox::FragmentRun => "PIFF tfrf",
            PiffBox::FragmentTime => "PIFF tfxd",
            PiffBox::SampleEncryption => "PIFF SampleEncryption",
            PiffBox::TrackEncryption => "PIFF TrackEncryption",
            PiffBox::Pssh => "PIFF PSSH",
        }
    }
}

pub struct UuidDecoder;

impl BoxDecoder for UuidDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let raw = r.bytes(16)?;
        out.insert("uuid", hex::encode(raw).into());

        let Some(kind) = PiffBox::from_uuid(raw) else {
            out.insert("box_type", "unknown".into());
            return Ok(());
        };
        out.insert("box_type", kind.name().into());

        let version = r.u8()?;
        out.insert("version", version.into());
        let flags = r.u24()?;
        out.insert("flags", AttrValue::hex(flags));
        let wide = version == 1;

        match kind {
            PiffBox::FragmentRun => {
                let count = r.u8()?;
                out.insert("entries", AttrValue::List(Vec::new()));
                for _ in 0..count {
                    let mut entry = Attributes::new();
                    entry.insert("time", AttrValue::decimal(r.u32_or_u64(wide)?));
                    entry.insert("duration", AttrValue::decimal(r.u32_or_u64(wide)?));
                    push(out, "entries", entry.into());
                }
            }
            PiffBox::FragmentTime => {
                out.insert("time", AttrValue::decimal(r.u32_or_u64(wide)?));
                out.insert("duration", AttrValue::decimal(r.u32_or_u64(wide)?));
            }
            PiffBox::SampleEncryption => {
                let mut iv_size = DEFAULT_IV_SIZE;
                if flags & OVERRIDE_TRACK_ENCRYPTION != 0 {
                    iv_size = encryption_defaults(r, out)?;
                }
                let sample_count = r.u32()?;
                out.insert("sample_count", sample_count.into());
                // zero-size IVs without subsamples leave nothing per sample
                let empty = iv_size == 0 && flags & USE_SUBSAMPLE_ENCRYPTION == 0;
                let listed = if empty {
                    0
                } else {
                    out.insert("samples", AttrValue::List(Vec::new()));
                    sample_count
                };
                for _ in 0..listed {
                    let sample = sample_encryption_entry(r, iv_size, flags)?;
                    push(out, "samples", sample.into());
                }
            }
            PiffBox::TrackEncryption => {
                encryption_defaults(r, out)?;
            }
            PiffBox::Pssh => {
                out.insert("system_id", r.hex(16)?.into());
                let data_size = r.u32()?;
                out.insert("data_size", data_size.into());
                out.insert("data", r.hex(data_size as usize)?.into());
            }
        }
        Ok(())
    }
}

/// algorithm id (24 bits), IV size, key id. Returns the IV size.
fn encryption_defaults(r: &mut Reader<'_>, out: &mut Attributes) -> Result<u8, ReadError> {
    out.insert("algorithm", r.u24()?.into());
    let iv_size = r.u8()?;
    out.insert("iv_size", iv_size.into());
    out.insert("key_id", r.hex(16)?.into());
    Ok(iv_size)
}

fn sample_encryption_entry(
    r: &mut Reader<'_>,
    iv_size: u8,
    flags: u32,
) -> Result<Attributes, ReadError> {
    let mut sample = Attributes::new();
    sample.insert("iv", r.hex(usize::from(iv_size))?.into());
    if flags & USE_SUBSAMPLE_ENCRYPTION != 0 {
        let count = r.u16()?;
        let mut subsamples = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let mut sub = Attributes::new();
            sub.insert("clear_bytes", r.u16()?.into());
            sub.insert("encrypted_bytes", r.u32()?.into());
            subsamples.push(AttrValue::Object(sub));
        }
        sample.insert("subsamples", subsamples.into());
    }
    Ok(sample)
}

fn push(out: &mut Attributes, key: &'static str, v: AttrValue) {
    if let Some(AttrValue::List(list)) = out.get_mut(key) {
        list.push(v);
    }
}
