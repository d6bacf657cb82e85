//! Common-encryption boxes: `pssh`, `tenc`, `saiz`, `saio`, `schm`, `frma`.

use crate::boxes::{AttrValue, Attributes};
use crate::error::ReadError;
use crate::reader::Reader;
use crate::registry::{BoxDecoder, DecodeContext, full_box};

/// aux_info_type / aux_info_type_parameter, present when flag 0x01 is set.
fn aux_info(r: &mut Reader<'_>, out: &mut Attributes, flags: u32) -> Result<(), ReadError> {
    if flags & 0x01 != 0 {
        out.insert("AuxInfoType", r.fourcc()?.into());
        out.insert("AuxInfoTypeParameter", r.u32()?.into());
    }
    Ok(())
}

// pssh: DRM system id, key ids (v1), opaque data length
pub struct PsshDecoder;

impl BoxDecoder for PsshDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        out.insert("SystemId", AttrValue::hex_bytes(r.bytes(16)?));

        if version == 1 {
            let kid_count = r.u32()?;
            out.insert("KidCount", kid_count.into());
            out.insert("Kids", AttrValue::List(Vec::new()));
            for _ in 0..kid_count {
                let kid = AttrValue::hex_bytes(r.bytes(16)?);
                if let Some(AttrValue::List(kids)) = out.get_mut("Kids") {
                    kids.push(kid);
                }
            }
        }

        out.insert("DataSize", r.u32()?.into());
        Ok(())
    }
}

// tenc: default encryption parameters of a track
pub struct TencDecoder;

impl BoxDecoder for TencDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        r.skip(2)?; // reserved, or crypt/skip byte blocks in v1
        out.insert("IsEncrypted", r.u8()?.into());
        out.insert("DefaultIvSize", r.u8()?.into());
        out.insert("KeyId", AttrValue::hex_bytes(r.bytes(16)?));
        Ok(())
    }
}

// saiz: auxiliary information sizes
pub struct SaizDecoder;

impl BoxDecoder for SaizDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (_, flags) = full_box(r, out)?;
        aux_info(r, out, flags)?;

        let default_size = r.u8()?;
        out.insert("DefaultSampleInfoSize", default_size.into());
        let sample_count = r.u32()?;
        out.insert("SampleCount", sample_count.into());

        if default_size == 0 {
            let sizes = r.bytes(sample_count as usize)?;
            out.insert(
                "SampleInfoSizes",
                sizes.iter().map(|&s| AttrValue::from(s)).collect::<Vec<_>>().into(),
            );
        }
        Ok(())
    }
}

// saio: auxiliary information offsets
pub struct SaioDecoder;

impl BoxDecoder for SaioDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, flags) = full_box(r, out)?;
        aux_info(r, out, flags)?;

        let entries = r.u32()?;
        out.insert("Entries", entries.into());
        out.insert("Offsets", AttrValue::List(Vec::new()));
        for _ in 0..entries {
            let offset = AttrValue::hex(r.u32_or_u64(version == 1)?);
            if let Some(AttrValue::List(offsets)) = out.get_mut("Offsets") {
                offsets.push(offset);
            }
        }
        Ok(())
    }
}

pub struct SchmDecoder;

impl BoxDecoder for SchmDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        out.insert("SchemeType", r.fourcc()?.into());
        out.insert("SchemeVersion", AttrValue::hex(r.u32()?));
        Ok(())
    }
}

// frma: original (unencrypted) sample entry format
pub struct FrmaDecoder;

impl BoxDecoder for FrmaDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        out.insert("Format", r.fourcc()?.into());
        Ok(())
    }
}
