//! Sample table boxes, sample entries and codec configuration records.

use super::movie::push_entry;
use crate::boxes::{AttrValue, Attributes};
use crate::error::ReadError;
use crate::reader::Reader;
use crate::registry::{BoxDecoder, DecodeContext, full_box};

// stsd: version/flags + entry_count; the sample entries follow as children
pub struct StsdDecoder;

impl BoxDecoder for StsdDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        out.insert("Entries", r.u32()?.into());
        Ok(())
    }
}

/// stts, ctts, stsc, stss, stco, co64: only the entry count is decoded, the
/// tables themselves can hold millions of rows.
pub struct EntryCountDecoder;

impl BoxDecoder for EntryCountDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        out.insert("Entries", r.u32()?.into());
        Ok(())
    }
}

pub struct StszDecoder;

impl BoxDecoder for StszDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        out.insert("SampleSize", r.u32()?.into());
        out.insert("SampleCount", r.u32()?.into());
        Ok(())
    }
}

// Visual sample entry (avc1, avc3, hvc1, hev1, encv). 78 bytes of fixed
// fields, then codec configuration boxes.
pub struct VisualSampleEntryDecoder;

impl BoxDecoder for VisualSampleEntryDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        r.skip(6)?; // reserved
        out.insert("DataReferenceIndex", r.u16()?.into());
        r.skip(16)?; // pre_defined, reserved
        out.insert("Width", r.u16()?.into());
        out.insert("Height", r.u16()?.into());
        r.skip(4 + 4 + 4 + 2)?; // resolutions, reserved, frame_count

        // Pascal string in a fixed 32-byte field
        let name = r.bytes(32)?;
        let len = usize::from(name[0]).min(31);
        out.insert(
            "CompressorName",
            String::from_utf8_lossy(&name[1..1 + len]).into_owned().into(),
        );
        out.insert("Depth", r.u16()?.into());
        r.skip(2)?; // pre_defined
        Ok(())
    }
}

// Audio sample entry (mp4a, enca). 28 bytes of fixed fields, then esds etc.
pub struct AudioSampleEntryDecoder;

impl BoxDecoder for AudioSampleEntryDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        r.skip(6)?;
        out.insert("DataReferenceIndex", r.u16()?.into());
        r.skip(8)?; // reserved
        out.insert("Channels", r.u16()?.into());
        out.insert("SampleSize", r.u16()?.into());
        r.skip(4)?; // pre_defined, reserved
        out.insert("SampleRate", (r.u32()? >> 16).into());
        Ok(())
    }
}

// stpp: XML subtitle sample entry, three zero-terminated strings
pub struct StppDecoder;

impl BoxDecoder for StppDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        r.skip(6)?;
        out.insert("DataReferenceIndex", r.u16()?.into());
        out.insert("Namespace", r.cstring()?.into());
        out.insert("SchemaLocation", r.cstring()?.into());
        out.insert("AuxiliaryMimeTypes", r.cstring()?.into());
        Ok(())
    }
}

/// `count` length-prefixed (16-bit) parameter sets, each rendered as hex.
fn parameter_sets(r: &mut Reader<'_>, count: usize) -> Result<Vec<AttrValue>, ReadError> {
    let mut sets = Vec::new();
    for _ in 0..count {
        let len = usize::from(r.u16()?);
        sets.push(AttrValue::hex_bytes(r.bytes(len)?));
    }
    Ok(sets)
}

// avcC: AVCDecoderConfigurationRecord
pub struct AvccDecoder;

impl BoxDecoder for AvccDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        out.insert("ConfigurationVersion", r.u8()?.into());
        out.insert("Profile", r.u8()?.into());
        out.insert("ProfileCompatibility", AttrValue::hex(r.u8()?));
        out.insert("Level", AttrValue::hex(r.u8()?));
        out.insert("NalUnitLength", ((r.u8()? & 0x03) + 1).into());

        let num_sps = usize::from(r.u8()? & 0x1f);
        out.insert("SPS", parameter_sets(r, num_sps)?.into());
        let num_pps = usize::from(r.u8()?);
        out.insert("PPS", parameter_sets(r, num_pps)?.into());
        Ok(())
    }
}

fn hevc_nal_unit_type(t: u8) -> String {
    match t {
        32 => "VPS_NUT (32)".to_string(),
        33 => "SPS_NUT (33)".to_string(),
        34 => "PPS_NUT (34)".to_string(),
        39 => "PREFIX_SEI_NUT (39)".to_string(),
        40 => "SUFFIX_SEI_NUT (40)".to_string(),
        other => format!("NON-ALLOWED TYPE ({other})"),
    }
}

// hvcC: HEVCDecoderConfigurationRecord
pub struct HvccDecoder;

impl BoxDecoder for HvccDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        out.insert("ConfigurationVersion", r.u8()?.into());
        out.insert("GeneralConfigFlags", AttrValue::hex(r.u8()?));
        out.insert("GeneralProfileCompatibilityFlags", AttrValue::hex(r.u32()?));
        out.insert("GeneralConstraintIndicatorFlags", AttrValue::hex(r.u48()?));
        out.insert("GeneralLevelIdc", r.u8()?.into());
        out.insert("MinSpatialSegmentationIdc", (r.u16()? & 0x0fff).into());
        out.insert("ParallelismType", (r.u8()? & 0x03).into());
        out.insert("ChromaFormat", (r.u8()? & 0x03).into());
        out.insert("BitDepthLumaMinus8", (r.u8()? & 0x07).into());
        out.insert("BitDepthChromaMinus8", (r.u8()? & 0x07).into());
        out.insert("AvgFrameRate", r.u16()?.into());
        out.insert("LengthSizeMinusOne", (r.u8()? & 0x03).into());

        let num_arrays = r.u8()?;
        out.insert("Arrays", AttrValue::List(Vec::new()));
        for _ in 0..num_arrays {
            let b = r.u8()?;
            let mut array = Attributes::new();
            array.insert("Completeness", ((b >> 7) & 1).into());
            array.insert("NalUnitType", hevc_nal_unit_type(b & 0x3f).into());
            let num_nalus = usize::from(r.u16()?);
            array.insert("Nalus", parameter_sets(r, num_nalus)?.into());
            push_entry(out, "Arrays", array);
        }
        Ok(())
    }
}

pub struct PaspDecoder;

impl BoxDecoder for PaspDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        out.insert("HSpacing", r.u32()?.into());
        out.insert("VSpacing", r.u32()?.into());
        Ok(())
    }
}

// sdtp: one dependency byte per sample, up to the end of the box
pub struct SdtpDecoder;

impl BoxDecoder for SdtpDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        let mut entries = Vec::new();
        while r.remaining() > 0 {
            let b = r.u8()?;
            let mut entry = Attributes::new();
            entry.insert("IsLeading", ((b >> 6) & 3).into());
            entry.insert("SampleDependsOn", ((b >> 4) & 3).into());
            entry.insert("SampleIsDependedOn", ((b >> 2) & 3).into());
            entry.insert("SampleHasRedundancy", (b & 3).into());
            entries.push(AttrValue::Object(entry));
        }
        out.insert("Entries", AttrValue::List(entries));
        Ok(())
    }
}

// sbgp: sample to group
pub struct SbgpDecoder;

impl BoxDecoder for SbgpDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        out.insert("GroupingType", r.fourcc()?.into());
        if version == 1 {
            out.insert("GroupingTypeParameter", r.u32()?.into());
        }

        let entries = r.u32()?;
        out.insert("Entries", AttrValue::List(Vec::new()));
        for _ in 0..entries {
            let mut entry = Attributes::new();
            entry.insert("SampleCount", r.u32()?.into());
            entry.insert("GroupDescriptionIndex", r.u32()?.into());
            push_entry(out, "Entries", entry);
        }
        Ok(())
    }
}

/// Fixed part of a `seig` entry: reserved/pattern, flag, IV size, key id.
const SEIG_ENTRY_SIZE: usize = 20;

// sgpd: sample group description; only `seig` entries are decoded
pub struct SgpdDecoder;

impl BoxDecoder for SgpdDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        let grouping_type = r.fourcc()?;
        out.insert("GroupingType", grouping_type.into());

        let mut default_length = 0;
        if version == 1 {
            default_length = r.u32()?;
            out.insert("DefaultLength", default_length.into());
        } else if version >= 2 {
            out.insert("DefaultSampleDescriptionIndex", r.u32()?.into());
        }

        let entry_count = r.u32()?;
        if &grouping_type.0 != b"seig" {
            out.insert("Entries", entry_count.into());
            return Ok(());
        }

        out.insert("Entries", AttrValue::List(Vec::new()));
        for _ in 0..entry_count {
            let length = match version {
                1 if default_length == 0 => r.u32()? as usize, // description_length
                1 => default_length as usize,
                _ => SEIG_ENTRY_SIZE,
            };
            let start = r.position();
            r.skip(2)?; // reserved / crypt pattern
            let mut entry = Attributes::new();
            entry.insert("IsEncrypted", r.u8()?.into());
            entry.insert("IvSize", r.u8()?.into());
            entry.insert("KeyId", AttrValue::hex_bytes(r.bytes(16)?));
            push_entry(out, "Entries", entry);
            // constant IVs and anything else past the fixed part
            let read = r.position() - start;
            if length > read {
                r.skip(length - read)?;
            }
        }
        Ok(())
    }
}
