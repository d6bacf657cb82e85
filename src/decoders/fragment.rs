//! Fragmented-MP4 and segment boxes.

use super::movie::push_entry;
use crate::boxes::{AttrValue, Attributes};
use crate::error::{Diagnostic, ReadError};
use crate::reader::Reader;
use crate::registry::{BoxDecoder, DecodeContext, full_box};

// tfhd flags
const TFHD_BASE_DATA_OFFSET: u32 = 0x01;
const TFHD_SAMPLE_DESCRIPTION_INDEX: u32 = 0x02;
const TFHD_DEFAULT_DURATION: u32 = 0x08;
const TFHD_DEFAULT_SIZE: u32 = 0x10;
const TFHD_DEFAULT_FLAGS: u32 = 0x20;
const TFHD_DURATION_IS_EMPTY: u32 = 0x10000;
const TFHD_DEFAULT_BASE_IS_MOOF: u32 = 0x20000;

// trun flags
const TRUN_DATA_OFFSET: u32 = 0x0001;
const TRUN_FIRST_SAMPLE_FLAGS: u32 = 0x0004;
const TRUN_SAMPLE_DURATION: u32 = 0x0100;
const TRUN_SAMPLE_SIZE: u32 = 0x0200;
const TRUN_SAMPLE_FLAGS: u32 = 0x0400;
const TRUN_SAMPLE_CTS_OFFSET: u32 = 0x0800;

// sidx: segment index with its references
pub struct SidxDecoder;

impl BoxDecoder for SidxDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        out.insert("ReferenceId", r.u32()?.into());
        out.insert("Timescale", r.u32()?.into());
        let wide = version != 0;
        out.insert(
            "EarliestPresentationTime",
            AttrValue::decimal(r.u32_or_u64(wide)?),
        );
        out.insert("FirstOffset", AttrValue::decimal(r.u32_or_u64(wide)?));
        r.skip(2)?; // reserved
        let reference_count = r.u16()?;

        out.insert("Entries", AttrValue::List(Vec::new()));
        for _ in 0..reference_count {
            let mut entry = Attributes::new();
            let word = r.u32()?;
            entry.insert("ReferenceType", (word >> 31).into());
            entry.insert("ReferencedSize", (word & 0x7fff_ffff).into());
            entry.insert("SubsegmentDuration", r.u32()?.into());
            let word = r.u32()?;
            entry.insert("StartsWithSap", (word >> 31).into());
            entry.insert("SapType", ((word >> 28) & 0x7).into());
            entry.insert("SapDeltaTime", (word & 0x0fff_ffff).into());
            push_entry(out, "Entries", entry);
        }
        Ok(())
    }
}

// emsg: DASH event message, both layouts
pub struct EmsgDecoder;

impl BoxDecoder for EmsgDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        if version == 0 {
            out.insert("SchemeIdUri", r.cstring()?.into());
            out.insert("Value", r.cstring()?.into());
            out.insert("Timescale", r.u32()?.into());
            out.insert("PresentationTimeDelta", r.u32()?.into());
            out.insert("EventDuration", r.u32()?.into());
            out.insert("Id", r.u32()?.into());
        } else {
            out.insert("Timescale", r.u32()?.into());
            out.insert("PresentationTime", AttrValue::decimal(r.u64()?));
            out.insert("EventDuration", r.u32()?.into());
            out.insert("Id", r.u32()?.into());
            out.insert("SchemeIdUri", r.cstring()?.into());
            out.insert("Value", r.cstring()?.into());
        }
        out.insert("MessageData", r.rest_as_text()?.into());
        Ok(())
    }
}

// mehd: fragment duration
pub struct MehdDecoder;

impl BoxDecoder for MehdDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        out.insert("FragmentDuration", r.u32_or_u64(version == 1)?.into());
        Ok(())
    }
}

// trex: per-track fragment defaults
pub struct TrexDecoder;

impl BoxDecoder for TrexDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        out.insert("TrackId", r.u32()?.into());
        out.insert("SampleDescriptionIndex", r.u32()?.into());
        out.insert("SampleDuration", r.u32()?.into());
        out.insert("SampleSize", r.u32()?.into());
        out.insert("SampleFlags", AttrValue::hex(r.u32()?));
        Ok(())
    }
}

pub struct MfhdDecoder;

impl BoxDecoder for MfhdDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        out.insert("SequenceNumber", r.u32()?.into());
        Ok(())
    }
}

// tfhd: flag-gated defaults for one track fragment
pub struct TfhdDecoder;

impl BoxDecoder for TfhdDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (_, flags) = full_box(r, out)?;
        out.insert("TrackId", r.u32()?.into());

        if flags & TFHD_BASE_DATA_OFFSET != 0 {
            out.insert("BaseDataOffset", AttrValue::decimal(r.u64()?));
        }
        if flags & TFHD_SAMPLE_DESCRIPTION_INDEX != 0 {
            out.insert("SampleDescriptionIndex", r.u32()?.into());
        }
        if flags & TFHD_DEFAULT_DURATION != 0 {
            out.insert("DefaultSampleDuration", r.u32()?.into());
        }
        if flags & TFHD_DEFAULT_SIZE != 0 {
            out.insert("DefaultSampleSize", r.u32()?.into());
        }
        if flags & TFHD_DEFAULT_FLAGS != 0 {
            out.insert("DefaultSampleFlags", AttrValue::hex(r.u32()?));
        }
        if flags & TFHD_DURATION_IS_EMPTY != 0 {
            out.insert("DurationIsEmpty", true.into());
        }
        if flags & TFHD_DEFAULT_BASE_IS_MOOF != 0 {
            out.insert("DefaultBaseIsMoof", true.into());
        }
        Ok(())
    }
}

// tfdt: base media decode time
pub struct TfdtDecoder;

impl BoxDecoder for TfdtDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        out.insert("DecodeTime", AttrValue::decimal(r.u32_or_u64(version == 1)?));
        Ok(())
    }
}

// trun: track run with optional per-sample fields
pub struct TrunDecoder;

impl BoxDecoder for TrunDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (_, flags) = full_box(r, out)?;
        let sample_count = r.u32()?;
        out.insert("SampleCount", sample_count.into());

        if flags & TRUN_DATA_OFFSET != 0 {
            out.insert("DataOffset", r.i32()?.into());
        }
        if flags & TRUN_FIRST_SAMPLE_FLAGS != 0 {
            out.insert("FirstSampleFlags", AttrValue::hex(r.u32()?));
        }

        let mut total_duration = 0u64;
        // Samples with no per-sample fields take no bytes and all use the
        // tfhd defaults, so there is nothing to list.
        let per_sample = TRUN_SAMPLE_DURATION
            | TRUN_SAMPLE_SIZE
            | TRUN_SAMPLE_FLAGS
            | TRUN_SAMPLE_CTS_OFFSET;
        let listed = if flags & per_sample != 0 {
            out.insert("Samples", AttrValue::List(Vec::new()));
            sample_count
        } else {
            0
        };
        for _ in 0..listed {
            let mut sample = Attributes::new();
            if flags & TRUN_SAMPLE_DURATION != 0 {
                let duration = r.u32()?;
                total_duration += u64::from(duration);
                sample.insert("Duration", duration.into());
            }
            if flags & TRUN_SAMPLE_SIZE != 0 {
                sample.insert("Size", r.u32()?.into());
            }
            if flags & TRUN_SAMPLE_FLAGS != 0 {
                sample.insert("Flags", AttrValue::hex(r.u32()?));
            }
            if flags & TRUN_SAMPLE_CTS_OFFSET != 0 {
                sample.insert("CompositionTimeOffset", r.i32()?.into());
            }
            push_entry(out, "Samples", sample);
        }
        out.insert("TotalDuration", total_duration.into());
        Ok(())
    }
}

/// Byte width of a tfra number field, `None` for the unsupported code 2.
fn tfra_width(code: u32) -> Option<usize> {
    match code {
        0 => Some(1),
        1 => Some(2),
        3 => Some(4),
        _ => None,
    }
}

fn read_uint(r: &mut Reader<'_>, width: usize) -> Result<u32, ReadError> {
    match width {
        1 => r.u8().map(u32::from),
        2 => r.u16().map(u32::from),
        _ => r.u32(),
    }
}

// tfra: random access points for one track
pub struct TfraDecoder;

impl BoxDecoder for TfraDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        let (version, _) = full_box(r, out)?;
        out.insert("TrackId", r.u32()?.into());

        let sizes = r.u32()?;
        let fields: [(&'static str, u32); 3] = [
            ("TrafNumber", (sizes >> 4) & 3),
            ("TrunNumber", (sizes >> 2) & 3),
            ("SampleNumber", sizes & 3),
        ];
        for &(field, code) in &fields {
            if tfra_width(code).is_none() {
                cx.report(Diagnostic::UnsupportedFieldWidth {
                    box_type: cx.typ.trimmed(),
                    offset: cx.offset,
                    field,
                    code: code as u8,
                });
            }
        }

        let entries = r.u32()?;
        out.insert("Entries", AttrValue::List(Vec::new()));
        for _ in 0..entries {
            let mut entry = Attributes::new();
            let wide = version == 1;
            entry.insert("Time", AttrValue::decimal(r.u32_or_u64(wide)?));
            entry.insert("Offset", r.u32_or_u64(wide)?.into());
            for &(field, code) in &fields {
                match tfra_width(code) {
                    Some(width) => {
                        entry.insert(field, read_uint(r, width)?.into());
                    }
                    // 3-byte field: stepped over, value left out
                    None => r.skip(3)?,
                }
            }
            push_entry(out, "Entries", entry);
        }
        Ok(())
    }
}

pub struct MfroDecoder;

impl BoxDecoder for MfroDecoder {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        _cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError> {
        full_box(r, out)?;
        let size = r.u32()?;
        out.insert("Size", format!("{size:#x} ({size})").into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::FourCC;
    use crate::error::Diagnostics;

    fn run(
        dec: &dyn BoxDecoder,
        body: &[u8],
    ) -> (Attributes, Result<(), ReadError>, Vec<Diagnostic>) {
        let mut diags = Diagnostics::default();
        let mut out = Attributes::new();
        let res = {
            let mut cx = DecodeContext {
                typ: FourCC(*b"test"),
                offset: 0,
                diagnostics: &mut diags,
            };
            dec.decode(&mut Reader::new(body, 8), &mut out, &mut cx)
        };
        (out, res, diags.into_inner())
    }

    #[test]
    fn tfhd_flag_gated_fields() {
        let mut body = vec![0, 0x02, 0x00, 0x39]; // 0x01 | 0x08 | 0x10 | 0x20 | 0x20000
        body.extend_from_slice(&1u32.to_be_bytes());
        body.extend_from_slice(&0x1_0000_0000u64.to_be_bytes());
        body.extend_from_slice(&1024u32.to_be_bytes());
        body.extend_from_slice(&500u32.to_be_bytes());
        body.extend_from_slice(&0x0101_0000u32.to_be_bytes());

        let (out, res, _) = run(&TfhdDecoder, &body);
        assert!(res.is_ok());
        assert_eq!(out["BaseDataOffset"].as_str(), Some("4294967296"));
        assert!(out.get("SampleDescriptionIndex").is_none());
        assert_eq!(out["DefaultSampleDuration"], AttrValue::UInt(1024));
        assert_eq!(out["DefaultSampleSize"], AttrValue::UInt(500));
        assert_eq!(out["DefaultSampleFlags"].as_str(), Some("0x1010000"));
        assert!(out.get("DurationIsEmpty").is_none());
        assert_eq!(out["DefaultBaseIsMoof"], AttrValue::Bool(true));
    }

    #[test]
    fn trun_per_sample_fields() {
        let mut body = vec![0, 0, 0x0b, 0x01]; // data offset, duration, size, cts
        body.extend_from_slice(&2u32.to_be_bytes());
        body.extend_from_slice(&(-8i32).to_be_bytes());
        for (dur, size, cts) in [(1000u32, 300u32, 2000i32), (1001, 400, -1000)] {
            body.extend_from_slice(&dur.to_be_bytes());
            body.extend_from_slice(&size.to_be_bytes());
            body.extend_from_slice(&cts.to_be_bytes());
        }

        let (out, res, _) = run(&TrunDecoder, &body);
        assert!(res.is_ok());
        assert_eq!(out["DataOffset"], AttrValue::Int(-8));
        assert!(out.get("FirstSampleFlags").is_none());
        let samples = out["Samples"].as_list().unwrap();
        assert_eq!(samples.len(), 2);
        let second = samples[1].as_object().unwrap();
        assert_eq!(second["Size"], AttrValue::UInt(400));
        assert_eq!(second["CompositionTimeOffset"], AttrValue::Int(-1000));
        assert!(second.get("Flags").is_none());
        assert_eq!(out["TotalDuration"], AttrValue::UInt(2001));
    }

    #[test]
    fn trun_defaults_only_lists_no_samples() {
        let mut body = vec![0, 0, 0, 0x01]; // data offset only
        body.extend_from_slice(&u32::MAX.to_be_bytes());
        body.extend_from_slice(&64i32.to_be_bytes());

        let (out, res, diags) = run(&TrunDecoder, &body);
        assert!(res.is_ok());
        assert!(diags.is_empty());
        assert_eq!(out["SampleCount"], AttrValue::UInt(u64::from(u32::MAX)));
        assert_eq!(out["DataOffset"], AttrValue::Int(64));
        assert!(out.get("Samples").is_none());
        assert_eq!(out["TotalDuration"], AttrValue::UInt(0));
    }

    #[test]
    fn tfra_width_code_two_is_reported_and_omitted() {
        let mut body = vec![0, 0, 0, 0];
        body.extend_from_slice(&1u32.to_be_bytes());
        // traf: code 0 (1 byte), trun: code 2 (unsupported), sample: code 1 (2 bytes)
        body.extend_from_slice(&0b00_10_01u32.to_be_bytes());
        body.extend_from_slice(&1u32.to_be_bytes());
        body.extend_from_slice(&90000u32.to_be_bytes());
        body.extend_from_slice(&1234u32.to_be_bytes());
        body.push(1);
        body.extend_from_slice(&[0, 0, 2]);
        body.extend_from_slice(&5u16.to_be_bytes());

        let (out, res, diags) = run(&TfraDecoder, &body);
        assert!(res.is_ok());
        assert_eq!(diags.len(), 1);
        assert!(matches!(
            diags[0],
            Diagnostic::UnsupportedFieldWidth {
                field: "TrunNumber",
                code: 2,
                ..
            }
        ));
        let entry = out["Entries"].as_list().unwrap()[0].as_object().unwrap().clone();
        assert_eq!(entry["Time"].as_str(), Some("90000"));
        assert_eq!(entry["TrafNumber"], AttrValue::UInt(1));
        assert!(entry.get("TrunNumber").is_none());
        assert_eq!(entry["SampleNumber"], AttrValue::UInt(5));
    }

    #[test]
    fn sidx_references() {
        let mut body = vec![0, 0, 0, 0];
        body.extend_from_slice(&1u32.to_be_bytes());
        body.extend_from_slice(&90000u32.to_be_bytes());
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&0u32.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&(0x8000_0000u32 | 5000).to_be_bytes());
        body.extend_from_slice(&180000u32.to_be_bytes());
        body.extend_from_slice(&(0x9000_0000u32 | 7).to_be_bytes());

        let (out, res, _) = run(&SidxDecoder, &body);
        assert!(res.is_ok());
        let entry = out["Entries"].as_list().unwrap()[0].as_object().unwrap().clone();
        assert_eq!(entry["ReferenceType"], AttrValue::UInt(1));
        assert_eq!(entry["ReferencedSize"], AttrValue::UInt(5000));
        assert_eq!(entry["StartsWithSap"], AttrValue::UInt(1));
        assert_eq!(entry["SapType"], AttrValue::UInt(1));
        assert_eq!(entry["SapDeltaTime"], AttrValue::UInt(7));
    }

    #[test]
    fn emsg_v0_strings() {
        let mut body = vec![0, 0, 0, 0];
        body.extend_from_slice(b"urn:scte:scte35:2013:bin\0");
        body.extend_from_slice(b"1\0");
        for v in [90000u32, 10, 20, 42] {
            body.extend_from_slice(&v.to_be_bytes());
        }
        body.extend_from_slice(b"payload");

        let (out, res, _) = run(&EmsgDecoder, &body);
        assert!(res.is_ok());
        assert_eq!(out["SchemeIdUri"].as_str(), Some("urn:scte:scte35:2013:bin"));
        assert_eq!(out["Value"].as_str(), Some("1"));
        assert_eq!(out["Id"], AttrValue::UInt(42));
        assert_eq!(out["MessageData"].as_str(), Some("payload"));
    }

    #[test]
    fn emsg_v1_layout() {
        let mut body = vec![1, 0, 0, 0];
        body.extend_from_slice(&1000u32.to_be_bytes());
        body.extend_from_slice(&0x1_0000_0000u64.to_be_bytes());
        body.extend_from_slice(&500u32.to_be_bytes());
        body.extend_from_slice(&7u32.to_be_bytes());
        body.extend_from_slice(b"urn:mpeg:dash:event:2012\0");
        body.extend_from_slice(b"1\0");
        body.extend_from_slice(b"data\0\0");

        let (out, res, _) = run(&EmsgDecoder, &body);
        assert!(res.is_ok());
        let keys: Vec<&str> = out.keys().copied().collect();
        assert_eq!(
            keys,
            [
                "Version",
                "Flags",
                "Timescale",
                "PresentationTime",
                "EventDuration",
                "Id",
                "SchemeIdUri",
                "Value",
                "MessageData"
            ]
        );
        assert_eq!(out["PresentationTime"].as_str(), Some("4294967296"));
        assert!(out.get("PresentationTimeDelta").is_none());
        assert_eq!(out["EventDuration"], AttrValue::UInt(500));
        assert_eq!(out["SchemeIdUri"].as_str(), Some("urn:mpeg:dash:event:2012"));
        assert_eq!(out["MessageData"].as_str(), Some("data"));
    }
}
