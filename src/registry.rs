use crate::boxes::{AttrValue, Attributes, FourCC};
use crate::decoders::{fragment, movie, protection, sample};
use crate::error::{Diagnostic, Diagnostics, ReadError};
use crate::known_boxes::KnownBox;
use crate::reader::Reader;
use crate::{descriptor, uuid_ext};

/// What a decoder needs to know about the box it is decoding, plus the
/// diagnostics sink for non-fatal findings.
pub struct DecodeContext<'a> {
    pub typ: FourCC,
    pub offset: u64,
    pub diagnostics: &'a mut Diagnostics,
}

impl DecodeContext<'_> {
    pub fn report(&mut self, d: Diagnostic) {
        self.diagnostics.push(d);
    }
}

/// Field decoder for one box type.
///
/// A decoder reads the body through `r` and writes attributes into `out` as it
/// goes, so a read failure leaves every field decoded so far in place. For
/// containers with fields, the cursor position on success is where the
/// nested boxes start.
pub trait BoxDecoder: Sync {
    fn decode(
        &self,
        r: &mut Reader<'_>,
        out: &mut Attributes,
        cx: &mut DecodeContext<'_>,
    ) -> Result<(), ReadError>;
}

/// Result of looking a box type up in the registry.
pub enum FieldDecoder {
    Registered(&'static dyn BoxDecoder),
    Unregistered,
}

/// The decoder registered for `kind`, resolved at compile time.
pub fn lookup(kind: KnownBox) -> FieldDecoder {
    let dec: &'static dyn BoxDecoder = match kind {
        KnownBox::Ftyp | KnownBox::Styp => &movie::FtypDecoder,
        KnownBox::Mvhd => &movie::MvhdDecoder,
        KnownBox::Tkhd => &movie::TkhdDecoder,
        KnownBox::Mdhd => &movie::MdhdDecoder,
        KnownBox::Hdlr => &movie::HdlrDecoder,
        KnownBox::Vmhd => &movie::VmhdDecoder,
        KnownBox::Smhd => &movie::SmhdDecoder,
        KnownBox::Sthd => &movie::FullBoxOnlyDecoder,
        KnownBox::Dref => &movie::DrefDecoder,
        KnownBox::Elst => &movie::ElstDecoder,
        KnownBox::Meta => &movie::FullBoxOnlyDecoder,

        KnownBox::Stsd => &sample::StsdDecoder,
        KnownBox::Stts
        | KnownBox::Ctts
        | KnownBox::Stsc
        | KnownBox::Stss
        | KnownBox::Stco
        | KnownBox::Co64 => &sample::EntryCountDecoder,
        KnownBox::Stsz => &sample::StszDecoder,
        KnownBox::Avc1 | KnownBox::Avc3 | KnownBox::Hvc1 | KnownBox::Hev1 | KnownBox::Encv => {
            &sample::VisualSampleEntryDecoder
        }
        KnownBox::Mp4a | KnownBox::Enca => &sample::AudioSampleEntryDecoder,
        KnownBox::Stpp => &sample::StppDecoder,
        KnownBox::Avcc => &sample::AvccDecoder,
        KnownBox::Hvcc => &sample::HvccDecoder,
        KnownBox::Pasp => &sample::PaspDecoder,
        KnownBox::Sdtp => &sample::SdtpDecoder,
        KnownBox::Sbgp => &sample::SbgpDecoder,
        KnownBox::Sgpd => &sample::SgpdDecoder,
        KnownBox::Esds => &descriptor::EsdsDecoder,

        KnownBox::Sidx => &fragment::SidxDecoder,
        KnownBox::Emsg => &fragment::EmsgDecoder,
        KnownBox::Mehd => &fragment::MehdDecoder,
        KnownBox::Trex => &fragment::TrexDecoder,
        KnownBox::Mfhd => &fragment::MfhdDecoder,
        KnownBox::Tfhd => &fragment::TfhdDecoder,
        KnownBox::Tfdt => &fragment::TfdtDecoder,
        KnownBox::Trun => &fragment::TrunDecoder,
        KnownBox::Tfra => &fragment::TfraDecoder,
        KnownBox::Mfro => &fragment::MfroDecoder,

        KnownBox::Pssh => &protection::PsshDecoder,
        KnownBox::Tenc => &protection::TencDecoder,
        KnownBox::Saiz => &protection::SaizDecoder,
        KnownBox::Saio => &protection::SaioDecoder,
        KnownBox::Schm => &protection::SchmDecoder,
        KnownBox::Frma => &protection::FrmaDecoder,
        KnownBox::Uuid => &uuid_ext::UuidDecoder,

        _ => return FieldDecoder::Unregistered,
    };
    FieldDecoder::Registered(dec)
}

// ---------- Helpers shared by decoders ----------

/// FullBox header: 1-byte version, 24-bit flags. Records `Version` and
/// `Flags` and returns both.
pub fn full_box(r: &mut Reader<'_>, out: &mut Attributes) -> Result<(u8, u32), ReadError> {
    let version = r.u8()?;
    out.insert("Version", version.into());
    let flags = r.u24()?;
    out.insert("Flags", AttrValue::hex(flags));
    Ok((version, flags))
}

/// `"N (S sec)"` rendering of a duration in timescale units.
pub fn duration_text(duration: u64, timescale: u32) -> AttrValue {
    if timescale == 0 {
        return AttrValue::decimal(duration);
    }
    AttrValue::Text(format!(
        "{} ({} sec)",
        duration,
        duration / u64::from(timescale)
    ))
}
