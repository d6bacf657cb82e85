use crate::boxes::FourCC;

/// Typed view over the box types the decoder knows about.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // File-level / segment-level
    Ftyp,
    Styp,
    Moov,
    Mdat,
    Free,
    Skip,
    Sidx,
    Emsg,
    Pssh,
    Mfra,
    Tfra,
    Mfro,
    Uuid,

    // moov / trak / mdia
    Mvhd,
    Trak,
    Tkhd,
    Edts,
    Elst,
    Mdia,
    Mdhd,
    Hdlr,
    Minf,
    Vmhd,
    Smhd,
    Sthd,
    Dinf,
    Dref,
    Udta,
    Meta,

    // stbl
    Stbl,
    Stsd,
    Stts,
    Ctts,
    Stsc,
    Stsz,
    Stco,
    Co64,
    Stss,
    Sdtp,
    Sbgp,
    Sgpd,

    // Sample entries and codec configuration
    Avc1,
    Avc3,
    Hvc1,
    Hev1,
    Encv,
    Mp4a,
    Enca,
    Stpp,
    Avcc,
    Hvcc,
    Esds,
    Pasp,

    // Fragments
    Mvex,
    Mehd,
    Trex,
    Moof,
    Mfhd,
    Traf,
    Tfhd,
    Tfdt,
    Trun,
    Tfad,

    // Protection
    Sinf,
    Frma,
    Schm,
    Schi,
    Tenc,
    Saiz,
    Saio,

    // Anything else
    Unknown(FourCC),
}

/// How the scanner treats a box body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxClass {
    /// Fields only, no nested boxes.
    Leaf,
    /// Nested boxes only, starting right after the header.
    Container,
    /// Fixed fields first, then nested boxes from where the fields end.
    ContainerWithFields,
}

impl BoxClass {
    pub fn has_fields(self) -> bool {
        !matches!(self, BoxClass::Container)
    }

    pub fn has_children(self) -> bool {
        !matches!(self, BoxClass::Leaf)
    }
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => KnownBox::Ftyp,
            b"styp" => KnownBox::Styp,
            b"moov" => KnownBox::Moov,
            b"mdat" => KnownBox::Mdat,
            b"free" => KnownBox::Free,
            b"skip" => KnownBox::Skip,
            b"sidx" => KnownBox::Sidx,
            b"emsg" => KnownBox::Emsg,
            b"pssh" => KnownBox::Pssh,
            b"mfra" => KnownBox::Mfra,
            b"tfra" => KnownBox::Tfra,
            b"mfro" => KnownBox::Mfro,
            b"uuid" => KnownBox::Uuid,

            b"mvhd" => KnownBox::Mvhd,
            b"trak" => KnownBox::Trak,
            b"tkhd" => KnownBox::Tkhd,
            b"edts" => KnownBox::Edts,
            b"elst" => KnownBox::Elst,
            b"mdia" => KnownBox::Mdia,
            b"mdhd" => KnownBox::Mdhd,
            b"hdlr" => KnownBox::Hdlr,
            b"minf" => KnownBox::Minf,
            b"vmhd" => KnownBox::Vmhd,
            b"smhd" => KnownBox::Smhd,
            b"sthd" => KnownBox::Sthd,
            b"dinf" => KnownBox::Dinf,
            b"dref" => KnownBox::Dref,
            b"udta" => KnownBox::Udta,
            b"meta" => KnownBox::Meta,

            b"stbl" => KnownBox::Stbl,
            b"stsd" => KnownBox::Stsd,
            b"stts" => KnownBox::Stts,
            b"ctts" => KnownBox::Ctts,
            b"stsc" => KnownBox::Stsc,
            b"stsz" => KnownBox::Stsz,
            b"stco" => KnownBox::Stco,
            b"co64" => KnownBox::Co64,
            b"stss" => KnownBox::Stss,
            b"sdtp" => KnownBox::Sdtp,
            b"sbgp" => KnownBox::Sbgp,
            b"sgpd" => KnownBox::Sgpd,

            b"avc1" => KnownBox::Avc1,
            b"avc3" => KnownBox::Avc3,
            b"hvc1" => KnownBox::Hvc1,
            b"hev1" => KnownBox::Hev1,
            b"encv" => KnownBox::Encv,
            b"mp4a" => KnownBox::Mp4a,
            b"enca" => KnownBox::Enca,
            b"stpp" => KnownBox::Stpp,
            b"avcC" => KnownBox::Avcc,
            b"hvcC" => KnownBox::Hvcc,
            b"esds" => KnownBox::Esds,
            b"pasp" => KnownBox::Pasp,

            b"mvex" => KnownBox::Mvex,
            b"mehd" => KnownBox::Mehd,
            b"trex" => KnownBox::Trex,
            b"moof" => KnownBox::Moof,
            b"mfhd" => KnownBox::Mfhd,
            b"traf" => KnownBox::Traf,
            b"tfhd" => KnownBox::Tfhd,
            b"tfdt" => KnownBox::Tfdt,
            b"trun" => KnownBox::Trun,
            b"tfad" => KnownBox::Tfad,

            b"sinf" => KnownBox::Sinf,
            b"frma" => KnownBox::Frma,
            b"schm" => KnownBox::Schm,
            b"schi" => KnownBox::Schi,
            b"tenc" => KnownBox::Tenc,
            b"saiz" => KnownBox::Saiz,
            b"saio" => KnownBox::Saio,

            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    /// Container / leaf / container-with-fields classification.
    pub fn class(&self) -> BoxClass {
        match self {
            KnownBox::Moov
            | KnownBox::Moof
            | KnownBox::Trak
            | KnownBox::Traf
            | KnownBox::Tfad
            | KnownBox::Mvex
            | KnownBox::Mdia
            | KnownBox::Minf
            | KnownBox::Dinf
            | KnownBox::Stbl
            | KnownBox::Sinf
            | KnownBox::Mfra
            | KnownBox::Udta
            | KnownBox::Schi
            | KnownBox::Edts => BoxClass::Container,

            KnownBox::Stsd
            | KnownBox::Meta
            | KnownBox::Avc1
            | KnownBox::Avc3
            | KnownBox::Hvc1
            | KnownBox::Hev1
            | KnownBox::Encv
            | KnownBox::Mp4a
            | KnownBox::Enca => BoxClass::ContainerWithFields,

            // skip is free space like free, so its body is never scanned
            KnownBox::Skip => BoxClass::Leaf,

            _ => BoxClass::Leaf,
        }
    }

    pub fn is_container(&self) -> bool {
        self.class().has_children()
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Styp => "Segment Type Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Free => "Free Space Box",
            KnownBox::Skip => "Free Space Box",
            KnownBox::Sidx => "Segment Index Box",
            KnownBox::Emsg => "Event Message Box",
            KnownBox::Pssh => "Protection System Specific Header Box",
            KnownBox::Mfra => "Movie Fragment Random Access Box",
            KnownBox::Tfra => "Track Fragment Random Access Box",
            KnownBox::Mfro => "Movie Fragment Random Access Offset Box",
            KnownBox::Uuid => "User Extension Box",

            KnownBox::Mvhd => "Movie Header Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Edts => "Edit Box",
            KnownBox::Elst => "Edit List Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Vmhd => "Video Media Header Box",
            KnownBox::Smhd => "Sound Media Header Box",
            KnownBox::Sthd => "Subtitle Media Header Box",
            KnownBox::Dinf => "Data Information Box",
            KnownBox::Dref => "Data Reference Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Meta => "Meta Box",

            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Stts => "Decoding Time to Sample Box",
            KnownBox::Ctts => "Composition Time to Sample Box",
            KnownBox::Stsc => "Sample To Chunk Box",
            KnownBox::Stsz => "Sample Size Box",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Co64 => "Chunk Large Offset Box",
            KnownBox::Stss => "Sync Sample Box",
            KnownBox::Sdtp => "Independent and Disposable Samples Box",
            KnownBox::Sbgp => "Sample To Group Box",
            KnownBox::Sgpd => "Sample Group Description Box",

            KnownBox::Avc1 | KnownBox::Avc3 => "AVC Sample Entry",
            KnownBox::Hvc1 | KnownBox::Hev1 => "HEVC Sample Entry",
            KnownBox::Encv => "Encrypted Video Sample Entry",
            KnownBox::Mp4a => "MPEG-4 Audio Sample Entry",
            KnownBox::Enca => "Encrypted Audio Sample Entry",
            KnownBox::Stpp => "XML Subtitle Sample Entry",
            KnownBox::Avcc => "AVC Configuration Box",
            KnownBox::Hvcc => "HEVC Configuration Box",
            KnownBox::Esds => "Elementary Stream Descriptor Box",
            KnownBox::Pasp => "Pixel Aspect Ratio Box",

            KnownBox::Mvex => "Movie Extends Box",
            KnownBox::Mehd => "Movie Extends Header Box",
            KnownBox::Trex => "Track Extends Box",
            KnownBox::Moof => "Movie Fragment Box",
            KnownBox::Mfhd => "Movie Fragment Header Box",
            KnownBox::Traf => "Track Fragment Box",
            KnownBox::Tfhd => "Track Fragment Header Box",
            KnownBox::Tfdt => "Track Fragment Decode Time Box",
            KnownBox::Trun => "Track Run Box",
            KnownBox::Tfad => "Track Fragment Adjustment Box",

            KnownBox::Sinf => "Protection Scheme Information Box",
            KnownBox::Frma => "Original Format Box",
            KnownBox::Schm => "Scheme Type Box",
            KnownBox::Schi => "Scheme Information Box",
            KnownBox::Tenc => "Track Encryption Box",
            KnownBox::Saiz => "Sample Auxiliary Information Sizes Box",
            KnownBox::Saio => "Sample Auxiliary Information Offsets Box",

            KnownBox::Unknown(_) => "Unknown Box",
        }
    }
}
