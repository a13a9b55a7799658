//! Minimal EXIF parser for JPEG and TIFF files.
//!
//! Extracts the six fields the photo records need:
//! - Make (0x010F) and Model (0x0110) from IFD0
//! - FNumber (0x829D), ExposureTime (0x829A), ISOSpeedRatings (0x8827) and
//!   FocalLength (0x920A) from the Exif sub-IFD (pointer tag 0x8769)
//!
//! For JPEG: reads the TIFF block embedded in the APP1 marker (`Exif\0\0`).
//! For TIFF: reads the IFD chain directly.
//!
//! Rational values are returned unreduced as `(numerator, denominator)`;
//! formatting is the caller's concern. Any structural problem — truncated
//! file, bad magic, out-of-range offset — yields an empty summary rather
//! than an error: missing metadata degrades a photo record to "Unknown",
//! it never fails a build.

use std::path::Path;

/// EXIF fields extracted from an image file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifSummary {
    pub make: Option<String>,
    pub model: Option<String>,
    /// F-number as a rational, e.g. `(28, 10)` for f/2.8.
    pub f_number: Option<(u32, u32)>,
    /// Exposure time in seconds as a rational, e.g. `(1, 250)`.
    pub exposure: Option<(u32, u32)>,
    pub iso: Option<u32>,
    /// Focal length in millimetres as a rational.
    pub focal: Option<(u32, u32)>,
}

/// Read EXIF metadata from a file, dispatching by extension.
/// Returns default (empty) metadata on any parse failure.
pub fn read_exif(path: &Path) -> ExifSummary {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(_) => return ExifSummary::default(),
    };

    match ext.as_str() {
        "jpg" | "jpeg" => read_exif_from_jpeg(&bytes),
        "tif" | "tiff" => parse_tiff(&bytes),
        _ => ExifSummary::default(),
    }
}

// ---------------------------------------------------------------------------
// JPEG: locate the TIFF block inside APP1
// ---------------------------------------------------------------------------

const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Scan JPEG markers for APP1 (0xFF 0xE1) carrying an `Exif\0\0` payload.
fn read_exif_from_jpeg(data: &[u8]) -> ExifSummary {
    let mut pos = 0;
    while pos + 4 < data.len() {
        if data[pos] == 0xFF && data[pos + 1] == 0xE1 {
            let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            let seg_start = pos + 4;
            let seg_end = (pos + 2 + seg_len).min(data.len());
            let segment = &data[seg_start..seg_end];

            if segment.starts_with(EXIF_HEADER) {
                return parse_tiff(&segment[EXIF_HEADER.len()..]);
            }
        }

        // Advance: if 0xFF, skip marker + length; otherwise byte-by-byte
        if data[pos] == 0xFF && pos + 3 < data.len() && data[pos + 1] != 0x00 {
            let marker = data[pos + 1];
            // SOS (0xDA) means image data starts — stop scanning
            if marker == 0xDA {
                break;
            }
            // Markers without length field
            if marker == 0xD8 || marker == 0xD9 || (0xD0..=0xD7).contains(&marker) {
                pos += 2;
            } else {
                let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                pos += 2 + len;
            }
        } else {
            pos += 1;
        }
    }
    ExifSummary::default()
}

// ---------------------------------------------------------------------------
// TIFF IFD walk
// ---------------------------------------------------------------------------

const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_EXPOSURE_TIME: u16 = 0x829A;
const TAG_F_NUMBER: u16 = 0x829D;
const TAG_ISO: u16 = 0x8827;
const TAG_FOCAL_LENGTH: u16 = 0x920A;

/// A TIFF byte buffer with its detected byte order.
struct Tiff<'a> {
    data: &'a [u8],
    big_endian: bool,
}

/// One parsed IFD entry. `value_slot` points at the 4-byte value/offset field.
struct IfdEntry {
    tag: u16,
    typ: u16,
    count: usize,
    value_slot: usize,
}

impl<'a> Tiff<'a> {
    fn new(data: &'a [u8]) -> Option<Self> {
        if data.len() < 8 {
            return None;
        }
        let big_endian = match &data[0..2] {
            b"MM" => true,
            b"II" => false,
            _ => return None,
        };
        let tiff = Tiff { data, big_endian };
        // Verify TIFF magic (42)
        if tiff.u16_at(2)? != 42 {
            return None;
        }
        Some(tiff)
    }

    fn u16_at(&self, offset: usize) -> Option<u16> {
        self.u16_from(self.data.get(offset..)?)
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        self.u32_from(self.data.get(offset..)?)
    }

    /// TIFF type sizes: count is number of values, not bytes.
    fn type_size(typ: u16) -> usize {
        match typ {
            1 | 2 | 6 | 7 => 1, // BYTE, ASCII, SBYTE, UNDEFINED
            3 | 8 => 2,         // SHORT, SSHORT
            4 | 9 | 11 => 4,    // LONG, SLONG, FLOAT
            5 | 10 | 12 => 8,   // RATIONAL, SRATIONAL, DOUBLE
            _ => 1,
        }
    }

    /// Entries of the IFD at `offset`, bounds-checked.
    fn entries(&self, offset: usize) -> Vec<IfdEntry> {
        let Some(entry_count) = self.u16_at(offset) else {
            return Vec::new();
        };
        let entries_start = offset + 2;

        (0..entry_count as usize)
            .filter_map(|i| {
                let at = entries_start + i * 12;
                Some(IfdEntry {
                    tag: self.u16_at(at)?,
                    typ: self.u16_at(at + 2)?,
                    count: self.u32_at(at + 4)? as usize,
                    value_slot: at + 8,
                })
            })
            .collect()
    }

    /// Resolve an entry's value bytes. Values of four bytes or fewer are
    /// stored inline in the value slot; larger values live at an offset.
    fn value_bytes(&self, entry: &IfdEntry) -> Option<&'a [u8]> {
        let byte_len = entry.count.checked_mul(Self::type_size(entry.typ))?;
        if byte_len <= 4 {
            self.data.get(entry.value_slot..entry.value_slot + byte_len)
        } else {
            let offset = self.u32_at(entry.value_slot)? as usize;
            self.data.get(offset..offset.checked_add(byte_len)?)
        }
    }

    fn u16_from(&self, bytes: &[u8]) -> Option<u16> {
        let bytes: [u8; 2] = bytes.get(..2)?.try_into().ok()?;
        Some(if self.big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    }

    fn u32_from(&self, bytes: &[u8]) -> Option<u32> {
        let bytes: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        Some(if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }

    fn ascii(&self, entry: &IfdEntry) -> Option<String> {
        let bytes = self.value_bytes(entry)?;
        let text = String::from_utf8_lossy(bytes)
            .trim_end_matches('\0')
            .trim()
            .to_string();
        (!text.is_empty()).then_some(text)
    }

    fn rational(&self, entry: &IfdEntry) -> Option<(u32, u32)> {
        if entry.typ != 5 || entry.count == 0 {
            return None;
        }
        let bytes = self.value_bytes(entry)?;
        Some((self.u32_from(bytes)?, self.u32_from(bytes.get(4..)?)?))
    }

    fn unsigned(&self, entry: &IfdEntry) -> Option<u32> {
        let bytes = self.value_bytes(entry)?;
        match entry.typ {
            3 => self.u16_from(bytes).map(u32::from),
            4 => self.u32_from(bytes),
            _ => None,
        }
    }
}

/// Parse a TIFF block: IFD0 for camera identity, Exif sub-IFD for exposure
/// settings. Unknown tags are skipped; chained IFDs are followed.
fn parse_tiff(data: &[u8]) -> ExifSummary {
    let Some(tiff) = Tiff::new(data) else {
        return ExifSummary::default();
    };
    let mut summary = ExifSummary::default();

    let Some(mut ifd_offset) = tiff.u32_at(4).map(|o| o as usize) else {
        return summary;
    };

    // Cap the chain walk: corrupt files can point IFDs at each other.
    let mut hops = 0;
    while ifd_offset > 0 && ifd_offset + 2 < data.len() && hops < 32 {
        hops += 1;
        let entries = tiff.entries(ifd_offset);

        for entry in &entries {
            match entry.tag {
                TAG_MAKE => summary.make = tiff.ascii(entry),
                TAG_MODEL => summary.model = tiff.ascii(entry),
                TAG_EXIF_IFD => {
                    if let Some(sub_offset) = tiff.unsigned(entry) {
                        parse_exif_sub_ifd(&tiff, sub_offset as usize, &mut summary);
                    }
                }
                _ => {}
            }
        }

        // Next IFD offset
        let next_offset_pos = ifd_offset + 2 + entries.len() * 12;
        match tiff.u32_at(next_offset_pos) {
            Some(next) => ifd_offset = next as usize,
            None => break,
        }
    }

    summary
}

fn parse_exif_sub_ifd(tiff: &Tiff<'_>, offset: usize, summary: &mut ExifSummary) {
    for entry in tiff.entries(offset) {
        match entry.tag {
            TAG_EXPOSURE_TIME => summary.exposure = tiff.rational(&entry),
            TAG_F_NUMBER => summary.f_number = tiff.rational(&entry),
            TAG_ISO => summary.iso = tiff.unsigned(&entry),
            TAG_FOCAL_LENGTH => summary.focal = tiff.rational(&entry),
            _ => {}
        }
    }
}
