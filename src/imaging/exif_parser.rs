//! Minimal EXIF reader producing the "computed" field set.
//!
//! Only JPEG carries EXIF here. The reader walks the JPEG marker segments up
//! to start-of-scan and derives:
//!
//! | Field | Source |
//! |---|---|
//! | `Width`, `Height`, `IsColor`, `html` | SOFn frame header |
//! | `ByteOrderMotorola` | APP1 `Exif\0\0` TIFF header (`MM` = 1, `II` = 0) |
//! | `Copyright` | IFD0 tag 0x8298 |
//! | `ApertureFNumber` | Exif sub-IFD tag 0x829D (`f/2.8`) |
//!
//! Returns `None` for non-JPEG input or a missing frame header.

use crate::codec::MetaMap;
use std::path::Path;

const SOI: [u8; 2] = [0xFF, 0xD8];
const APP1: u8 = 0xE1;
const SOS: u8 = 0xDA;
const EXIF_HEADER: &[u8] = b"Exif\0\0";

const TAG_COPYRIGHT: u16 = 0x8298;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_FNUMBER: u16 = 0x829D;

const TYPE_ASCII: u16 = 2;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

/// Read the computed EXIF fields of a file.
pub fn read_computed(path: &Path) -> Option<MetaMap> {
    let bytes = std::fs::read(path).ok()?;
    computed_from_jpeg(&bytes)
}

fn computed_from_jpeg(data: &[u8]) -> Option<MetaMap> {
    if !data.starts_with(&SOI) {
        return None;
    }

    let mut frame = None;
    let mut tiff = None;
    for (marker, segment) in JpegSegments::new(data) {
        if is_sof(marker) && frame.is_none() {
            frame = parse_frame(segment);
        } else if marker == APP1 && tiff.is_none() && segment.starts_with(EXIF_HEADER) {
            tiff = Some(&segment[EXIF_HEADER.len()..]);
        }
    }

    let frame = frame?;
    let mut computed = MetaMap::new();
    computed.insert(
        "html".into(),
        toml::Value::String(format!(
            "width=\"{}\" height=\"{}\"",
            frame.width, frame.height
        )),
    );
    computed.insert("Height".into(), toml::Value::Integer(frame.height.into()));
    computed.insert("Width".into(), toml::Value::Integer(frame.width.into()));
    computed.insert(
        "IsColor".into(),
        toml::Value::Integer(i64::from(frame.components >= 3)),
    );

    if let Some(tiff) = tiff.and_then(Tiff::parse) {
        computed.insert(
            "ByteOrderMotorola".into(),
            toml::Value::Integer(i64::from(tiff.big_endian)),
        );
        tiff.read_tags(&mut computed);
    }

    Some(computed)
}

// ---------------------------------------------------------------------------
// JPEG segment walking
// ---------------------------------------------------------------------------

/// Iterator over `(marker, payload)` pairs up to start-of-scan.
struct JpegSegments<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> JpegSegments<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 2 }
    }
}

impl<'a> Iterator for JpegSegments<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.data;
        loop {
            if self.pos + 4 > data.len() {
                return None;
            }
            if data[self.pos] != 0xFF {
                self.pos += 1;
                continue;
            }
            let marker = data[self.pos + 1];
            // Fill bytes and stuffed zeros
            if marker == 0xFF || marker == 0x00 {
                self.pos += 1;
                continue;
            }
            if marker == SOS {
                return None;
            }
            // Markers without a length field
            if marker == 0xD8 || marker == 0xD9 || (0xD0..=0xD7).contains(&marker) {
                self.pos += 2;
                continue;
            }
            let len = u16::from_be_bytes([data[self.pos + 2], data[self.pos + 3]]) as usize;
            if len < 2 {
                return None;
            }
            let start = self.pos + 4;
            let end = (self.pos + 2 + len).min(data.len());
            self.pos += 2 + len;
            return Some((marker, &data[start..end]));
        }
    }
}

/// SOF0..SOF15, excluding DHT (C4), JPG (C8) and DAC (CC).
fn is_sof(marker: u8) -> bool {
    (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC)
}

struct Frame {
    width: u32,
    height: u32,
    components: u8,
}

/// SOF payload: precision (1), height (2), width (2), components (1).
fn parse_frame(segment: &[u8]) -> Option<Frame> {
    if segment.len() < 6 {
        return None;
    }
    Some(Frame {
        height: u16::from_be_bytes([segment[1], segment[2]]).into(),
        width: u16::from_be_bytes([segment[3], segment[4]]).into(),
        components: segment[5],
    })
}

// ---------------------------------------------------------------------------
// TIFF / IFD parsing
// ---------------------------------------------------------------------------

struct Tiff<'a> {
    data: &'a [u8],
    big_endian: bool,
    ifd0: usize,
}

struct IfdEntry {
    tag: u16,
    kind: u16,
    count: u32,
    /// Offset of the 4-byte value/offset field within the TIFF data.
    value_pos: usize,
}

impl<'a> Tiff<'a> {
    fn parse(data: &'a [u8]) -> Option<Self> {
        let big_endian = match data.get(..2)? {
            b"MM" => true,
            b"II" => false,
            _ => return None,
        };
        let mut tiff = Self {
            data,
            big_endian,
            ifd0: 0,
        };
        if tiff.u16_at(2)? != 42 {
            return None;
        }
        tiff.ifd0 = tiff.u32_at(4)? as usize;
        Some(tiff)
    }

    fn u16_at(&self, pos: usize) -> Option<u16> {
        let bytes: [u8; 2] = self.data.get(pos..pos + 2)?.try_into().ok()?;
        Some(if self.big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    }

    fn u32_at(&self, pos: usize) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(pos..pos + 4)?.try_into().ok()?;
        Some(if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }

    fn entries(&self, ifd: usize) -> Vec<IfdEntry> {
        let Some(count) = self.u16_at(ifd) else {
            return Vec::new();
        };
        (0..count as usize)
            .map_while(|i| {
                let pos = ifd + 2 + i * 12;
                Some(IfdEntry {
                    tag: self.u16_at(pos)?,
                    kind: self.u16_at(pos + 2)?,
                    count: self.u32_at(pos + 4)?,
                    value_pos: pos + 8,
                })
            })
            .collect()
    }

    fn ascii(&self, entry: &IfdEntry) -> Option<String> {
        if entry.kind != TYPE_ASCII {
            return None;
        }
        let len = entry.count as usize;
        let start = if len <= 4 {
            entry.value_pos
        } else {
            self.u32_at(entry.value_pos)? as usize
        };
        let raw = self.data.get(start..start.checked_add(len)?)?;
        let text = String::from_utf8_lossy(raw)
            .trim_end_matches('\0')
            .trim()
            .to_string();
        (!text.is_empty()).then_some(text)
    }

    fn rational(&self, entry: &IfdEntry) -> Option<f64> {
        if entry.kind != TYPE_RATIONAL {
            return None;
        }
        let offset = self.u32_at(entry.value_pos)? as usize;
        let num = self.u32_at(offset)?;
        let den = self.u32_at(offset + 4)?;
        (den != 0).then(|| num as f64 / den as f64)
    }

    fn read_tags(&self, computed: &mut MetaMap) {
        let mut exif_ifd = None;
        for entry in self.entries(self.ifd0) {
            match entry.tag {
                TAG_COPYRIGHT => {
                    if let Some(text) = self.ascii(&entry) {
                        computed.insert("Copyright".into(), toml::Value::String(text));
                    }
                }
                TAG_EXIF_IFD if entry.kind == TYPE_LONG => {
                    exif_ifd = self.u32_at(entry.value_pos).map(|v| v as usize);
                }
                _ => {}
            }
        }

        let Some(exif_ifd) = exif_ifd else {
            return;
        };
        for entry in self.entries(exif_ifd) {
            if entry.tag == TAG_FNUMBER
                && let Some(fnumber) = self.rational(&entry)
            {
                computed.insert(
                    "ApertureFNumber".into(),
                    toml::Value::String(format!("f/{fnumber:.1}")),
                );
            }
        }
    }
}
