//! Embedded preview extraction for TIFF-based RAW containers.
//!
//! Camera RAW files (ARW, NEF, CR2, DNG, ...) are TIFF containers that carry
//! a JPEG preview next to the sensor data. Editing works on that preview;
//! sensor data is never demosaiced.
//!
//! # Search Order
//!
//! 1. SubIFDs of IFD0 (usually the largest preview)
//! 2. Every IFD in the main chain
//! 3. Marker scan for the largest `FFD8 .. FFD9` run

use super::ConversionError;

const TIFF_MAGIC_LE: [u8; 4] = [0x49, 0x49, 0x2A, 0x00]; // II + 42
const TIFF_MAGIC_BE: [u8; 4] = [0x4D, 0x4D, 0x00, 0x2A]; // MM + 42

const TAG_COMPRESSION: u16 = 0x0103;
const TAG_STRIP_OFFSETS: u16 = 0x0111;
const TAG_STRIP_BYTE_COUNTS: u16 = 0x0117;
const TAG_SUBIFD: u16 = 0x014A;
const TAG_JPEG_OFFSET: u16 = 0x0201;
const TAG_JPEG_LENGTH: u16 = 0x0202;

const COMPRESSION_JPEG: u32 = 6;
const COMPRESSION_JPEG_OLD: u32 = 7;

const MAX_IFD_ENTRIES: u16 = 1000;
const MAX_IFDS: usize = 32;
/// Previews smaller than this are EXIF thumbnails, not worth editing.
const MIN_SCAN_PREVIEW: usize = 50_000;

/// Check for a TIFF header.
pub fn is_tiff_container(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && (bytes[..4] == TIFF_MAGIC_LE || bytes[..4] == TIFF_MAGIC_BE)
}

/// Extract the largest embedded JPEG preview.
///
/// # Errors
///
/// `ConversionError::InvalidContainer` if the bytes are not TIFF,
/// `ConversionError::NoPreview` if no JPEG was found.
pub fn extract_preview(bytes: &[u8]) -> Result<Vec<u8>, ConversionError> {
    let tiff = Tiff::parse(bytes)?;

    let mut best: Option<&[u8]> = None;
    let mut visited = 0;
    let mut offset = tiff.first_ifd;
    while offset != 0 && visited < MAX_IFDS {
        let Some(ifd) = tiff.read_ifd(offset) else {
            break;
        };
        visited += 1;

        for sub in ifd.sub_ifds(&tiff) {
            if let Some(sub_ifd) = tiff.read_ifd(sub) {
                best = larger(best, sub_ifd.jpeg(&tiff));
            }
        }
        best = larger(best, ifd.jpeg(&tiff));
        offset = ifd.next;
    }

    if let Some(data) = best {
        return Ok(data.to_vec());
    }

    scan_for_jpeg(bytes)
        .map(<[u8]>::to_vec)
        .ok_or(ConversionError::NoPreview)
}

fn larger<'a>(current: Option<&'a [u8]>, candidate: Option<&'a [u8]>) -> Option<&'a [u8]> {
    match (current, candidate) {
        (Some(c), Some(n)) if n.len() > c.len() => Some(n),
        (None, n) => n,
        (c, _) => c,
    }
}

struct Tiff<'a> {
    bytes: &'a [u8],
    little_endian: bool,
    first_ifd: u32,
}

struct Entry {
    tag: u16,
    count: u32,
    value: u32,
}

struct Ifd {
    entries: Vec<Entry>,
    next: u32,
}

impl<'a> Tiff<'a> {
    fn parse(bytes: &'a [u8]) -> Result<Self, ConversionError> {
        if !is_tiff_container(bytes) {
            return Err(ConversionError::InvalidContainer(
                "missing TIFF header".to_string(),
            ));
        }
        let little_endian = bytes[..4] == TIFF_MAGIC_LE;
        let mut tiff = Self {
            bytes,
            little_endian,
            first_ifd: 0,
        };
        tiff.first_ifd = tiff
            .u32_at(4)
            .ok_or_else(|| ConversionError::InvalidContainer("truncated header".to_string()))?;
        Ok(tiff)
    }

    fn u16_at(&self, offset: usize) -> Option<u16> {
        let raw: [u8; 2] = self.bytes.get(offset..offset.checked_add(2)?)?.try_into().ok()?;
        Some(if self.little_endian {
            u16::from_le_bytes(raw)
        } else {
            u16::from_be_bytes(raw)
        })
    }

    fn u32_at(&self, offset: usize) -> Option<u32> {
        let raw: [u8; 4] = self.bytes.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
        Some(if self.little_endian {
            u32::from_le_bytes(raw)
        } else {
            u32::from_be_bytes(raw)
        })
    }

    fn read_ifd(&self, offset: u32) -> Option<Ifd> {
        let base = offset as usize;
        let count = self.u16_at(base)?;
        if count > MAX_IFD_ENTRIES {
            return None;
        }
        let mut entries = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let at = base + 2 + i * 12;
            let tag = self.u16_at(at)?;
            let typ = self.u16_at(at + 2)?;
            let n = self.u32_at(at + 4)?;
            // SHORT values sit in the first half of the value field
            let value = if typ == 3 && n == 1 {
                self.u16_at(at + 8)? as u32
            } else {
                self.u32_at(at + 8)?
            };
            entries.push(Entry {
                tag,
                count: n,
                value,
            });
        }
        let next = self.u32_at(base + 2 + count as usize * 12).unwrap_or(0);
        Some(Ifd { entries, next })
    }

    fn jpeg_slice(&self, offset: u32, length: u32) -> Option<&'a [u8]> {
        let start = offset as usize;
        let end = start.checked_add(length as usize)?;
        let data = self.bytes.get(start..end)?;
        (data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8).then_some(data)
    }
}

impl Ifd {
    fn get(&self, tag: u16) -> Option<&Entry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    fn sub_ifds(&self, tiff: &Tiff<'_>) -> Vec<u32> {
        match self.get(TAG_SUBIFD) {
            Some(entry) if entry.count == 1 => vec![entry.value],
            Some(entry) => (0..entry.count.min(MAX_IFDS as u32) as usize)
                .filter_map(|i| tiff.u32_at(entry.value as usize + i * 4))
                .collect(),
            None => Vec::new(),
        }
    }

    fn jpeg<'a>(&self, tiff: &Tiff<'a>) -> Option<&'a [u8]> {
        if let (Some(offset), Some(length)) = (self.get(TAG_JPEG_OFFSET), self.get(TAG_JPEG_LENGTH)) {
            if let Some(data) = tiff.jpeg_slice(offset.value, length.value) {
                return Some(data);
            }
        }

        let compressed = self
            .get(TAG_COMPRESSION)
            .is_some_and(|c| c.value == COMPRESSION_JPEG || c.value == COMPRESSION_JPEG_OLD);
        match (self.get(TAG_STRIP_OFFSETS), self.get(TAG_STRIP_BYTE_COUNTS)) {
            (Some(offset), Some(length)) if compressed && offset.count == 1 => {
                tiff.jpeg_slice(offset.value, length.value)
            }
            _ => None,
        }
    }
}

/// Largest SOI..EOI run above the size floor.
fn scan_for_jpeg(bytes: &[u8]) -> Option<&[u8]> {
    let mut best: Option<&[u8]> = None;
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == 0xFF && bytes[i + 1] == 0xD8 {
            let end = bytes[i + 2..]
                .windows(2)
                .rposition(|w| w == [0xFF, 0xD9])
                .map(|p| i + 2 + p + 2);
            if let Some(end) = end {
                let candidate = &bytes[i..end];
                if candidate.len() >= MIN_SCAN_PREVIEW {
                    best = larger(best, Some(candidate));
                }
                i = end;
                continue;
            }
            break;
        }
        i += 1;
    }
    best
}
