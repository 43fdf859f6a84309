//! Sparse byte image backed by Intel-HEX files

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use ihex::Record;
use thiserror::Error;

/// Value of bytes absent from the image
pub const ERASED_BYTE: u8 = 0xFF;

/// Longest data record emitted when serialising
const RECORD_LEN: usize = 16;

/// Intel-HEX errors
#[derive(Debug, Error)]
pub enum HexError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed record
    #[error("invalid Intel HEX: {0}")]
    Parse(#[from] ihex::ReaderError),

    /// Record could not be encoded
    #[error("cannot encode Intel HEX: {0}")]
    Write(#[from] ihex::WriterError),
}

/// Sparse byte-addressed memory image
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexImage {
    bytes: BTreeMap<u32, u8>,
}

impl HexImage {
    /// Create an empty image
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte at `addr`, 0xFF if unset
    pub fn get_byte(&self, addr: u32) -> u8 {
        self.bytes.get(&addr).copied().unwrap_or(ERASED_BYTE)
    }

    /// Set the byte at `addr`
    pub fn set_byte(&mut self, addr: u32, value: u8) {
        self.bytes.insert(addr, value);
    }

    /// Whether `addr` holds a value
    pub fn contains(&self, addr: u32) -> bool {
        self.bytes.contains_key(&addr)
    }

    /// Set byte addresses in ascending order
    pub fn addresses(&self) -> impl Iterator<Item = u32> + '_ {
        self.bytes.keys().copied()
    }

    /// Set bytes in ascending address order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u8)> + '_ {
        self.bytes.iter().map(|(&a, &v)| (a, v))
    }

    /// Number of set bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether no byte is set
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parse Intel-HEX text
    pub fn from_ihex(text: &str) -> Result<Self, HexError> {
        let mut image = Self::new();
        let mut base = 0u32;

        for record in ihex::Reader::new(text) {
            match record? {
                Record::Data { offset, value } => {
                    let start = base.wrapping_add(u32::from(offset));
                    for (i, byte) in value.into_iter().enumerate() {
                        image.set_byte(start.wrapping_add(i as u32), byte);
                    }
                }
                Record::ExtendedLinearAddress(upper) => base = u32::from(upper) << 16,
                Record::ExtendedSegmentAddress(segment) => base = u32::from(segment) << 4,
                Record::EndOfFile => break,
                Record::StartLinearAddress(_) | Record::StartSegmentAddress { .. } => {}
            }
        }

        log::debug!("hex: parsed {} bytes", image.len());
        Ok(image)
    }

    /// Serialise to Intel-HEX text
    ///
    /// Consecutive bytes are grouped into data records of up to 16 bytes,
    /// never crossing a 64 KiB boundary.
    pub fn to_ihex(&self) -> Result<String, HexError> {
        let mut records = Vec::new();
        let mut upper: Option<u16> = None;
        let mut start = 0u32;
        let mut chunk: Vec<u8> = Vec::with_capacity(RECORD_LEN);

        let mut flush = |start: u32, chunk: &mut Vec<u8>, records: &mut Vec<Record>| {
            if chunk.is_empty() {
                return;
            }
            let high = (start >> 16) as u16;
            if upper != Some(high) {
                records.push(Record::ExtendedLinearAddress(high));
                upper = Some(high);
            }
            records.push(Record::Data {
                offset: (start & 0xFFFF) as u16,
                value: std::mem::take(chunk),
            });
        };

        for (addr, value) in self.iter() {
            let next = start.wrapping_add(chunk.len() as u32);
            let breaks = addr != next || chunk.len() == RECORD_LEN || addr >> 16 != start >> 16;
            if chunk.is_empty() || breaks {
                flush(start, &mut chunk, &mut records);
                start = addr;
            }
            chunk.push(value);
        }
        flush(start, &mut chunk, &mut records);
        records.push(Record::EndOfFile);

        Ok(ihex::create_object_file_representation(&records)?)
    }

    /// Load an Intel-HEX file
    pub fn load(path: &Path) -> Result<Self, HexError> {
        let text = fs::read_to_string(path)?;
        Self::from_ihex(&text)
    }

    /// Write the image to an Intel-HEX file
    pub fn save(&self, path: &Path) -> Result<(), HexError> {
        let mut text = self.to_ihex()?;
        text.push('\n');
        fs::write(path, text)?;
        Ok(())
    }
}

impl FromIterator<(u32, u8)> for HexImage {
    fn from_iter<I: IntoIterator<Item = (u32, u8)>>(iter: I) -> Self {
        Self {
            bytes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_bytes_read_erased() {
        let mut image = HexImage::new();
        assert_eq!(image.get_byte(0x1234), 0xFF);
        image.set_byte(0x1234, 0x00);
        assert_eq!(image.get_byte(0x1234), 0x00);
        assert!(image.contains(0x1234));
        assert!(!image.contains(0x1235));
    }

    #[test]
    fn test_parse_extended_linear_address() {
        let text = ":020000040001F9\n:04000000010203FFF7\n:00000001FF\n";
        let image = HexImage::from_ihex(text).unwrap();
        let addrs: Vec<u32> = image.addresses().collect();
        assert_eq!(addrs, [0x1_0000, 0x1_0001, 0x1_0002, 0x1_0003]);
        assert_eq!(image.get_byte(0x1_0002), 0x03);
    }

    #[test]
    fn test_parse_rejects_bad_checksum() {
        assert!(matches!(
            HexImage::from_ihex(":0400000001020304F0\n"),
            Err(HexError::Parse(_))
        ));
    }

    #[test]
    fn test_serialise_splits_records() {
        let image: HexImage = (0..20u32)
            .map(|i| (i, i as u8))
            .chain([(0x3E_0000, 0xAA)])
            .collect();
        let text = image.to_ihex().unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // ELA 0, 16-byte record, 4-byte record, ELA 0x3E, 1-byte record, EOF
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], ":020000040000FA");
        assert!(lines[1].starts_with(":10000000"));
        assert!(lines[2].starts_with(":04001000"));
        assert_eq!(lines[3], ":02000004003EBC");
        assert_eq!(lines[5], ":00000001FF");

        assert_eq!(HexImage::from_ihex(&text).unwrap(), image);
    }

    #[test]
    fn test_load_save() {
        let path = std::env::temp_dir().join(format!("pic24prog-image-{}.hex", std::process::id()));
        let image: HexImage = [(0u32, 0x12u8), (1, 0x34), (0xF8_0000 << 1, 0x0F)]
            .into_iter()
            .collect();
        image.save(&path).unwrap();
        let loaded = HexImage::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, image);
    }
}
