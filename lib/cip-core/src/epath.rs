//! Electronic path (EPath) decoding (C2).
//!
//! The wire format is `word_count(1) | segment*`, little-endian, padded: a logical segment with an
//! 8-bit value is `type_and_format(1) | value(1)`; 16- and 32-bit values insert a single pad byte
//! before the value. Only logical segments (class, instance, attribute, connection point) are
//! understood — anything else is `PathError::UnknownSegment`.

use crate::error::PathError;
use byteorder::{ByteOrder, LittleEndian};

/// A decoded electronic path. At minimum carries the addressed class and instance; attribute and
/// connection point are present only when the wire path included the corresponding segment.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct EPath {
    pub class_id: Option<u32>,
    pub instance_number: Option<u32>,
    pub attribute_number: Option<u16>,
    pub connection_point: Option<u32>,
}

const SEGMENT_TYPE_MASK: u8 = 0xE0;
const LOGICAL_SEGMENT: u8 = 0x20;

const LOGICAL_TYPE_CLASS: u8 = 0x00;
const LOGICAL_TYPE_INSTANCE: u8 = 0x01;
const LOGICAL_TYPE_CONNECTION_POINT: u8 = 0x03;
const LOGICAL_TYPE_ATTRIBUTE: u8 = 0x04;

const FORMAT_8_BIT: u8 = 0x00;
const FORMAT_16_BIT: u8 = 0x01;
const FORMAT_32_BIT: u8 = 0x02;

/// Decode an EPath starting at `data[0]` (the word-count byte). Returns the path and the total
/// number of bytes consumed, including the word-count byte itself.
pub fn decode(data: &[u8]) -> Result<(EPath, usize), PathError> {
    if data.is_empty() {
        return Err(PathError::Truncated);
    }

    let word_count = data[0] as usize;
    let total_len = 1 + word_count * 2;

    if data.len() < total_len {
        return Err(PathError::Truncated);
    }

    let mut cursor = &data[1..total_len];
    let mut path = EPath::default();

    while !cursor.is_empty() {
        let segment_byte = cursor[0];
        cursor = &cursor[1..];

        if segment_byte & SEGMENT_TYPE_MASK != LOGICAL_SEGMENT {
            return Err(PathError::UnknownSegment);
        }

        let logical_type = (segment_byte >> 2) & 0x07;
        let format = segment_byte & 0x03;

        let value = read_logical_value(&mut cursor, format)?;

        match logical_type {
            LOGICAL_TYPE_CLASS => path.class_id = Some(value),
            LOGICAL_TYPE_INSTANCE => path.instance_number = Some(value),
            LOGICAL_TYPE_ATTRIBUTE => path.attribute_number = Some(value as u16),
            LOGICAL_TYPE_CONNECTION_POINT => path.connection_point = Some(value),
            _ => return Err(PathError::UnknownSegment),
        }
    }

    Ok((path, total_len))
}

/// Reads the value of a single logical segment, consuming the pad byte for 16-/32-bit formats.
fn read_logical_value(cursor: &mut &[u8], format: u8) -> Result<u32, PathError> {
    match format {
        FORMAT_8_BIT => {
            if cursor.is_empty() {
                return Err(PathError::Truncated);
            }
            let value = cursor[0] as u32;
            *cursor = &cursor[1..];
            Ok(value)
        }
        FORMAT_16_BIT => {
            if cursor.len() < 3 {
                return Err(PathError::Truncated);
            }
            let value = LittleEndian::read_u16(&cursor[1..3]) as u32;
            *cursor = &cursor[3..];
            Ok(value)
        }
        FORMAT_32_BIT => {
            if cursor.len() < 5 {
                return Err(PathError::Truncated);
            }
            let value = LittleEndian::read_u32(&cursor[1..5]);
            *cursor = &cursor[5..];
            Ok(value)
        }
        _ => Err(PathError::UnknownSegment),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_class_and_instance_8_bit() {
        // word_count=2, class segment 0x99, instance segment 0x01
        let data = [0x02, 0x20, 0x99, 0x24, 0x01];

        let (path, consumed) = decode(&data).unwrap();

        assert_eq!(consumed, 5);
        assert_eq!(path.class_id, Some(0x99));
        assert_eq!(path.instance_number, Some(0x01));
        assert_eq!(path.attribute_number, None);
    }

    #[test]
    fn decodes_class_instance_and_attribute() {
        // word_count=3, class 0x01, instance 0x01, attribute 0x03
        let data = [0x03, 0x20, 0x01, 0x24, 0x01, 0x30, 0x03];

        let (path, consumed) = decode(&data).unwrap();

        assert_eq!(consumed, 7);
        assert_eq!(path.class_id, Some(0x01));
        assert_eq!(path.instance_number, Some(0x01));
        assert_eq!(path.attribute_number, Some(0x03));
    }

    #[test]
    fn decodes_16_bit_class_segment_with_pad() {
        // word_count=2, 16-bit class segment (type=class, format=16-bit), pad, value LE
        let data = [0x02, 0x21, 0x00, 0x34, 0x12];

        let (path, consumed) = decode(&data).unwrap();

        assert_eq!(consumed, 5);
        assert_eq!(path.class_id, Some(0x1234));
    }

    #[test]
    fn rejects_unknown_segment_type() {
        let data = [0x02, 0xFF, 0xFF, 0xFF, 0xFF];

        let err = decode(&data).unwrap_err();

        assert_eq!(err, PathError::UnknownSegment);
    }

    #[test]
    fn rejects_truncated_path() {
        // word_count claims 2 words (4 bytes) but only 2 are present
        let data = [0x02, 0x20, 0x99];

        let err = decode(&data).unwrap_err();

        assert_eq!(err, PathError::Truncated);
    }

    #[test]
    fn empty_path_is_truncated() {
        let err = decode(&[]).unwrap_err();

        assert_eq!(err, PathError::Truncated);
    }
}
