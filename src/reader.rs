use thiserror::Error;
use tracing::warn;

/// Failures raised while decoding class file bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassFileError {
    #[error("class file truncated at offset {offset} (wanted {wanted} bytes, {available} left)")]
    TruncatedInput {
        offset: usize,
        wanted: usize,
        available: usize,
    },
    #[error("unsupported constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },
}

/// Big-endian cursor over class file bytes.
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    pub fn read_u1(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u2(&mut self) -> Result<u16, ClassFileError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u4(&mut self) -> Result<u32, ClassFileError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u8(&mut self) -> Result<u64, ClassFileError> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ClassFileError> {
        let data = self.data;
        let start = self.offset;
        let slice = start
            .checked_add(len)
            .and_then(|end| data.get(start..end))
            .ok_or(ClassFileError::TruncatedInput {
                offset: start,
                wanted: len,
                available: self.remaining(),
            })?;
        self.offset = start + len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), ClassFileError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Read a u2 length-prefixed string. Invalid UTF-8 is replaced lossily.
    pub fn read_utf8(&mut self) -> Result<String, ClassFileError> {
        let len = self.read_u2()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// Constant pool tags defined by the JVM specification.
pub mod tag {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELDREF: u8 = 9;
    pub const METHODREF: u8 = 10;
    pub const INTERFACE_METHODREF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;
}

/// Decoded constant pool entry. Only name-bearing entries keep their payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    /// Second slot of a Long or Double entry, or slot zero.
    Unusable,
    Other(u8),
}

/// One-indexed constant pool table.
#[derive(Clone, Debug, Default)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Self, ClassFileError> {
        let count = reader.read_u2()?;
        let mut entries = Vec::with_capacity(count as usize);
        entries.push(Constant::Unusable);
        let mut index = 1u16;
        while index < count {
            let entry_tag = reader.read_u1()?;
            match entry_tag {
                tag::UTF8 => entries.push(Constant::Utf8(reader.read_utf8()?)),
                tag::CLASS => {
                    let name_index = reader.read_u2()?;
                    entries.push(Constant::Class { name_index });
                }
                tag::INTEGER | tag::FLOAT => {
                    reader.skip(4)?;
                    entries.push(Constant::Other(entry_tag));
                }
                tag::LONG | tag::DOUBLE => {
                    reader.skip(8)?;
                    entries.push(Constant::Other(entry_tag));
                    entries.push(Constant::Unusable);
                    index += 1;
                }
                tag::STRING | tag::METHOD_TYPE | tag::MODULE | tag::PACKAGE => {
                    reader.skip(2)?;
                    entries.push(Constant::Other(entry_tag));
                }
                tag::FIELDREF
                | tag::METHODREF
                | tag::INTERFACE_METHODREF
                | tag::NAME_AND_TYPE
                | tag::DYNAMIC
                | tag::INVOKE_DYNAMIC => {
                    reader.skip(4)?;
                    entries.push(Constant::Other(entry_tag));
                }
                tag::METHOD_HANDLE => {
                    reader.skip(3)?;
                    entries.push(Constant::Other(entry_tag));
                }
                _ => {
                    warn!(tag = entry_tag, index, "unknown constant pool tag");
                    return Err(ClassFileError::UnknownConstantTag {
                        tag: entry_tag,
                        index,
                    });
                }
            }
            index += 1;
        }
        Ok(Self { entries })
    }

    /// Number of slots including the unused slot zero.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize)
    }

    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.get(index) {
            Some(Constant::Utf8(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Resolve a Class entry to its dotted binary name.
    pub fn class_name(&self, index: u16) -> Option<String> {
        match self.get(index) {
            Some(Constant::Class { name_index }) => {
                self.utf8(*name_index).map(|name| name.replace('/', "."))
            }
            _ => None,
        }
    }
}
