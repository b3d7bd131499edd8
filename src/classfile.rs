use serde::Serialize;

use crate::reader::{ByteReader, ClassFileError, ConstantPool};

pub const CLASS_MAGIC: u32 = 0xCAFEBABE;

const ACC_PUBLIC: u16 = 0x0001;
const ACC_FINAL: u16 = 0x0010;
const ACC_INTERFACE: u16 = 0x0200;
const ACC_ABSTRACT: u16 = 0x0400;

/// Header-level facts extracted from one class file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClassFileInfo {
    pub class_name: String,
    pub package_name: Option<String>,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub major_version: u16,
    pub minor_version: u16,
    pub access_flags: u16,
    pub is_public: bool,
    pub is_interface: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    pub annotation_count: usize,
}

impl ClassFileInfo {
    pub fn simple_name(&self) -> &str {
        self.class_name
            .rsplit_once('.')
            .map(|(_, name)| name)
            .unwrap_or(&self.class_name)
    }

    pub fn java_version(&self) -> JavaVersion {
        JavaVersion::from_major(self.major_version)
    }
}

/// Java release implied by a class file major version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JavaVersion {
    #[default]
    Unknown,
    Jdk1_1,
    Jdk1_2,
    Jdk1_3,
    Jdk1_4,
    Jdk1_5,
    Jdk1_6,
    Jdk1_7,
    Jdk1_8,
    Jdk9,
    Jdk10,
    Jdk11,
    Jdk12,
    Jdk13,
    Jdk14,
    Jdk15,
    Jdk16,
    Jdk17,
    Jdk18,
    Jdk19,
    Jdk20,
    Jdk21,
}

impl JavaVersion {
    pub fn from_major(major: u16) -> Self {
        match major {
            45 => Self::Jdk1_1,
            46 => Self::Jdk1_2,
            47 => Self::Jdk1_3,
            48 => Self::Jdk1_4,
            49 => Self::Jdk1_5,
            50 => Self::Jdk1_6,
            51 => Self::Jdk1_7,
            52 => Self::Jdk1_8,
            53 => Self::Jdk9,
            54 => Self::Jdk10,
            55 => Self::Jdk11,
            56 => Self::Jdk12,
            57 => Self::Jdk13,
            58 => Self::Jdk14,
            59 => Self::Jdk15,
            60 => Self::Jdk16,
            61 => Self::Jdk17,
            62 => Self::Jdk18,
            63 => Self::Jdk19,
            64 => Self::Jdk20,
            65 => Self::Jdk21,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Jdk1_1 => "1.1",
            Self::Jdk1_2 => "1.2",
            Self::Jdk1_3 => "1.3",
            Self::Jdk1_4 => "1.4",
            Self::Jdk1_5 => "1.5",
            Self::Jdk1_6 => "1.6",
            Self::Jdk1_7 => "1.7",
            Self::Jdk1_8 => "1.8",
            Self::Jdk9 => "9",
            Self::Jdk10 => "10",
            Self::Jdk11 => "11",
            Self::Jdk12 => "12",
            Self::Jdk13 => "13",
            Self::Jdk14 => "14",
            Self::Jdk15 => "15",
            Self::Jdk16 => "16",
            Self::Jdk17 => "17",
            Self::Jdk18 => "18",
            Self::Jdk19 => "19",
            Self::Jdk20 => "20",
            Self::Jdk21 => "21",
        }
    }
}

impl Serialize for JavaVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for JavaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse the header of a class file.
///
/// Returns `Ok(None)` when the magic number does not match. Field and method
/// tables are skipped by length; bytecode is never decoded.
pub fn parse_class_file(
    data: &[u8],
    entry_name: &str,
) -> Result<Option<ClassFileInfo>, ClassFileError> {
    let mut reader = ByteReader::new(data);
    if reader.read_u4()? != CLASS_MAGIC {
        return Ok(None);
    }
    let minor_version = reader.read_u2()?;
    let major_version = reader.read_u2()?;
    let constant_pool = ConstantPool::decode(&mut reader)?;
    let access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;

    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        let index = reader.read_u2()?;
        if let Some(name) = constant_pool.class_name(index) {
            interfaces.push(name);
        }
    }

    skip_members(&mut reader)?;
    skip_members(&mut reader)?;
    let annotation_count = read_class_attributes(&mut reader, &constant_pool)?;

    let class_name = constant_pool
        .class_name(this_class)
        .unwrap_or_else(|| class_name_from_entry(entry_name));
    let package_name = class_name
        .rsplit_once('.')
        .map(|(package, _)| package.to_string());
    let super_class = if super_class == 0 {
        None
    } else {
        constant_pool.class_name(super_class)
    };

    Ok(Some(ClassFileInfo {
        class_name,
        package_name,
        super_class,
        interfaces,
        major_version,
        minor_version,
        access_flags,
        is_public: access_flags & ACC_PUBLIC != 0,
        is_interface: access_flags & ACC_INTERFACE != 0,
        is_abstract: access_flags & ACC_ABSTRACT != 0,
        is_final: access_flags & ACC_FINAL != 0,
        annotation_count,
    }))
}

fn class_name_from_entry(entry_name: &str) -> String {
    entry_name
        .strip_suffix(".class")
        .unwrap_or(entry_name)
        .replace('/', ".")
}

/// Skip a field or method table: six fixed bytes and an attribute table per member.
fn skip_members(reader: &mut ByteReader<'_>) -> Result<(), ClassFileError> {
    let count = reader.read_u2()?;
    for _ in 0..count {
        reader.skip(6)?;
        skip_attributes(reader)?;
    }
    Ok(())
}

fn skip_attributes(reader: &mut ByteReader<'_>) -> Result<(), ClassFileError> {
    let count = reader.read_u2()?;
    for _ in 0..count {
        reader.skip(2)?;
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}

/// Walk class-level attributes and return the number of runtime-visible annotations.
fn read_class_attributes(
    reader: &mut ByteReader<'_>,
    constant_pool: &ConstantPool,
) -> Result<usize, ClassFileError> {
    let count = reader.read_u2()?;
    let mut annotations = 0;
    for _ in 0..count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let body = reader.read_bytes(length)?;
        if constant_pool.utf8(name_index) == Some("RuntimeVisibleAnnotations") {
            let mut attribute = ByteReader::new(body);
            annotations += attribute.read_u2()? as usize;
        }
    }
    Ok(annotations)
}
