use std::io::{Cursor, Write};
use std::path::Path;

use anyhow::{Context, Result};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Minimal class file writer for tests.
pub(crate) struct ClassFileBuilder {
    cp: Vec<CpEntry>,
    major: u16,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<MemberSpec>,
    methods: Vec<MemberSpec>,
    annotations: Vec<u16>,
    code_index: u16,
}

impl ClassFileBuilder {
    /// Names use internal form, e.g. `demo/App`.
    pub(crate) fn new(class_name: &str, super_name: Option<&str>) -> Self {
        let mut builder = Self {
            cp: Vec::new(),
            major: 52,
            access_flags: 0x0021,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
            code_index: 0,
        };
        builder.code_index = builder.add_utf8("Code");
        builder.this_class = builder.add_class(class_name);
        if let Some(super_name) = super_name {
            builder.super_class = builder.add_class(super_name);
        }
        builder
    }

    pub(crate) fn major(mut self, major: u16) -> Self {
        self.major = major;
        self
    }

    pub(crate) fn access(mut self, flags: u16) -> Self {
        self.access_flags = flags;
        self
    }

    pub(crate) fn interface(mut self, name: &str) -> Self {
        let index = self.add_class(name);
        self.interfaces.push(index);
        self
    }

    pub(crate) fn long_constant(mut self, value: i64) -> Self {
        self.cp.push(CpEntry::Long(value));
        self.cp.push(CpEntry::Gap);
        self
    }

    pub(crate) fn annotation(mut self, descriptor: &str) -> Self {
        let index = self.add_utf8(descriptor);
        self.annotations.push(index);
        self
    }

    pub(crate) fn field(mut self, name: &str, descriptor: &str) -> Self {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        self.fields.push(MemberSpec {
            name_index,
            descriptor_index,
            code: None,
        });
        self
    }

    pub(crate) fn method(mut self, name: &str, descriptor: &str, code: Vec<u8>) -> Self {
        let name_index = self.add_utf8(name);
        let descriptor_index = self.add_utf8(descriptor);
        self.methods.push(MemberSpec {
            name_index,
            descriptor_index,
            code: Some(code),
        });
        self
    }

    fn add_utf8(&mut self, value: &str) -> u16 {
        self.cp.push(CpEntry::Utf8(value.to_string()));
        self.cp.len() as u16
    }

    fn add_class(&mut self, name: &str) -> u16 {
        let name_index = self.add_utf8(name);
        self.cp.push(CpEntry::Class(name_index));
        self.cp.len() as u16
    }

    pub(crate) fn finish(mut self) -> Vec<u8> {
        let annotations_name = if self.annotations.is_empty() {
            0
        } else {
            self.add_utf8("RuntimeVisibleAnnotations")
        };

        let mut bytes = Vec::new();
        write_u32(&mut bytes, 0xCAFEBABE);
        write_u16(&mut bytes, 0);
        write_u16(&mut bytes, self.major);
        write_u16(&mut bytes, (self.cp.len() + 1) as u16);
        for entry in &self.cp {
            entry.write(&mut bytes);
        }
        write_u16(&mut bytes, self.access_flags);
        write_u16(&mut bytes, self.this_class);
        write_u16(&mut bytes, self.super_class);
        write_u16(&mut bytes, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            write_u16(&mut bytes, *interface);
        }
        for members in [&self.fields, &self.methods] {
            write_u16(&mut bytes, members.len() as u16);
            for member in members {
                write_u16(&mut bytes, 0x0001);
                write_u16(&mut bytes, member.name_index);
                write_u16(&mut bytes, member.descriptor_index);
                match &member.code {
                    Some(code) => {
                        write_u16(&mut bytes, 1);
                        write_u16(&mut bytes, self.code_index);
                        write_u32(&mut bytes, 12 + code.len() as u32);
                        write_u16(&mut bytes, 2);
                        write_u16(&mut bytes, 1);
                        write_u32(&mut bytes, code.len() as u32);
                        bytes.extend_from_slice(code);
                        write_u16(&mut bytes, 0);
                        write_u16(&mut bytes, 0);
                    }
                    None => write_u16(&mut bytes, 0),
                }
            }
        }
        if self.annotations.is_empty() {
            write_u16(&mut bytes, 0);
        } else {
            write_u16(&mut bytes, 1);
            write_u16(&mut bytes, annotations_name);
            write_u32(&mut bytes, 2 + 4 * self.annotations.len() as u32);
            write_u16(&mut bytes, self.annotations.len() as u16);
            for type_index in &self.annotations {
                write_u16(&mut bytes, *type_index);
                write_u16(&mut bytes, 0);
            }
        }
        bytes
    }
}

/// Field or method definition for generated class files.
struct MemberSpec {
    name_index: u16,
    descriptor_index: u16,
    code: Option<Vec<u8>>,
}

/// Constant pool entries needed by generated class files.
enum CpEntry {
    Utf8(String),
    Class(u16),
    Long(i64),
    Gap,
}

impl CpEntry {
    fn write(&self, bytes: &mut Vec<u8>) {
        match self {
            CpEntry::Utf8(value) => {
                bytes.push(1);
                write_u16(bytes, value.len() as u16);
                bytes.extend_from_slice(value.as_bytes());
            }
            CpEntry::Class(name_index) => {
                bytes.push(7);
                write_u16(bytes, *name_index);
            }
            CpEntry::Long(value) => {
                bytes.push(5);
                bytes.extend_from_slice(&value.to_be_bytes());
            }
            CpEntry::Gap => {}
        }
    }
}

fn write_u16(bytes: &mut Vec<u8>, value: u16) {
    bytes.extend_from_slice(&value.to_be_bytes());
}

fn write_u32(bytes: &mut Vec<u8>, value: u32) {
    bytes.extend_from_slice(&value.to_be_bytes());
}

/// Build an in-memory JAR from `(entry name, bytes)` pairs.
pub(crate) fn jar_bytes(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, SimpleFileOptions::default())
                .with_context(|| format!("add directory {name}"))?;
            continue;
        }
        writer
            .start_file(*name, SimpleFileOptions::default())
            .with_context(|| format!("start entry {name}"))?;
        writer
            .write_all(data)
            .with_context(|| format!("write entry {name}"))?;
    }
    let cursor = writer.finish().context("finish jar")?;
    Ok(cursor.into_inner())
}

pub(crate) fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> Result<()> {
    let bytes = jar_bytes(entries)?;
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}

/// Embedded Maven descriptor with the given `(group, artifact, version, scope)` dependencies.
pub(crate) fn pom_xml(dependencies: &[(&str, &str, &str, &str)]) -> String {
    let mut pom = String::from(
        "<project>\n  <groupId>com.example</groupId>\n  <artifactId>app</artifactId>\n  <version>1.0.0</version>\n  <dependencies>\n",
    );
    for (group, artifact, version, scope) in dependencies {
        pom.push_str(&format!(
            "    <dependency>\n      <groupId>{group}</groupId>\n      <artifactId>{artifact}</artifactId>\n      <version>{version}</version>\n      <scope>{scope}</scope>\n    </dependency>\n"
        ));
    }
    pom.push_str("  </dependencies>\n</project>\n");
    pom
}
