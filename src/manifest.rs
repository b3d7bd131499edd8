use std::collections::BTreeMap;

use serde::Serialize;

pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Attributes read from `META-INF/MANIFEST.MF`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ManifestInfo {
    pub main_class: Option<String>,
    pub manifest_version: Option<String>,
    pub created_by: Option<String>,
    pub signature_version: Option<String>,
    pub class_path: Vec<String>,
    pub implementation_title: Option<String>,
    pub implementation_vendor: Option<String>,
    pub implementation_version: Option<String>,
    pub specification_title: Option<String>,
    pub specification_vendor: Option<String>,
    pub specification_version: Option<String>,
    pub package_title: Option<String>,
    pub package_vendor: Option<String>,
    pub package_version: Option<String>,
    pub automatic_module_name: Option<String>,
    pub sealed: bool,
    pub multi_release: bool,
    pub custom_attributes: BTreeMap<String, String>,
    pub sections: Vec<ManifestSection>,
}

/// Per-entry section introduced by a `Name:` attribute.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ManifestSection {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
}

/// Parse manifest bytes. Malformed lines are ignored, so this never fails.
pub fn parse_manifest(data: &[u8]) -> ManifestInfo {
    let content = String::from_utf8_lossy(data);
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

    let mut blocks: Vec<Vec<(String, String)>> = vec![Vec::new()];
    let mut current: Option<(String, String)> = None;

    for raw_line in content.lines() {
        let line = raw_line.trim_end_matches('\r');
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(continuation);
            }
            continue;
        }

        if let Some(attribute) = current.take() {
            push_attribute(&mut blocks, attribute);
        }

        if line.is_empty() {
            if blocks.last().map(|block| !block.is_empty()).unwrap_or(false) {
                blocks.push(Vec::new());
            }
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            current = Some((key.trim().to_string(), value.trim_start().to_string()));
        }
    }
    if let Some(attribute) = current.take() {
        push_attribute(&mut blocks, attribute);
    }

    let mut blocks = blocks.into_iter().filter(|block| !block.is_empty());
    let mut info = ManifestInfo::default();
    if let Some(main) = blocks.next() {
        for (key, value) in main {
            apply_main_attribute(&mut info, key, value);
        }
    }
    for block in blocks {
        info.sections.push(build_section(block));
    }
    info
}

fn push_attribute(blocks: &mut [Vec<(String, String)>], attribute: (String, String)) {
    if let Some(block) = blocks.last_mut() {
        block.push(attribute);
    }
}

fn apply_main_attribute(info: &mut ManifestInfo, key: String, value: String) {
    let value = value.trim_end().to_string();
    match key.to_ascii_lowercase().as_str() {
        "main-class" => info.main_class = Some(value),
        "manifest-version" => info.manifest_version = Some(value),
        "created-by" => info.created_by = Some(value),
        "signature-version" => info.signature_version = Some(value),
        "class-path" => {
            info.class_path = value.split_whitespace().map(str::to_string).collect();
        }
        "implementation-title" => info.implementation_title = Some(value),
        "implementation-vendor" => info.implementation_vendor = Some(value),
        "implementation-version" => info.implementation_version = Some(value),
        "specification-title" => info.specification_title = Some(value),
        "specification-vendor" => info.specification_vendor = Some(value),
        "specification-version" => info.specification_version = Some(value),
        "package-title" => info.package_title = Some(value),
        "package-vendor" => info.package_vendor = Some(value),
        "package-version" => info.package_version = Some(value),
        "automatic-module-name" => info.automatic_module_name = Some(value),
        "sealed" => info.sealed = value.eq_ignore_ascii_case("true"),
        "multi-release" => info.multi_release = value.eq_ignore_ascii_case("true"),
        _ => {
            info.custom_attributes.insert(key, value);
        }
    }
}

fn build_section(block: Vec<(String, String)>) -> ManifestSection {
    let mut section = ManifestSection::default();
    for (key, value) in block {
        if key.eq_ignore_ascii_case("name") && section.name.is_empty() {
            section.name = value;
        } else {
            section.attributes.insert(key, value);
        }
    }
    section
}
