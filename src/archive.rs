use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use tracing::debug;
use zip::{CompressionMethod, ZipArchive};

use crate::classfile::{ClassFileInfo, JavaVersion, parse_class_file};
use crate::graph::{Dependency, DependencyKind, DependencyScope, Platform};
use crate::manifest::{MANIFEST_PATH, ManifestInfo, parse_manifest};

/// Packages provided by the JDK itself; classes here never imply a bundled dependency.
const PLATFORM_PACKAGE_PREFIXES: &[&str] = &[
    "java.",
    "javax.",
    "jdk.",
    "sun.",
    "com.sun.",
    "org.w3c.dom",
    "org.xml.sax",
    "org.ietf.jgss",
    "org.omg.",
];

const NATIVE_SUFFIXES: &[&str] = &[".dll", ".so", ".dylib", ".jnilib"];
const CONFIG_SUFFIXES: &[&str] = &[
    ".properties",
    ".xml",
    ".json",
    ".yaml",
    ".yml",
    ".conf",
    ".cfg",
    ".ini",
];
const SIGNATURE_SUFFIXES: &[&str] = &[".sf", ".rsa", ".dsa", ".ec"];
const MAIN_CLASS_SUFFIXES: &[&str] = &["Main", "Application", "App"];

/// How an archive entry was classified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Class,
    Manifest,
    NativeLibrary,
    Config,
    Signature,
    Resource,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceInfo {
    pub path: String,
    pub size: u64,
    pub compressed_size: u64,
    pub is_compressed: bool,
    pub kind: EntryKind,
}

/// Maven coordinates of the archive itself, from an embedded `pom.properties`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ArtifactCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
}

/// Everything learned from one archive.
#[derive(Clone, Debug, Default, Serialize)]
pub struct JarAnalysisResult {
    pub jar_path: String,
    pub jar_size: u64,
    pub is_valid_jar: bool,
    /// All entries, directories included.
    pub entry_count: usize,
    pub manifest: Option<ManifestInfo>,
    pub class_files: Vec<ClassFileInfo>,
    pub resources: Vec<ResourceInfo>,
    pub native_libraries: Vec<ResourceInfo>,
    pub config_files: Vec<ResourceInfo>,
    pub signature_files: Vec<ResourceInfo>,
    pub dependencies: Vec<Dependency>,
    pub main_class_candidates: Vec<String>,
    pub estimated_java_version: JavaVersion,
    pub artifact: Option<ArtifactCoordinates>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl JarAnalysisResult {
    fn new(path: &Path) -> Self {
        Self {
            jar_path: path.display().to_string(),
            ..Self::default()
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature_files.is_empty()
    }
}

/// Analyze one JAR file. Never fails: problems are recorded on the result.
///
/// A missing or unreadable archive yields `is_valid_jar = false` with one error.
/// Entry-level problems become warnings and analysis continues.
pub fn analyze_jar(path: &Path) -> JarAnalysisResult {
    let mut result = JarAnalysisResult::new(path);
    let (mut archive, jar_size) = match open_archive(path) {
        Ok(opened) => opened,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "archive rejected");
            result.errors.push(format!("{err:#}"));
            return result;
        }
    };
    result.jar_size = jar_size;
    result.is_valid_jar = true;

    let mut pom_dependencies = Vec::new();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                result
                    .warnings
                    .push(format!("failed to read entry #{index}: {err}"));
                continue;
            }
        };
        result.entry_count += 1;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let info = ResourceInfo {
            path: name.clone(),
            size: entry.size(),
            compressed_size: entry.compressed_size(),
            is_compressed: entry.compression() != CompressionMethod::Stored,
            kind: classify_entry(&name),
        };

        match info.kind {
            EntryKind::Class if is_unparsed_class(&name) => {
                result.resources.push(ResourceInfo {
                    kind: EntryKind::Resource,
                    ..info
                });
            }
            EntryKind::Class => match read_entry(&mut entry, &name) {
                Ok(data) => match parse_class_file(&data, &name) {
                    Ok(Some(class)) => result.class_files.push(class),
                    Ok(None) => result
                        .warnings
                        .push(format!("{name}: invalid class file magic number")),
                    Err(err) => result
                        .warnings
                        .push(format!("{name}: failed to parse class file: {err}")),
                },
                Err(err) => result.warnings.push(format!("{err:#}")),
            },
            EntryKind::Manifest => match read_entry(&mut entry, &name) {
                Ok(data) => result.manifest = Some(parse_manifest(&data)),
                Err(err) => result.warnings.push(format!("{err:#}")),
            },
            EntryKind::NativeLibrary => {
                result.dependencies.push(native_dependency(&info));
                result.native_libraries.push(info);
            }
            EntryKind::Config => {
                if is_maven_descriptor(&name, "pom.xml") {
                    match read_entry(&mut entry, &name)
                        .and_then(|data| parse_pom_dependencies(&String::from_utf8_lossy(&data)))
                    {
                        Ok(dependencies) => pom_dependencies.extend(dependencies),
                        Err(err) => result.warnings.push(format!("{name}: {err:#}")),
                    }
                } else if is_maven_descriptor(&name, "pom.properties") && result.artifact.is_none() {
                    match read_entry(&mut entry, &name) {
                        Ok(data) => {
                            result.artifact = parse_pom_properties(&String::from_utf8_lossy(&data))
                        }
                        Err(err) => result.warnings.push(format!("{err:#}")),
                    }
                }
                result.config_files.push(info);
            }
            EntryKind::Signature => result.signature_files.push(info),
            EntryKind::Resource => {
                if name.to_ascii_lowercase().ends_with(".jar") {
                    result.dependencies.push(
                        Dependency::from_jar_name("embedded", &name)
                            .with_scope(DependencyScope::Runtime)
                            .with_file_path(&name)
                            .with_size(info.size)
                            .with_metadata("source", "embedded_jar"),
                    );
                }
                result.resources.push(info);
            }
        }
    }

    result.dependencies.extend(pom_dependencies);
    result.dependencies.extend(package_dependencies(&result.class_files));
    if let Some(manifest) = &result.manifest {
        result
            .dependencies
            .extend(class_path_dependencies(&manifest.class_path));
    }
    dedupe_jar_dependencies(&mut result.dependencies);
    result.main_class_candidates = main_class_candidates(&result);
    result.estimated_java_version = estimate_java_version(&result.class_files);

    debug!(
        path = %path.display(),
        entries = result.entry_count,
        classes = result.class_files.len(),
        dependencies = result.dependencies.len(),
        warnings = result.warnings.len(),
        "archive analyzed"
    );
    result
}

fn open_archive(path: &Path) -> Result<(ZipArchive<fs::File>, u64)> {
    let jar_size = fs::metadata(path)
        .with_context(|| format!("failed to read {}", path.display()))?
        .len();
    let file =
        fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let archive = ZipArchive::new(file)
        .with_context(|| format!("failed to read {} as a JAR archive", path.display()))?;
    Ok((archive, jar_size))
}

fn read_entry(entry: &mut impl Read, name: &str) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    entry
        .read_to_end(&mut data)
        .with_context(|| format!("failed to read entry {name}"))?;
    Ok(data)
}

/// First matching rule wins; comparisons ignore case.
pub fn classify_entry(name: &str) -> EntryKind {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".class") {
        EntryKind::Class
    } else if lower == MANIFEST_PATH.to_ascii_lowercase() {
        EntryKind::Manifest
    } else if is_native_library(&lower) {
        EntryKind::NativeLibrary
    } else if CONFIG_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
        EntryKind::Config
    } else if SIGNATURE_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
        || lower.starts_with("meta-inf/")
    {
        EntryKind::Signature
    } else {
        EntryKind::Resource
    }
}

/// Module descriptors and multi-release variants are kept as plain resources.
fn is_unparsed_class(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with("module-info.class") || lower.starts_with("meta-inf/versions/")
}

fn is_native_library(lower: &str) -> bool {
    let file_name = lower.rsplit('/').next().unwrap_or(lower);
    if NATIVE_SUFFIXES.iter().any(|suffix| file_name.ends_with(suffix)) {
        return true;
    }
    // libfoo.so.1.2
    match file_name.split_once(".so.") {
        Some((stem, version)) => {
            !stem.is_empty()
                && !version.is_empty()
                && version.chars().all(|c| c.is_ascii_digit() || c == '.')
        }
        None => false,
    }
}

fn native_platforms(name: &str) -> Vec<Platform> {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".dll") {
        vec![Platform::Windows]
    } else if lower.ends_with(".dylib") || lower.ends_with(".jnilib") {
        vec![Platform::Macos]
    } else {
        vec![Platform::Linux]
    }
}

fn native_dependency(info: &ResourceInfo) -> Dependency {
    let file_name = info.path.rsplit('/').next().unwrap_or(&info.path);
    Dependency::new("native", file_name)
        .with_kind(DependencyKind::Native)
        .with_scope(DependencyScope::Runtime)
        .with_file_path(&info.path)
        .with_size(info.size)
        .with_platforms(native_platforms(&info.path))
        .with_metadata("source", "native_library")
}

fn is_maven_descriptor(name: &str, file_name: &str) -> bool {
    name.starts_with("META-INF/maven/") && name.ends_with(&format!("/{file_name}"))
}

/// Extract `<dependency>` blocks from an embedded `pom.xml`.
///
/// Managed dependencies and build plugins are ignored. Versions that reference
/// properties (`${...}`) are dropped.
pub fn parse_pom_dependencies(pom: &str) -> Result<Vec<Dependency>> {
    let ignored = Regex::new(
        r"(?s)<dependencyManagement>.*?</dependencyManagement>|<build>.*?</build>|<exclusions>.*?</exclusions>|<!--.*?-->",
    )
    .context("compile pom section pattern")?;
    let block = Regex::new(r"(?s)<dependency>(.*?)</dependency>")
        .context("compile pom dependency pattern")?;
    let tag = |name: &str| -> Result<Regex> {
        Regex::new(&format!(r"<{name}>\s*([^<]*?)\s*</{name}>"))
            .with_context(|| format!("compile pom {name} pattern"))
    };
    let group_id = tag("groupId")?;
    let artifact_id = tag("artifactId")?;
    let version = tag("version")?;
    let scope = tag("scope")?;
    let optional = tag("optional")?;

    let capture = |pattern: &Regex, text: &str| -> Option<String> {
        pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().to_string())
            .filter(|value| !value.is_empty())
    };

    let cleaned = ignored.replace_all(pom, "");
    let mut dependencies = Vec::new();
    for captures in block.captures_iter(&cleaned) {
        let Some(body) = captures.get(1).map(|body| body.as_str()) else {
            continue;
        };
        let (Some(group), Some(artifact)) = (capture(&group_id, body), capture(&artifact_id, body))
        else {
            continue;
        };
        let mut dependency = Dependency::new(group, artifact).with_metadata("source", "pom");
        if let Some(version) = capture(&version, body).filter(|value| !value.contains("${")) {
            dependency = dependency.with_version(version);
        }
        if let Some(scope) = capture(&scope, body).and_then(|value| value.parse().ok()) {
            dependency = dependency.with_scope(scope);
        }
        if capture(&optional, body).is_some_and(|value| value.eq_ignore_ascii_case("true")) {
            dependency = dependency.optional();
        }
        dependencies.push(dependency);
    }
    Ok(dependencies)
}

fn parse_pom_properties(content: &str) -> Option<ArtifactCoordinates> {
    let properties: BTreeMap<&str, &str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();
    Some(ArtifactCoordinates {
        group_id: properties.get("groupId")?.to_string(),
        artifact_id: properties.get("artifactId")?.to_string(),
        version: properties.get("version").map(|value| value.to_string()),
    })
}

fn is_platform_package(package: &str) -> bool {
    PLATFORM_PACKAGE_PREFIXES
        .iter()
        .any(|prefix| package.starts_with(prefix))
}

fn package_of(class_name: &str) -> Option<&str> {
    class_name.rsplit_once('.').map(|(package, _)| package)
}

/// One module dependency per non-JDK package referenced by class, super class or interfaces.
fn package_dependencies(classes: &[ClassFileInfo]) -> Vec<Dependency> {
    let mut packages = BTreeSet::new();
    for class in classes {
        let referenced = std::iter::once(class.class_name.as_str())
            .chain(class.super_class.as_deref())
            .chain(class.interfaces.iter().map(String::as_str));
        for name in referenced {
            if let Some(package) = package_of(name) {
                if !is_platform_package(package) {
                    packages.insert(package.to_string());
                }
            }
        }
    }
    packages
        .into_iter()
        .map(|package| {
            let artifact = package.rsplit('.').next().unwrap_or(&package).to_string();
            Dependency::new(package.clone(), artifact)
                .with_kind(DependencyKind::Module)
                .with_metadata("source", "package_analysis")
        })
        .collect()
}

fn class_path_dependencies(class_path: &[String]) -> Vec<Dependency> {
    class_path
        .iter()
        .filter(|entry| entry.to_ascii_lowercase().ends_with(".jar"))
        .map(|entry| {
            Dependency::from_jar_name("classpath", entry)
                .with_scope(DependencyScope::Runtime)
                .with_file_path(entry)
                .with_metadata("source", "manifest_class_path")
        })
        .collect()
}

/// Drop jar dependencies naming an artifact and version already seen as a jar.
///
/// An embedded jar that is also listed in `Class-Path` arrives under two groups;
/// the first occurrence wins.
pub(crate) fn dedupe_jar_dependencies(dependencies: &mut Vec<Dependency>) {
    let mut seen = BTreeSet::new();
    dependencies.retain(|dependency| {
        dependency.kind != DependencyKind::Jar
            || seen.insert((dependency.artifact.clone(), dependency.version.clone()))
    });
}

fn main_class_candidates(result: &JarAnalysisResult) -> Vec<String> {
    let declared = result
        .manifest
        .as_ref()
        .and_then(|manifest| manifest.main_class.clone());
    let conventional = result
        .class_files
        .iter()
        .filter(|class| {
            let simple = class.simple_name();
            MAIN_CLASS_SUFFIXES
                .iter()
                .any(|suffix| simple.ends_with(suffix))
        })
        .map(|class| class.class_name.clone());

    let mut seen = BTreeSet::new();
    declared
        .into_iter()
        .chain(conventional)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Most common major version; ties go to the newer release.
pub(crate) fn estimate_java_version(classes: &[ClassFileInfo]) -> JavaVersion {
    let mut counts: BTreeMap<u16, usize> = BTreeMap::new();
    for class in classes {
        *counts.entry(class.major_version).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(major, count)| (*count, *major))
        .map(|(major, _)| JavaVersion::from_major(major))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ClassFileBuilder, pom_xml, write_jar};

    #[test]
    fn analyzes_minimal_application_jar() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let jar_path = temp_dir.path().join("app.jar");
        let class = ClassFileBuilder::new("demo/App", Some("java/lang/Object")).finish();
        write_jar(
            &jar_path,
            &[
                (
                    "META-INF/MANIFEST.MF",
                    b"Manifest-Version: 1.0\r\nMain-Class: demo.App\r\n\r\n",
                ),
                ("demo/App.class", &class),
            ],
        )
        .expect("write jar");

        let result = analyze_jar(&jar_path);

        assert!(result.is_valid_jar);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.entry_count, 2);
        assert!(result.jar_size > 0);
        let manifest = result.manifest.as_ref().expect("manifest");
        assert_eq!(manifest.main_class.as_deref(), Some("demo.App"));
        assert_eq!(result.main_class_candidates, vec!["demo.App"]);
        assert_eq!(result.class_files.len(), 1);
        assert_eq!(result.estimated_java_version, JavaVersion::Jdk1_8);
    }

    #[test]
    fn bad_class_magic_is_one_warning() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let jar_path = temp_dir.path().join("broken.jar");
        write_jar(&jar_path, &[("demo/Broken.class", b"\x00\x01\x02\x03garbage")])
            .expect("write jar");

        let result = analyze_jar(&jar_path);

        assert!(result.is_valid_jar);
        assert!(result.class_files.is_empty());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("demo/Broken.class"));
        assert!(result.errors.is_empty());
    }

    #[test]
    fn non_zip_file_is_invalid_with_one_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let jar_path = temp_dir.path().join("fake.jar");
        fs::write(&jar_path, b"definitely not a zip archive").expect("write file");

        let result = analyze_jar(&jar_path);

        assert!(!result.is_valid_jar);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.entry_count, 0);
    }

    #[test]
    fn missing_file_is_invalid_with_one_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");

        let result = analyze_jar(&temp_dir.path().join("missing.jar"));

        assert!(!result.is_valid_jar);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("missing.jar"));
    }

    #[test]
    fn classifies_entries_by_first_matching_rule() {
        assert_eq!(classify_entry("a/B.CLASS"), EntryKind::Class);
        assert_eq!(classify_entry("meta-inf/manifest.mf"), EntryKind::Manifest);
        assert_eq!(classify_entry("native/libjni.so"), EntryKind::NativeLibrary);
        assert_eq!(classify_entry("native/libssl.so.1.1"), EntryKind::NativeLibrary);
        assert_eq!(classify_entry("win/jni.DLL"), EntryKind::NativeLibrary);
        assert_eq!(classify_entry("app.yml"), EntryKind::Config);
        assert_eq!(classify_entry("META-INF/maven/g/a/pom.xml"), EntryKind::Config);
        assert_eq!(classify_entry("META-INF/SIGNER.SF"), EntryKind::Signature);
        assert_eq!(classify_entry("META-INF/LICENSE"), EntryKind::Signature);
        assert_eq!(classify_entry("images/logo.png"), EntryKind::Resource);
        assert_eq!(classify_entry("docs/notes.sort"), EntryKind::Resource);
    }

    #[test]
    fn module_info_and_versioned_classes_stay_resources() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let jar_path = temp_dir.path().join("mr.jar");
        write_jar(
            &jar_path,
            &[
                ("module-info.class", b"not parsed"),
                ("META-INF/versions/11/demo/App.class", b"not parsed"),
            ],
        )
        .expect("write jar");

        let result = analyze_jar(&jar_path);

        assert!(result.warnings.is_empty());
        assert!(result.class_files.is_empty());
        assert_eq!(result.resources.len(), 2);
        assert!(
            result
                .resources
                .iter()
                .all(|resource| resource.kind == EntryKind::Resource)
        );
    }

    #[test]
    fn infers_dependencies_from_archive_contents() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let jar_path = temp_dir.path().join("fat.jar");
        let pom = pom_xml(&[
            ("org.example", "libx", "1.0", "compile"),
            ("org.example", "liby", "${liby.version}", "runtime"),
        ]);
        let class = ClassFileBuilder::new("com/acme/Main", Some("org/base/Launcher"))
            .interface("java/lang/Runnable")
            .finish();
        write_jar(
            &jar_path,
            &[
                (
                    "META-INF/MANIFEST.MF",
                    b"Manifest-Version: 1.0\nClass-Path: lib/slf4j-api-2.0.7.jar conf/\n",
                ),
                ("META-INF/maven/com.example/app/pom.xml", pom.as_bytes()),
                (
                    "META-INF/maven/com.example/app/pom.properties",
                    b"groupId=com.example\nartifactId=app\nversion=1.0.0\n",
                ),
                ("BOOT-INF/lib/guava-31.1-jre.jar", b"jar bytes"),
                ("native/linux/libjni.so", b"elf"),
                ("com/acme/Main.class", &class),
            ],
        )
        .expect("write jar");

        let result = analyze_jar(&jar_path);
        let find = |key: &str| {
            result
                .dependencies
                .iter()
                .find(|dependency| dependency.key() == key)
                .unwrap_or_else(|| panic!("missing dependency {key}"))
        };

        let libx = find("org.example:libx");
        assert_eq!(libx.version.as_deref(), Some("1.0"));
        assert_eq!(libx.scope, DependencyScope::Compile);
        let liby = find("org.example:liby");
        assert_eq!(liby.version, None);
        assert_eq!(liby.scope, DependencyScope::Runtime);

        let guava = find("embedded:guava");
        assert_eq!(guava.version.as_deref(), Some("31.1-jre"));
        assert_eq!(guava.file_path.as_deref(), Some("BOOT-INF/lib/guava-31.1-jre.jar"));
        assert_eq!(guava.size, Some(9));

        let native = find("native:libjni.so");
        assert_eq!(native.kind, DependencyKind::Native);
        assert_eq!(native.supported_platforms, vec![Platform::Linux]);

        let slf4j = find("classpath:slf4j-api");
        assert_eq!(slf4j.version.as_deref(), Some("2.0.7"));

        find("com.acme:acme");
        find("org.base:base");
        assert!(
            !result
                .dependencies
                .iter()
                .any(|dependency| dependency.group.starts_with("java."))
        );

        assert_eq!(
            result.artifact,
            Some(ArtifactCoordinates {
                group_id: "com.example".to_string(),
                artifact_id: "app".to_string(),
                version: Some("1.0.0".to_string()),
            })
        );
        assert_eq!(result.main_class_candidates, vec!["com.acme.Main"]);
        assert_eq!(result.native_libraries.len(), 1);
        assert_eq!(result.config_files.len(), 2);
    }

    #[test]
    fn embedded_jar_listed_in_class_path_is_one_dependency() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let jar_path = temp_dir.path().join("app.jar");
        write_jar(
            &jar_path,
            &[
                (
                    "META-INF/MANIFEST.MF",
                    b"Manifest-Version: 1.0\nClass-Path: lib/guava-31.1-jre.jar lib/slf4j-api-2.0.7.jar\n",
                ),
                ("lib/guava-31.1-jre.jar", b"jar bytes"),
            ],
        )
        .expect("write jar");

        let result = analyze_jar(&jar_path);

        let guava: Vec<&Dependency> = result
            .dependencies
            .iter()
            .filter(|dependency| dependency.artifact == "guava")
            .collect();
        assert_eq!(guava.len(), 1);
        assert_eq!(guava[0].group, "embedded");
        assert_eq!(guava[0].size, Some(9));
        assert!(
            result
                .dependencies
                .iter()
                .any(|dependency| dependency.key() == "classpath:slf4j-api")
        );
    }

    #[test]
    fn dedupe_keeps_other_kinds_and_versions() {
        let mut dependencies = vec![
            Dependency::from_jar_name("embedded", "lib/x-1.0.jar"),
            Dependency::from_jar_name("classpath", "x-1.0.jar"),
            Dependency::from_jar_name("classpath", "x-2.0.jar"),
            Dependency::new("org.example", "x").with_version("1.0"),
        ];

        dedupe_jar_dependencies(&mut dependencies);

        let coordinates: Vec<String> = dependencies.iter().map(Dependency::coordinates).collect();
        assert_eq!(
            coordinates,
            vec!["embedded:x:1.0", "classpath:x:2.0", "org.example:x:1.0"]
        );
    }

    #[test]
    fn pom_parser_skips_managed_and_plugin_dependencies() {
        let pom = r#"<project>
  <dependencyManagement>
    <dependencies>
      <dependency><groupId>managed</groupId><artifactId>bom</artifactId><version>1</version></dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>core</artifactId>
      <version>2.0</version>
      <optional>true</optional>
      <exclusions>
        <exclusion><groupId>x</groupId><artifactId>y</artifactId></exclusion>
      </exclusions>
    </dependency>
  </dependencies>
  <build>
    <plugins>
      <plugin>
        <dependencies>
          <dependency><groupId>plugin</groupId><artifactId>dep</artifactId></dependency>
        </dependencies>
      </plugin>
    </plugins>
  </build>
</project>"#;

        let dependencies = parse_pom_dependencies(pom).expect("parse pom");

        assert_eq!(dependencies.len(), 1);
        assert_eq!(dependencies[0].coordinates(), "org.example:core:2.0");
        assert!(dependencies[0].is_optional);
        assert_eq!(dependencies[0].metadata.get("source").map(String::as_str), Some("pom"));
    }

    #[test]
    fn java_version_estimate_prefers_majority_then_newest() {
        let class = |major| {
            let bytes = ClassFileBuilder::new("demo/A", None).major(major).finish();
            parse_class_file(&bytes, "demo/A.class")
                .expect("parse")
                .expect("class")
        };

        assert_eq!(
            estimate_java_version(&[class(52), class(55), class(52)]),
            JavaVersion::Jdk1_8
        );
        assert_eq!(
            estimate_java_version(&[class(52), class(61)]),
            JavaVersion::Jdk17
        );
        assert_eq!(estimate_java_version(&[]), JavaVersion::Unknown);
    }
}
