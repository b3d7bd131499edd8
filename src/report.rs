use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::ComprehensiveAnalysisResult;
use crate::graph::DependencyKind;

/// Serializable summary of an analysis run. Text and JSON output both render this.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub manifest: ManifestSummary,
    pub dependencies: DependencyCounts,
    pub conflicts: ConflictSummary,
    pub bundling: BundlingTotals,
    pub classpath: Vec<String>,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ManifestSummary {
    pub archives: Vec<String>,
    pub is_valid: bool,
    pub main_class: Option<String>,
    pub main_class_candidates: Vec<String>,
    pub implementation_title: Option<String>,
    pub implementation_version: Option<String>,
    pub artifact: Option<String>,
    pub java_version: String,
    pub class_count: usize,
    pub entry_count: usize,
    pub total_size: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct DependencyCounts {
    pub total: usize,
    pub direct: usize,
    pub transitive: usize,
    pub optional: usize,
    pub native: usize,
    pub by_scope: BTreeMap<String, usize>,
    pub by_kind: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ConflictSummary {
    pub conflict_count: usize,
    pub cycle_count: usize,
    pub conflicts: Vec<String>,
    pub cycles: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BundlingTotals {
    pub strategy: String,
    pub bundled: usize,
    pub excluded: usize,
    pub unresolved: usize,
    pub bundled_size: u64,
    pub size_limit: Option<u64>,
    pub within_limit: Option<bool>,
}

impl AnalysisReport {
    pub fn from_result(result: &ComprehensiveAnalysisResult) -> Self {
        let jar = &result.jar_analysis;
        let manifest = jar.manifest.as_ref();
        let resolution = &result.resolution;

        let summary = result.graph.summary();
        let mut native = 0;
        for (_, node) in result.graph.nodes() {
            if node.dependency.kind == DependencyKind::Native {
                native += 1;
            }
        }

        Self {
            manifest: ManifestSummary {
                archives: result
                    .jar_results
                    .iter()
                    .map(|jar| jar.jar_path.clone())
                    .collect(),
                is_valid: jar.is_valid_jar,
                main_class: manifest.and_then(|manifest| manifest.main_class.clone()),
                main_class_candidates: jar.main_class_candidates.clone(),
                implementation_title: manifest
                    .and_then(|manifest| manifest.implementation_title.clone()),
                implementation_version: manifest
                    .and_then(|manifest| manifest.implementation_version.clone()),
                artifact: jar.artifact.as_ref().map(|artifact| {
                    match &artifact.version {
                        Some(version) => {
                            format!("{}:{}:{}", artifact.group_id, artifact.artifact_id, version)
                        }
                        None => format!("{}:{}", artifact.group_id, artifact.artifact_id),
                    }
                }),
                java_version: jar.estimated_java_version.to_string(),
                class_count: jar.class_files.len(),
                entry_count: jar.entry_count,
                total_size: jar.jar_size,
            },
            dependencies: DependencyCounts {
                total: summary.total_dependencies,
                direct: summary.total_dependencies - summary.transitive_dependencies,
                transitive: summary.transitive_dependencies,
                optional: summary.optional_dependencies,
                native,
                by_scope: summary.scopes,
                by_kind: summary.kinds,
            },
            conflicts: ConflictSummary {
                conflict_count: resolution.conflicts.len(),
                cycle_count: resolution.cycles.len(),
                conflicts: resolution
                    .conflicts
                    .iter()
                    .map(|(left, right)| format!("{left} <-> {right}"))
                    .collect(),
                cycles: resolution
                    .cycles
                    .iter()
                    .map(|cycle| cycle.join(" -> "))
                    .collect(),
            },
            bundling: BundlingTotals {
                strategy: resolution.metadata.strategy.clone(),
                bundled: resolution.resolved.len(),
                excluded: resolution.excluded.len(),
                unresolved: resolution.unresolved.len(),
                bundled_size: result
                    .decisions
                    .values()
                    .filter(|decision| decision.should_bundle)
                    .filter_map(|decision| decision.estimated_size)
                    .sum(),
                size_limit: result
                    .size_optimization
                    .as_ref()
                    .map(|optimization| optimization.max_size),
                within_limit: result
                    .size_optimization
                    .as_ref()
                    .map(|optimization| optimization.within_limit),
            },
            classpath: result.classpath.clone(),
            recommendations: result.recommendations.clone(),
            warnings: result.warnings.clone(),
            errors: result.errors.clone(),
            trace_id: result.trace_id.clone(),
        }
    }
}

pub fn render_json(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize analysis report")
}

/// Human-readable report. Sections always appear in the same order.
pub fn render_text(report: &AnalysisReport) -> String {
    let mut lines = Vec::new();

    let manifest = &report.manifest;
    lines.push("Manifest".to_string());
    lines.push(format!("  Archives: {}", manifest.archives.join(", ")));
    lines.push(format!("  Valid: {}", yes_no(manifest.is_valid)));
    lines.push(format!(
        "  Main-Class: {}",
        manifest.main_class.as_deref().unwrap_or("-")
    ));
    lines.push(format!(
        "  Main class candidates: {}",
        list_or_dash(&manifest.main_class_candidates)
    ));
    if let Some(title) = &manifest.implementation_title {
        lines.push(format!(
            "  Implementation: {} {}",
            title,
            manifest.implementation_version.as_deref().unwrap_or("")
        ));
    }
    if let Some(artifact) = &manifest.artifact {
        lines.push(format!("  Artifact: {artifact}"));
    }
    lines.push(format!("  Java version: {}", manifest.java_version));
    lines.push(format!(
        "  Classes: {}  Entries: {}  Size: {} bytes",
        manifest.class_count, manifest.entry_count, manifest.total_size
    ));

    let dependencies = &report.dependencies;
    lines.push(String::new());
    lines.push("Dependencies".to_string());
    lines.push(format!(
        "  Total: {} (direct {}, transitive {}, optional {}, native {})",
        dependencies.total,
        dependencies.direct,
        dependencies.transitive,
        dependencies.optional,
        dependencies.native
    ));
    lines.push(format!("  By scope: {}", counts(&dependencies.by_scope)));
    lines.push(format!("  By kind: {}", counts(&dependencies.by_kind)));

    let conflicts = &report.conflicts;
    lines.push(String::new());
    lines.push("Conflicts and cycles".to_string());
    lines.push(format!("  Conflicts: {}", conflicts.conflict_count));
    lines.extend(conflicts.conflicts.iter().map(|entry| format!("    - {entry}")));
    lines.push(format!("  Cycles: {}", conflicts.cycle_count));
    lines.extend(conflicts.cycles.iter().map(|entry| format!("    - {entry}")));

    let bundling = &report.bundling;
    lines.push(String::new());
    lines.push("Bundling".to_string());
    lines.push(format!("  Strategy: {}", bundling.strategy));
    lines.push(format!(
        "  Bundled: {}  Excluded: {}  Unresolved: {}",
        bundling.bundled, bundling.excluded, bundling.unresolved
    ));
    lines.push(format!("  Bundled size: {} bytes", bundling.bundled_size));
    if let (Some(limit), Some(within)) = (bundling.size_limit, bundling.within_limit) {
        lines.push(format!(
            "  Size limit: {limit} bytes ({})",
            if within { "met" } else { "exceeded" }
        ));
    }

    for (title, items) in [
        ("Classpath", &report.classpath),
        ("Recommendations", &report.recommendations),
        ("Warnings", &report.warnings),
        ("Errors", &report.errors),
    ] {
        lines.push(String::new());
        lines.push(title.to_string());
        if items.is_empty() {
            lines.push("  (none)".to_string());
        }
        lines.extend(items.iter().map(|item| format!("  - {item}")));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn list_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

fn counts(map: &BTreeMap<String, usize>) -> String {
    if map.is_empty() {
        return "-".to_string();
    }
    map.iter()
        .map(|(key, count)| format!("{key}={count}"))
        .collect::<Vec<_>>()
        .join(", ")
}
