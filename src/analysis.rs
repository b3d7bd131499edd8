use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{Result, bail};
use opentelemetry::{Context as OtelContext, KeyValue};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::archive::{
    JarAnalysisResult, analyze_jar, dedupe_jar_dependencies, estimate_java_version,
};
use crate::classfile::JavaVersion;
use crate::graph::{ConflictStrategy, Dependency, DependencyGraph, DependencyScope, Platform};
use crate::resolver::{
    BundlingDecision, DependencyResolver, ResolutionContext, ResolutionResult, SizeOptimization,
    generate_classpath,
};
use crate::telemetry::{Telemetry, current_trace_id, with_span, with_span_in};

const MIB: u64 = 1024 * 1024;
const LARGE_APPLICATION_BYTES: u64 = 50 * MIB;
const LARGE_GRAPH_NODES: usize = 100;

/// Knobs for one analysis run. Maps onto a `ResolutionContext`.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    pub strategy: ConflictStrategy,
    pub target_platform: Platform,
    /// Java release the bundle will run on, e.g. `17` or `1.8`.
    pub java_version: Option<String>,
    pub bundle_native_libraries: bool,
    pub bundle_optional_deps: bool,
    /// Let test and provided scope dependencies past the scope filter so they
    /// show up in the decisions. They are still never bundled.
    pub include_test_scope: bool,
    pub include_provided_scope: bool,
    pub max_dependency_depth: usize,
    /// Bundle size ceiling in bytes.
    pub max_bundle_size: Option<u64>,
    pub included_dependencies: BTreeSet<String>,
    pub excluded_dependencies: BTreeSet<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let context = ResolutionContext::default();
        Self {
            strategy: context.strategy,
            target_platform: context.target_platform,
            java_version: None,
            bundle_native_libraries: context.bundle_native_libraries,
            bundle_optional_deps: context.bundle_optional_deps,
            include_test_scope: false,
            include_provided_scope: false,
            max_dependency_depth: context.max_dependency_depth,
            max_bundle_size: None,
            included_dependencies: BTreeSet::new(),
            excluded_dependencies: BTreeSet::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn resolution_context(&self) -> ResolutionContext {
        let mut context = ResolutionContext {
            target_platform: self.target_platform,
            java_version: self.java_version.clone(),
            bundle_native_libraries: self.bundle_native_libraries,
            bundle_optional_deps: self.bundle_optional_deps,
            max_dependency_depth: self.max_dependency_depth,
            strategy: self.strategy,
            included_dependencies: self.included_dependencies.clone(),
            excluded_dependencies: self.excluded_dependencies.clone(),
            ..ResolutionContext::default()
        };
        if self.include_test_scope {
            context.include_scopes.insert(DependencyScope::Test);
            context.exclude_scopes.remove(&DependencyScope::Test);
        }
        if self.include_provided_scope {
            context.include_scopes.insert(DependencyScope::Provided);
        }
        context
    }
}

/// Everything produced by `analyze_application`.
#[derive(Clone, Debug)]
pub struct ComprehensiveAnalysisResult {
    /// All archives merged into one view.
    pub jar_analysis: JarAnalysisResult,
    pub jar_results: Vec<JarAnalysisResult>,
    pub graph: DependencyGraph,
    pub resolution: ResolutionResult,
    /// Final bundling decisions, after size optimization.
    pub decisions: BTreeMap<String, BundlingDecision>,
    /// Dependency-first launch classpath.
    pub classpath: Vec<String>,
    pub size_optimization: Option<SizeOptimization>,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// Trace of the `analysis` span when telemetry is enabled.
    pub trace_id: Option<String>,
}

/// Analyze the given archives as one application.
///
/// Fails only when `paths` is empty; every other problem lands in `warnings` or `errors`.
pub fn analyze_application(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    telemetry: Option<&Telemetry>,
) -> Result<ComprehensiveAnalysisResult> {
    if paths.is_empty() {
        bail!("no archives to analyze");
    }
    let attributes = [KeyValue::new("jarscope.archive_count", paths.len() as i64)];
    with_span(telemetry, "analysis", &attributes, || {
        run_analysis(paths, config, telemetry)
    })
}

fn run_analysis(
    paths: &[PathBuf],
    config: &AnalysisConfig,
    telemetry: Option<&Telemetry>,
) -> Result<ComprehensiveAnalysisResult> {
    let trace_id = current_trace_id();
    info!(
        archives = paths.len(),
        strategy = %config.strategy,
        trace_id = trace_id.as_deref().unwrap_or("-"),
        "analyzing application"
    );

    let parent_cx = OtelContext::current();
    let jar_results: Vec<JarAnalysisResult> = paths
        .par_iter()
        .map(|path| {
            let attributes = [KeyValue::new(
                "jarscope.jar_path",
                path.display().to_string(),
            )];
            with_span_in(telemetry, "jar.analyze", &attributes, &parent_cx, || {
                analyze_jar(path)
            })
        })
        .collect();

    let jar_analysis = merge_results(&jar_results);
    let mut warnings = jar_analysis.warnings.clone();
    let mut errors = jar_analysis.errors.clone();

    let resolver = DependencyResolver::new()?;
    let context = config.resolution_context();
    let dependency_attributes = [KeyValue::new(
        "jarscope.dependency_count",
        jar_analysis.dependencies.len() as i64,
    )];
    let (mut resolution, graph) = with_span(telemetry, "resolve", &dependency_attributes, || {
        resolver.resolve_with_graph(&jar_analysis.dependencies, &context)
    });

    let mut recommendations = resolution.recommendations.clone();
    let size_optimization = config.max_bundle_size.map(|max_size| {
        let optimization = resolver.optimize_for_size(&mut resolution.decisions, max_size);
        apply_size_optimization(&mut resolution, &optimization);
        recommendations.push(size_recommendation(&optimization));
        optimization
    });

    let classpath = ordered_classpath(&graph, &resolution.resolved);
    recommendations.extend(application_recommendations(&jar_analysis, &graph, &resolution));
    warnings.extend(resolution.warnings.iter().cloned());
    errors.extend(resolution.errors.iter().cloned());

    info!(
        classpath = classpath.len(),
        warnings = warnings.len(),
        errors = errors.len(),
        "analysis complete"
    );
    Ok(ComprehensiveAnalysisResult {
        jar_analysis,
        jar_results,
        graph,
        decisions: resolution.decisions.clone(),
        resolution,
        classpath,
        size_optimization,
        recommendations,
        warnings,
        errors,
        trace_id,
    })
}

/// Combine per-archive results; messages are prefixed with their archive path.
fn merge_results(results: &[JarAnalysisResult]) -> JarAnalysisResult {
    let mut merged = JarAnalysisResult {
        jar_path: results
            .iter()
            .map(|result| result.jar_path.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        ..JarAnalysisResult::default()
    };
    let mut candidates = BTreeSet::new();
    for result in results {
        merged.is_valid_jar |= result.is_valid_jar;
        merged.jar_size += result.jar_size;
        merged.entry_count += result.entry_count;
        if merged.manifest.is_none() && result.is_valid_jar {
            merged.manifest = result.manifest.clone();
        }
        if merged.artifact.is_none() {
            merged.artifact = result.artifact.clone();
        }
        merged.class_files.extend(result.class_files.iter().cloned());
        merged.resources.extend(result.resources.iter().cloned());
        merged
            .native_libraries
            .extend(result.native_libraries.iter().cloned());
        merged.config_files.extend(result.config_files.iter().cloned());
        merged
            .signature_files
            .extend(result.signature_files.iter().cloned());
        merged.dependencies.extend(result.dependencies.iter().cloned());
        for candidate in &result.main_class_candidates {
            if candidates.insert(candidate.clone()) {
                merged.main_class_candidates.push(candidate.clone());
            }
        }
        merged.warnings.extend(
            result
                .warnings
                .iter()
                .map(|message| format!("{}: {message}", result.jar_path)),
        );
        merged.errors.extend(
            result
                .errors
                .iter()
                .map(|message| format!("{}: {message}", result.jar_path)),
        );
    }
    dedupe_jar_dependencies(&mut merged.dependencies);
    merged.estimated_java_version = estimate_java_version(&merged.class_files);
    merged
}

fn apply_size_optimization(resolution: &mut ResolutionResult, optimization: &SizeOptimization) {
    for coordinates in &optimization.excluded {
        if let Some(position) = resolution
            .resolved
            .iter()
            .position(|dependency| dependency.coordinates() == *coordinates)
        {
            let dependency = resolution.resolved.remove(position);
            resolution.excluded.push(dependency);
        }
    }
    resolution.metadata.resolved_count = resolution.resolved.len();
    resolution.metadata.excluded_count = resolution.excluded.len();
}

fn size_recommendation(optimization: &SizeOptimization) -> String {
    let final_mb = optimization.final_size as f64 / MIB as f64;
    let max_mb = optimization.max_size as f64 / MIB as f64;
    if optimization.excluded.is_empty() && optimization.within_limit {
        format!("Size within limit ({final_mb:.1}MB <= {max_mb:.1}MB)")
    } else if optimization.within_limit {
        format!(
            "Excluded {} low-priority dependencies to meet size constraint ({final_mb:.1}MB <= {max_mb:.1}MB)",
            optimization.excluded.len()
        )
    } else {
        warn!(final_mb, max_mb, "bundle exceeds size limit");
        format!(
            "Bundle still exceeds size limit ({final_mb:.1}MB > {max_mb:.1}MB); consider loading large dependencies externally"
        )
    }
}

/// Resolved dependencies in graph order, dependencies before dependents.
/// Anything the order leaves out (cycles) follows, sorted by coordinates.
fn ordered_classpath(graph: &DependencyGraph, resolved: &[Dependency]) -> Vec<String> {
    let wanted: BTreeSet<String> = resolved.iter().map(Dependency::coordinates).collect();
    let order = graph.topological_order();
    let mut placed = BTreeSet::new();
    let mut ordered: Vec<Dependency> = Vec::with_capacity(resolved.len());
    for id in &order.nodes {
        if let Some(dependency) = graph.dependency(*id) {
            let coordinates = dependency.coordinates();
            if wanted.contains(&coordinates) && placed.insert(coordinates) {
                ordered.push(dependency.clone());
            }
        }
    }
    let mut rest: Vec<Dependency> = resolved
        .iter()
        .filter(|dependency| !placed.contains(&dependency.coordinates()))
        .cloned()
        .collect();
    rest.sort_by_key(Dependency::coordinates);
    ordered.extend(rest);
    generate_classpath(&ordered)
}

fn application_recommendations(
    jar_analysis: &JarAnalysisResult,
    graph: &DependencyGraph,
    resolution: &ResolutionResult,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if jar_analysis.jar_size > LARGE_APPLICATION_BYTES {
        recommendations.push(format!(
            "Application archives total {:.1}MB; consider splitting or slimming the bundle",
            jar_analysis.jar_size as f64 / MIB as f64
        ));
    }
    if graph.len() > LARGE_GRAPH_NODES {
        recommendations.push(format!(
            "Dependency graph has {} nodes; consider trimming unused dependencies",
            graph.len()
        ));
    }
    if !resolution.conflicts.is_empty() {
        recommendations.push(format!(
            "Resolve {} version conflicts before packaging",
            resolution.conflicts.len()
        ));
    }
    if !jar_analysis.native_libraries.is_empty() {
        recommendations.push(format!(
            "{} native libraries found; package a bundle per target platform",
            jar_analysis.native_libraries.len()
        ));
    }
    if jar_analysis.estimated_java_version != JavaVersion::Unknown {
        recommendations.push(format!(
            "Bundle a Java {} or newer runtime",
            jar_analysis.estimated_java_version
        ));
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ClassFileBuilder, pom_xml, write_jar};

    #[test]
    fn empty_input_is_an_error() {
        let result = analyze_application(&[], &AnalysisConfig::default(), None);

        assert!(result.is_err());
    }

    #[test]
    fn trace_id_is_absent_without_telemetry() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let jar = temp_dir.path().join("empty.jar");
        write_jar(&jar, &[("README.txt", b"hello")]).expect("write jar");

        let result = analyze_application(&[jar], &AnalysisConfig::default(), None).expect("analysis");

        assert_eq!(result.trace_id, None);
    }

    #[test]
    fn compile_scope_wins_across_archives() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let first = temp_dir.path().join("first.jar");
        let second = temp_dir.path().join("second.jar");
        let first_pom = pom_xml(&[("org.example", "libX", "1.0", "compile")]);
        let second_pom = pom_xml(&[("org.example", "libX", "2.0", "runtime")]);
        write_jar(
            &first,
            &[("META-INF/maven/org.example/first/pom.xml", first_pom.as_bytes())],
        )
        .expect("write first jar");
        write_jar(
            &second,
            &[("META-INF/maven/org.example/second/pom.xml", second_pom.as_bytes())],
        )
        .expect("write second jar");
        let config = AnalysisConfig {
            strategy: ConflictStrategy::PreferCompileScope,
            ..AnalysisConfig::default()
        };

        let result = analyze_application(&[first, second], &config, None).expect("analysis");

        let resolved: Vec<String> = result
            .resolution
            .resolved
            .iter()
            .map(Dependency::coordinates)
            .collect();
        let excluded: Vec<String> = result
            .resolution
            .excluded
            .iter()
            .map(Dependency::coordinates)
            .collect();
        assert_eq!(resolved, vec!["org.example:libX:1.0"]);
        assert_eq!(excluded, vec!["org.example:libX:2.0"]);
        assert_eq!(result.resolution.conflicts.len(), 1);
        assert_eq!(result.classpath, vec!["libX-1.0.jar"]);
        assert!(result.errors.is_empty());
        assert_eq!(result.jar_results.len(), 2);
    }

    #[test]
    fn jar_shipped_by_two_archives_is_one_node() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let app = temp_dir.path().join("app.jar");
        let launcher = temp_dir.path().join("launcher.jar");
        write_jar(&app, &[("lib/guava-31.1-jre.jar", b"jar bytes")]).expect("write app jar");
        write_jar(
            &launcher,
            &[(
                "META-INF/MANIFEST.MF",
                b"Manifest-Version: 1.0\nClass-Path: guava-31.1-jre.jar\n",
            )],
        )
        .expect("write launcher jar");

        let result =
            analyze_application(&[app, launcher], &AnalysisConfig::default(), None)
                .expect("analysis");

        let guava: Vec<String> = result
            .graph
            .nodes()
            .map(|(_, node)| &node.dependency)
            .filter(|dependency| dependency.artifact == "guava")
            .map(Dependency::coordinates)
            .collect();
        assert_eq!(guava, vec!["embedded:guava:31.1-jre"]);
        assert!(result.resolution.conflicts.is_empty());
    }

    #[test]
    fn invalid_archive_is_reported_and_others_still_analyzed() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let good = temp_dir.path().join("good.jar");
        let bad = temp_dir.path().join("bad.jar");
        let class = ClassFileBuilder::new("demo/App", Some("java/lang/Object")).finish();
        write_jar(
            &good,
            &[
                ("META-INF/MANIFEST.MF", b"Main-Class: demo.App\n"),
                ("demo/App.class", &class),
            ],
        )
        .expect("write jar");
        std::fs::write(&bad, b"not a zip").expect("write bad jar");

        let result =
            analyze_application(&[bad.clone(), good], &AnalysisConfig::default(), None)
                .expect("analysis");

        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with(&bad.display().to_string()));
        assert!(result.jar_analysis.is_valid_jar);
        assert_eq!(
            result
                .jar_analysis
                .manifest
                .as_ref()
                .and_then(|manifest| manifest.main_class.as_deref()),
            Some("demo.App")
        );
        assert_eq!(result.jar_analysis.main_class_candidates, vec!["demo.App"]);
        assert!(
            result
                .recommendations
                .contains(&"Bundle a Java 1.8 or newer runtime".to_string())
        );
    }

    #[test]
    fn classpath_follows_dependency_order_and_file_paths() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let jar = temp_dir.path().join("boot.jar");
        let pom = pom_xml(&[(
            "org.springframework.boot",
            "spring-boot-starter",
            "3.2.0",
            "compile",
        )]);
        write_jar(
            &jar,
            &[
                ("META-INF/maven/com.example/app/pom.xml", pom.as_bytes()),
                ("BOOT-INF/lib/jackson-core-2.15.0.jar", b"jar"),
            ],
        )
        .expect("write jar");

        let result =
            analyze_application(&[jar], &AnalysisConfig::default(), None).expect("analysis");

        let position = |entry: &str| {
            result
                .classpath
                .iter()
                .position(|item| item == entry)
                .unwrap_or_else(|| panic!("missing {entry} in {:?}", result.classpath))
        };
        assert!(position("spring-core.jar") < position("spring-boot-starter-3.2.0.jar"));
        assert!(position("spring-boot.jar") < position("spring-boot-starter-3.2.0.jar"));
        position("BOOT-INF/lib/jackson-core-2.15.0.jar");
        assert_eq!(result.classpath.len(), result.resolution.resolved.len());
    }

    #[test]
    fn size_ceiling_is_reported() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let jar = temp_dir.path().join("fat.jar");
        write_jar(&jar, &[("lib/big-1.0.jar", &[0u8; 4096])]).expect("write jar");
        let config = AnalysisConfig {
            max_bundle_size: Some(1024),
            ..AnalysisConfig::default()
        };

        let result = analyze_application(&[jar], &config, None).expect("analysis");

        let optimization = result.size_optimization.as_ref().expect("optimization");
        assert_eq!(optimization.original_size, 4096);
        assert!(!optimization.within_limit);
        assert!(
            result
                .recommendations
                .iter()
                .any(|recommendation| recommendation.starts_with("Bundle still exceeds size limit"))
        );
    }

    #[test]
    fn config_maps_scope_switches_onto_context() {
        let config = AnalysisConfig {
            include_test_scope: true,
            include_provided_scope: true,
            ..AnalysisConfig::default()
        };

        let context = config.resolution_context();

        assert!(context.include_scopes.contains(&DependencyScope::Test));
        assert!(context.include_scopes.contains(&DependencyScope::Provided));
        assert!(!context.exclude_scopes.contains(&DependencyScope::Test));
        assert_eq!(context.max_dependency_depth, 10);
    }
}
