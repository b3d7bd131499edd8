use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::graph::{
    ConflictStrategy, Dependency, DependencyGraph, DependencyKind, DependencyScope, NodeId,
    Platform,
};

const LARGE_DEPENDENCY_BYTES: u64 = 10 * 1024 * 1024;
const MANY_BUNDLED_DEPENDENCIES: usize = 50;
const MANY_NATIVE_LIBRARIES: usize = 5;

/// Inputs that steer filtering, conflict resolution and bundling.
#[derive(Clone, Debug, Serialize)]
pub struct ResolutionContext {
    pub target_platform: Platform,
    pub java_version: Option<String>,
    pub bundle_native_libraries: bool,
    pub bundle_optional_deps: bool,
    pub max_dependency_depth: usize,
    pub strategy: ConflictStrategy,
    pub include_scopes: BTreeSet<DependencyScope>,
    pub exclude_scopes: BTreeSet<DependencyScope>,
    /// `group:artifact[:version]` entries; empty means everything.
    pub included_dependencies: BTreeSet<String>,
    pub excluded_dependencies: BTreeSet<String>,
}

impl Default for ResolutionContext {
    fn default() -> Self {
        Self {
            target_platform: Platform::Any,
            java_version: None,
            bundle_native_libraries: true,
            bundle_optional_deps: false,
            max_dependency_depth: 10,
            strategy: ConflictStrategy::PreferLatest,
            include_scopes: BTreeSet::from([DependencyScope::Compile, DependencyScope::Runtime]),
            exclude_scopes: BTreeSet::from([DependencyScope::Test]),
            included_dependencies: BTreeSet::new(),
            excluded_dependencies: BTreeSet::new(),
        }
    }
}

/// Whether and why a dependency ends up in the bundle.
#[derive(Clone, Debug, Serialize)]
pub struct BundlingDecision {
    pub dependency: Dependency,
    pub should_bundle: bool,
    pub reason: String,
    pub priority: i32,
    pub estimated_size: Option<u64>,
    pub alternatives: Vec<Dependency>,
}

impl BundlingDecision {
    fn new(dependency: &Dependency, should_bundle: bool, reason: impl Into<String>, priority: i32) -> Self {
        Self {
            dependency: dependency.clone(),
            should_bundle,
            reason: reason.into(),
            priority,
            estimated_size: dependency.size,
            alternatives: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ResolutionMetadata {
    pub total_dependencies: usize,
    pub resolved_count: usize,
    pub excluded_count: usize,
    pub unresolved_count: usize,
    pub conflict_count: usize,
    pub cycle_count: usize,
    pub strategy: String,
    pub target_platform: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ResolutionResult {
    pub resolved: Vec<Dependency>,
    pub excluded: Vec<Dependency>,
    pub conflicts: Vec<(Dependency, Dependency)>,
    pub unresolved: Vec<Dependency>,
    /// Keyed by coordinates.
    pub decisions: BTreeMap<String, BundlingDecision>,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub cycles: Vec<Vec<String>>,
    pub metadata: ResolutionMetadata,
}

/// Outcome of `optimize_for_size`.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SizeOptimization {
    pub max_size: u64,
    pub original_size: u64,
    pub final_size: u64,
    /// Coordinates that were un-bundled to save space.
    pub excluded: Vec<String>,
    pub within_limit: bool,
}

/// Regex over artifact ids mapped to the libraries such artifacts usually pull in.
struct KnownPattern {
    pattern: Regex,
    implies: &'static [(&'static str, &'static str)],
}

const KNOWN_PATTERNS: &[(&str, &[(&str, &str)])] = &[
    (
        r"spring-boot-starter.*",
        &[
            ("org.springframework.boot", "spring-boot"),
            ("org.springframework", "spring-core"),
            ("org.springframework", "spring-context"),
        ],
    ),
    (
        r"spring-web.*",
        &[
            ("org.springframework", "spring-web"),
            ("org.springframework", "spring-webmvc"),
            ("jakarta.servlet", "jakarta.servlet-api"),
        ],
    ),
    (
        r"spring-data.*",
        &[("org.springframework.data", "spring-data-commons")],
    ),
    (
        r"hibernate.*",
        &[
            ("org.hibernate", "hibernate-core"),
            ("javax.persistence", "javax.persistence-api"),
        ],
    ),
];

const STARTER_ARTIFACTS: &[&str] = &["spring-boot-starter", "spring-boot-starter-web"];

const STARTER_IMPLIES: &[(&str, &str)] = &[
    ("org.springframework.boot", "spring-boot"),
    ("org.springframework", "spring-web"),
    ("org.springframework", "spring-webmvc"),
    ("com.fasterxml.jackson.core", "jackson-databind"),
];

/// Builds the dependency graph for a set of declared dependencies and decides what to bundle.
pub struct DependencyResolver {
    known_patterns: Vec<KnownPattern>,
}

impl DependencyResolver {
    pub fn new() -> Result<Self> {
        let known_patterns = KNOWN_PATTERNS
            .iter()
            .map(|&(pattern, implies)| {
                let pattern = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("compile known pattern {pattern}"))?;
                Ok(KnownPattern { pattern, implies })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { known_patterns })
    }

    pub fn resolve(&self, dependencies: &[Dependency], context: &ResolutionContext) -> ResolutionResult {
        self.resolve_with_graph(dependencies, context).0
    }

    /// Resolve and also hand back the graph, e.g. for classpath ordering or DOT export.
    pub fn resolve_with_graph(
        &self,
        dependencies: &[Dependency],
        context: &ResolutionContext,
    ) -> (ResolutionResult, DependencyGraph) {
        info!(
            dependencies = dependencies.len(),
            strategy = %context.strategy,
            "resolving dependencies"
        );
        let mut result = ResolutionResult::default();
        let mut graph = self.build_graph(dependencies);

        // Filtered nodes never take part in conflict resolution.
        let depths = graph.depths();
        let verdicts: Vec<Option<String>> = graph
            .nodes()
            .map(|(id, node)| {
                let depth = depths.get(id.index()).copied().flatten();
                filter_reason(&node.dependency, depth, context)
            })
            .collect();
        let surviving: BTreeSet<NodeId> = graph
            .nodes()
            .filter(|(id, _)| verdicts[id.index()].is_none())
            .map(|(id, _)| id)
            .collect();

        let conflicts = graph.find_conflicts_among(&surviving);
        let resolved_all = graph.resolve_conflicts(context.strategy);
        let mut undecided: BTreeSet<NodeId> = BTreeSet::new();
        for (left, right) in &conflicts {
            let (Some(a), Some(b)) = (graph.dependency(*left), graph.dependency(*right)) else {
                continue;
            };
            if !resolved_all {
                result.errors.push(format!(
                    "unresolved version conflict between {a} and {b}; use explicit include or exclude lists"
                ));
                undecided.insert(*left);
                undecided.insert(*right);
            }
            result.conflicts.push((a.clone(), b.clone()));
        }

        for cycle in graph.detect_cycles() {
            let members: Vec<String> = cycle
                .iter()
                .filter_map(|id| graph.dependency(*id))
                .map(Dependency::coordinates)
                .collect();
            result
                .warnings
                .push(format!("circular dependency detected: {}", members.join(" -> ")));
            result.cycles.push(members);
        }
        let order = graph.topological_order();
        if !order.is_complete() {
            result.warnings.push(format!(
                "{} dependencies could not be ordered because of circular dependencies",
                order.unresolved.len()
            ));
        }

        for (id, node) in graph.nodes() {
            let dependency = &node.dependency;
            if undecided.contains(&id) {
                result.unresolved.push(dependency.clone());
                continue;
            }
            let decision = match &verdicts[id.index()] {
                Some(reason) => BundlingDecision::new(dependency, false, reason.as_str(), 0),
                None => self.decide(dependency, &graph, context),
            };
            if decision.should_bundle {
                result.resolved.push(dependency.clone());
            } else {
                result.excluded.push(dependency.clone());
            }
            result.decisions.insert(dependency.coordinates(), decision);
        }

        result.recommendations = bundling_recommendations(&result.decisions, &result.conflicts, context);
        result.metadata = ResolutionMetadata {
            total_dependencies: graph.len(),
            resolved_count: result.resolved.len(),
            excluded_count: result.excluded.len(),
            unresolved_count: result.unresolved.len(),
            conflict_count: result.conflicts.len(),
            cycle_count: result.cycles.len(),
            strategy: context.strategy.to_string(),
            target_platform: context.target_platform.to_string(),
        };

        info!(
            resolved = result.resolved.len(),
            excluded = result.excluded.len(),
            unresolved = result.unresolved.len(),
            "resolution complete"
        );
        (result, graph)
    }

    fn build_graph(&self, dependencies: &[Dependency]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        let roots: Vec<(NodeId, Dependency)> = dependencies
            .iter()
            .map(|dependency| (graph.add_dependency(dependency.clone(), None), dependency.clone()))
            .collect();
        for (id, dependency) in roots {
            for implied in self.implied_dependencies(&dependency) {
                graph.add_dependency(implied, Some(id));
            }
        }
        debug!(nodes = graph.len(), "dependency graph built");
        graph
    }

    /// One level of transitive expansion from the known-pattern table.
    pub fn implied_dependencies(&self, dependency: &Dependency) -> Vec<Dependency> {
        let mut implied: Vec<(&str, &str)> = Vec::new();
        for known in &self.known_patterns {
            if known.pattern.is_match(&dependency.artifact) {
                implied.extend(known.implies.iter().copied());
            }
        }
        let artifact = dependency.artifact.to_ascii_lowercase();
        if STARTER_ARTIFACTS.contains(&artifact.as_str()) {
            implied.extend(STARTER_IMPLIES.iter().copied());
        }

        let mut seen = BTreeSet::new();
        implied
            .into_iter()
            .filter(|(group, artifact)| {
                !(*group == dependency.group && *artifact == dependency.artifact)
            })
            .filter(|entry| seen.insert(*entry))
            .map(|(group, artifact)| {
                Dependency::new(group, artifact)
                    .transitive()
                    .with_metadata("source", "known_pattern")
            })
            .collect()
    }

    fn decide(
        &self,
        dependency: &Dependency,
        graph: &DependencyGraph,
        context: &ResolutionContext,
    ) -> BundlingDecision {
        if dependency.is_conflict {
            let winner_version = dependency.conflict_resolution.as_deref().unwrap_or("unknown");
            let mut decision = BundlingDecision::new(
                dependency,
                false,
                format!("version conflict resolved in favour of {winner_version}"),
                0,
            );
            decision.alternatives = graph
                .nodes()
                .map(|(_, node)| &node.dependency)
                .filter(|other| {
                    other.key() == dependency.key()
                        && other.version == dependency.conflict_resolution
                })
                .cloned()
                .collect();
            return decision;
        }

        let mut decision = if dependency.kind == DependencyKind::Native {
            if context.bundle_native_libraries {
                BundlingDecision::new(dependency, true, "native library required at runtime", 10)
            } else {
                BundlingDecision::new(dependency, false, "native library bundling disabled", 5)
            }
        } else if dependency.is_optional {
            if context.bundle_optional_deps {
                BundlingDecision::new(dependency, true, "optional dependency bundled on request", 3)
            } else {
                BundlingDecision::new(dependency, false, "optional dependency", 1)
            }
        } else if matches!(
            dependency.scope,
            DependencyScope::Provided | DependencyScope::Test
        ) {
            BundlingDecision::new(
                dependency,
                false,
                format!("{} scope is not bundled", dependency.scope),
                0,
            )
        } else {
            BundlingDecision::new(dependency, true, "required dependency", 8)
        };

        if dependency.kind == DependencyKind::Maven && dependency.version.is_some() {
            decision.alternatives = ["latest", "latest.release"]
                .into_iter()
                .map(|version| Dependency::new(&dependency.group, &dependency.artifact).with_version(version))
                .collect();
        }
        decision
    }

    /// Un-bundle low-priority optional dependencies until the bundled total fits `max_size`.
    pub fn optimize_for_size(
        &self,
        decisions: &mut BTreeMap<String, BundlingDecision>,
        max_size: u64,
    ) -> SizeOptimization {
        let bundled_size = |decisions: &BTreeMap<String, BundlingDecision>| -> u64 {
            decisions
                .values()
                .filter(|decision| decision.should_bundle)
                .filter_map(|decision| decision.estimated_size)
                .sum()
        };
        let original_size = bundled_size(decisions);
        let mut optimization = SizeOptimization {
            max_size,
            original_size,
            final_size: original_size,
            excluded: Vec::new(),
            within_limit: original_size <= max_size,
        };
        if optimization.within_limit {
            return optimization;
        }

        let mut candidates: Vec<(i32, u64, String)> = decisions
            .iter()
            .filter(|(_, decision)| {
                decision.should_bundle && decision.dependency.is_optional && decision.priority <= 3
            })
            .map(|(key, decision)| {
                (
                    decision.priority,
                    decision.estimated_size.unwrap_or(0),
                    key.clone(),
                )
            })
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)).then_with(|| a.2.cmp(&b.2)));

        let mut current = original_size;
        for (_, size, key) in candidates {
            if current <= max_size {
                break;
            }
            if let Some(decision) = decisions.get_mut(&key) {
                decision.should_bundle = false;
                decision.reason = "excluded to meet bundle size limit".to_string();
                current = current.saturating_sub(size);
                optimization.excluded.push(key);
            }
        }

        optimization.final_size = current;
        optimization.within_limit = current <= max_size;
        if !optimization.within_limit {
            warn!(
                max_size,
                final_size = current,
                "bundle size limit cannot be met by dropping optional dependencies"
            );
        }
        optimization
    }
}

/// Classpath entries for resolved dependencies: the file path when known, else the jar name.
pub fn generate_classpath(resolved: &[Dependency]) -> Vec<String> {
    resolved
        .iter()
        .map(|dependency| {
            dependency
                .file_path
                .clone()
                .unwrap_or_else(|| dependency.jar_filename())
        })
        .collect()
}

fn filter_reason(
    dependency: &Dependency,
    depth: Option<usize>,
    context: &ResolutionContext,
) -> Option<String> {
    if context
        .excluded_dependencies
        .iter()
        .any(|entry| dependency.matches_coordinates(entry))
    {
        return Some("explicitly excluded".to_string());
    }
    if !context.included_dependencies.is_empty()
        && !context
            .included_dependencies
            .iter()
            .any(|entry| dependency.matches_coordinates(entry))
    {
        return Some("not in the include list".to_string());
    }
    if !context.include_scopes.contains(&dependency.scope)
        || context.exclude_scopes.contains(&dependency.scope)
    {
        return Some(format!("{} scope not included", dependency.scope));
    }
    if !is_platform_compatible(dependency, context.target_platform) {
        return Some(format!("not supported on {}", context.target_platform));
    }
    if let Some(target) = context.java_version.as_deref() {
        if !is_java_version_compatible(dependency, target) {
            let required = dependency.java_version.as_deref().unwrap_or("unknown");
            return Some(format!("requires Java {required}, target is {target}"));
        }
    }
    if let Some(depth) = depth {
        if depth > context.max_dependency_depth {
            return Some(format!(
                "depth {depth} exceeds maximum of {}",
                context.max_dependency_depth
            ));
        }
    }
    None
}

fn is_platform_compatible(dependency: &Dependency, target: Platform) -> bool {
    target == Platform::Any
        || dependency.supported_platforms.is_empty()
        || dependency
            .supported_platforms
            .iter()
            .any(|platform| *platform == Platform::Any || *platform == target)
}

fn is_java_version_compatible(dependency: &Dependency, target: &str) -> bool {
    let Some(required) = dependency.java_version.as_deref() else {
        return true;
    };
    match (java_major(required), java_major(target)) {
        (Some(required), Some(target)) => target >= required,
        _ => true,
    }
}

/// Feature release number of a Java version string; `1.8` maps to 8.
pub fn java_major(version: &str) -> Option<u32> {
    let mut parts = version.trim().split(['.', '_', '-', '+']);
    let first: u32 = parts.next()?.parse().ok()?;
    if first == 1 {
        parts.next().and_then(|second| second.parse().ok())
    } else {
        Some(first)
    }
}

fn bundling_recommendations(
    decisions: &BTreeMap<String, BundlingDecision>,
    conflicts: &[(Dependency, Dependency)],
    context: &ResolutionContext,
) -> Vec<String> {
    let bundled: Vec<&BundlingDecision> = decisions
        .values()
        .filter(|decision| decision.should_bundle)
        .collect();
    let band = |low: i32, high: i32| {
        bundled
            .iter()
            .filter(|decision| decision.priority >= low && decision.priority < high)
            .count()
    };

    let mut recommendations = Vec::new();
    let high = band(8, i32::MAX);
    let medium = band(5, 8);
    let low = band(2, 5);
    if high > 0 {
        recommendations.push(format!(
            "Bundle {high} high-priority dependencies (required for core functionality)"
        ));
    }
    if medium > 0 {
        recommendations.push(format!(
            "Bundle {medium} medium-priority dependencies (enhanced features)"
        ));
    }
    if low > 0 {
        recommendations.push(format!(
            "Consider bundling {low} low-priority dependencies (optional features)"
        ));
    }
    if bundled.len() > MANY_BUNDLED_DEPENDENCIES {
        recommendations.push(format!(
            "{} bundled dependencies; consider consolidating or shading",
            bundled.len()
        ));
    }
    let native = bundled
        .iter()
        .filter(|decision| decision.dependency.kind == DependencyKind::Native)
        .count();
    if native > MANY_NATIVE_LIBRARIES {
        recommendations.push(format!(
            "{native} native libraries bundled; verify cross-platform compatibility"
        ));
    }
    let large = bundled
        .iter()
        .filter(|decision| decision.estimated_size.unwrap_or(0) > LARGE_DEPENDENCY_BYTES)
        .count();
    if large > 0 {
        recommendations.push(format!(
            "Large dependencies detected: {large} > 10MB (consider external loading)"
        ));
    }
    if !conflicts.is_empty() {
        recommendations.push(format!(
            "{} version conflicts found; review the {} resolution strategy",
            conflicts.len(),
            context.strategy
        ));
    }
    recommendations
}
