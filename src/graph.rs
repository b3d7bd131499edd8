use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;
use tracing::{debug, warn};

/// Maven-style dependency scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyScope {
    Compile,
    Runtime,
    Test,
    Provided,
    Optional,
    System,
}

impl DependencyScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Runtime => "runtime",
            Self::Test => "test",
            Self::Provided => "provided",
            Self::Optional => "optional",
            Self::System => "system",
        }
    }
}

impl FromStr for DependencyScope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compile" => Ok(Self::Compile),
            "runtime" => Ok(Self::Runtime),
            "test" => Ok(Self::Test),
            "provided" => Ok(Self::Provided),
            "optional" => Ok(Self::Optional),
            "system" => Ok(Self::System),
            other => Err(format!("unknown dependency scope: {other}")),
        }
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of artifact a dependency refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Maven,
    Jar,
    Native,
    Resource,
    Platform,
    Module,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maven => "maven",
            Self::Jar => "jar",
            Self::Native => "native",
            Self::Resource => "resource",
            Self::Platform => "platform",
            Self::Module => "module",
        }
    }
}

/// Operating system a bundle or native library targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Any,
    Linux,
    Windows,
    Macos,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Macos => "macos",
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            "macos" | "darwin" | "osx" => Ok(Self::Macos),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency identified by `(group, artifact, version)`.
///
/// Equality and hashing only look at the identity triple. Everything else is
/// descriptive and may be merged when the same coordinate is seen twice.
#[derive(Clone, Debug, Serialize)]
pub struct Dependency {
    pub group: String,
    pub artifact: String,
    pub version: Option<String>,
    pub scope: DependencyScope,
    pub kind: DependencyKind,
    pub file_path: Option<String>,
    pub is_optional: bool,
    pub is_transitive: bool,
    pub is_conflict: bool,
    pub conflict_resolution: Option<String>,
    /// Empty means any platform.
    pub supported_platforms: Vec<Platform>,
    /// Minimum Java release, e.g. `11` or `1.8`.
    pub java_version: Option<String>,
    pub size: Option<u64>,
    pub metadata: BTreeMap<String, String>,
}

impl Dependency {
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: None,
            scope: DependencyScope::Compile,
            kind: DependencyKind::Maven,
            file_path: None,
            is_optional: false,
            is_transitive: false,
            is_conflict: false,
            conflict_resolution: None,
            supported_platforms: Vec::new(),
            java_version: None,
            size: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_scope(mut self, scope: DependencyScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_kind(mut self, kind: DependencyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_platforms(mut self, platforms: Vec<Platform>) -> Self {
        self.supported_platforms = platforms;
        self
    }

    pub fn with_java_version(mut self, version: impl Into<String>) -> Self {
        self.java_version = Some(version.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    pub fn transitive(mut self) -> Self {
        self.is_transitive = true;
        self
    }

    /// `group:artifact[:version]`
    pub fn coordinates(&self) -> String {
        match &self.version {
            Some(version) => format!("{}:{}:{}", self.group, self.artifact, version),
            None => format!("{}:{}", self.group, self.artifact),
        }
    }

    /// `group:artifact`, used to group versions of the same library.
    pub fn key(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }

    pub fn jar_filename(&self) -> String {
        match &self.version {
            Some(version) => format!("{}-{}.jar", self.artifact, version),
            None => format!("{}.jar", self.artifact),
        }
    }

    /// True when `coordinates` names this dependency's `group:artifact`, with or without a version.
    pub fn matches_coordinates(&self, coordinates: &str) -> bool {
        let mut parts = coordinates.splitn(3, ':');
        let group = parts.next();
        let artifact = parts.next();
        let version = parts.next();
        match (group, artifact) {
            (Some(group), Some(artifact)) => {
                group == self.group
                    && artifact == self.artifact
                    && version.is_none_or(|version| Some(version) == self.version.as_deref())
            }
            _ => false,
        }
    }

    /// Parse `group:artifact[:version]`.
    pub fn parse_coordinates(coordinates: &str) -> Option<Self> {
        let mut parts = coordinates.trim().splitn(3, ':');
        let group = parts.next().filter(|part| !part.is_empty())?;
        let artifact = parts.next().filter(|part| !part.is_empty())?;
        let dependency = Self::new(group, artifact);
        match parts.next().filter(|part| !part.is_empty()) {
            Some(version) => Some(dependency.with_version(version)),
            None => Some(dependency),
        }
    }

    /// Build a dependency from a jar file name such as `lib/guava-31.1-jre.jar`.
    ///
    /// The version starts at the first `-` followed by a digit.
    pub fn from_jar_name(group: impl Into<String>, path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let stem = file_name
            .strip_suffix(".jar")
            .or_else(|| file_name.strip_suffix(".JAR"))
            .unwrap_or(file_name);
        let split = stem
            .char_indices()
            .zip(stem.chars().skip(1))
            .find(|((_, current), next)| *current == '-' && next.is_ascii_digit())
            .map(|((index, _), _)| index);
        let dependency = match split {
            Some(index) => Self::new(group, &stem[..index]).with_version(&stem[index + 1..]),
            None => Self::new(group, stem),
        };
        dependency.with_kind(DependencyKind::Jar)
    }

    fn merge_from(&mut self, other: &Dependency) {
        if self.version.is_none() {
            self.version = other.version.clone();
        }
        if self.file_path.is_none() {
            self.file_path = other.file_path.clone();
        }
        if self.size.is_none() {
            self.size = other.size;
        }
        if self.java_version.is_none() {
            self.java_version = other.java_version.clone();
        }
        for platform in &other.supported_platforms {
            if !self.supported_platforms.contains(platform) {
                self.supported_platforms.push(*platform);
            }
        }
        self.metadata
            .extend(other.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.is_transitive = self.is_transitive || other.is_transitive;
        self.is_optional = self.is_optional || other.is_optional;
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group && self.artifact == other.artifact && self.version == other.version
    }
}

impl Eq for Dependency {}

impl std::hash::Hash for Dependency {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.group.hash(state);
        self.artifact.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.coordinates())
    }
}

/// Compare version strings segment by segment.
///
/// Segments split on `.`, `-`, `_` and `+`; numeric segments compare numerically,
/// everything else lexically. A longer version wins a tie on the common prefix.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let split = |value: &str| -> Vec<String> {
        value
            .split(['.', '-', '_', '+'])
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    };
    let left_segments = split(left);
    let right_segments = split(right);
    for (a, b) in left_segments.iter().zip(right_segments.iter()) {
        let ordering = match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b),
            _ => a.cmp(b),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left_segments
        .len()
        .cmp(&right_segments.len())
        .then_with(|| left.cmp(right))
}

/// Strategy used to pick a winner between two conflicting versions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    #[default]
    PreferLatest,
    PreferCompileScope,
    PreferNonOptional,
    PreferDirect,
    PreferShortestPath,
    /// Never picks a winner; conflicts need explicit include/exclude lists.
    Manual,
}

impl ConflictStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreferLatest => "prefer_latest",
            Self::PreferCompileScope => "prefer_compile_scope",
            Self::PreferNonOptional => "prefer_non_optional",
            Self::PreferDirect => "prefer_direct",
            Self::PreferShortestPath => "prefer_shortest_path",
            Self::Manual => "manual",
        }
    }
}

impl FromStr for ConflictStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "prefer_latest" => Ok(Self::PreferLatest),
            "prefer_compile_scope" => Ok(Self::PreferCompileScope),
            "prefer_non_optional" => Ok(Self::PreferNonOptional),
            "prefer_direct" => Ok(Self::PreferDirect),
            "prefer_shortest_path" => Ok(Self::PreferShortestPath),
            "manual" => Ok(Self::Manual),
            other => Err(format!("unknown conflict resolution strategy: {other}")),
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of a node in the graph arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One dependency plus its edges. Edges are arena indices, never owning references.
#[derive(Clone, Debug)]
pub struct DependencyNode {
    pub dependency: Dependency,
    dependencies: BTreeSet<NodeId>,
    dependents: BTreeSet<NodeId>,
    is_root: bool,
}

impl DependencyNode {
    /// Nodes this node requires.
    pub fn dependencies(&self) -> &BTreeSet<NodeId> {
        &self.dependencies
    }

    /// Nodes that require this node.
    pub fn dependents(&self) -> &BTreeSet<NodeId> {
        &self.dependents
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn is_leaf(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Result of a dependency-first topological sort.
#[derive(Clone, Debug, Default)]
pub struct TopologicalOrder {
    /// Every node appears after all nodes it depends on.
    pub nodes: Vec<NodeId>,
    /// Nodes on or behind a cycle.
    pub unresolved: Vec<NodeId>,
}

impl TopologicalOrder {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Aggregate counts over a graph.
#[derive(Clone, Debug, Default, Serialize)]
pub struct GraphSummary {
    pub total_dependencies: usize,
    pub root_dependencies: usize,
    pub leaf_dependencies: usize,
    pub conflicts: usize,
    pub cycles: usize,
    pub optional_dependencies: usize,
    pub transitive_dependencies: usize,
    pub scopes: BTreeMap<String, usize>,
    pub kinds: BTreeMap<String, usize>,
}

/// Arena-backed dependency graph for one analysis run.
#[derive(Clone, Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    index: BTreeMap<String, NodeId>,
    roots: BTreeSet<NodeId>,
    conflicts: Vec<(NodeId, NodeId)>,
    cycles: Vec<Vec<NodeId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&DependencyNode> {
        self.nodes.get(id.0)
    }

    pub fn dependency(&self, id: NodeId) -> Option<&Dependency> {
        self.node(id).map(|node| &node.dependency)
    }

    pub fn node_id(&self, coordinates: &str) -> Option<NodeId> {
        self.index.get(coordinates).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &DependencyNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    pub fn roots(&self) -> &BTreeSet<NodeId> {
        &self.roots
    }

    /// Conflicts from the last `find_conflicts` call.
    pub fn conflicts(&self) -> &[(NodeId, NodeId)] {
        &self.conflicts
    }

    /// Cycles from the last `detect_cycles` call.
    pub fn cycles(&self) -> &[Vec<NodeId>] {
        &self.cycles
    }

    /// Insert a dependency, merging into an existing node with the same coordinates.
    ///
    /// With a parent, an edge parent→node is added; a new node without a parent
    /// becomes a root.
    pub fn add_dependency(&mut self, dependency: Dependency, parent: Option<NodeId>) -> NodeId {
        let coordinates = dependency.coordinates();
        let parent = parent.filter(|parent| {
            let known = parent.0 < self.nodes.len();
            if !known {
                warn!(%coordinates, parent = parent.0, "ignoring unknown parent node");
            }
            known
        });

        if let Some(existing) = self.index.get(&coordinates).copied() {
            self.nodes[existing.0].dependency.merge_from(&dependency);
            if let Some(parent) = parent {
                self.add_edge(parent, existing);
            }
            return existing;
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(DependencyNode {
            dependency,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            is_root: parent.is_none(),
        });
        self.index.insert(coordinates, id);
        match parent {
            Some(parent) => {
                self.add_edge(parent, id);
            }
            None => {
                self.roots.insert(id);
            }
        }
        id
    }

    /// Add `from` requires `to`. Unknown ids and self-edges are rejected.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        if from == to || from.0 >= self.nodes.len() || to.0 >= self.nodes.len() {
            return false;
        }
        self.nodes[from.0].dependencies.insert(to);
        self.nodes[to.0].dependents.insert(from);
        true
    }

    /// Pair up nodes that share `group:artifact` but differ in version.
    ///
    /// Pairs where both sides are optional are skipped.
    pub fn find_conflicts(&mut self) -> Vec<(NodeId, NodeId)> {
        let everything: BTreeSet<NodeId> = (0..self.nodes.len()).map(NodeId).collect();
        self.find_conflicts_among(&everything)
    }

    /// Like `find_conflicts`, but only nodes in `candidates` take part.
    pub fn find_conflicts_among(&mut self, candidates: &BTreeSet<NodeId>) -> Vec<(NodeId, NodeId)> {
        let mut groups: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        for id in candidates {
            if let Some(node) = self.nodes.get(id.0) {
                groups.entry(node.dependency.key()).or_default().push(*id);
            }
        }

        let mut conflicts = Vec::new();
        for members in groups.values_mut() {
            if members.len() < 2 {
                continue;
            }
            members.sort_by_key(|id| self.nodes[id.0].dependency.coordinates());
            for (position, left) in members.iter().enumerate() {
                for right in &members[position + 1..] {
                    let a = &self.nodes[left.0].dependency;
                    let b = &self.nodes[right.0].dependency;
                    if a.version == b.version || (a.is_optional && b.is_optional) {
                        continue;
                    }
                    conflicts.push((*left, *right));
                }
            }
        }

        debug!(conflicts = conflicts.len(), "version conflict scan complete");
        self.conflicts = conflicts.clone();
        conflicts
    }

    /// Find cycles with an explicit-stack DFS.
    ///
    /// Traversal starts at every root, then at any node not reached from a root.
    /// Each cycle is the stack slice from the revisited node to the current node.
    pub fn detect_cycles(&mut self) -> Vec<Vec<NodeId>> {
        let count = self.nodes.len();
        let mut visited = vec![false; count];
        let mut on_stack = vec![false; count];
        let mut cycles = Vec::new();

        let starts: Vec<NodeId> = self
            .roots
            .iter()
            .copied()
            .chain((0..count).map(NodeId))
            .collect();

        for start in starts {
            if visited[start.0] {
                continue;
            }
            visited[start.0] = true;
            on_stack[start.0] = true;
            let mut stack: Vec<(NodeId, Vec<NodeId>, usize)> = vec![(
                start,
                self.nodes[start.0].dependencies.iter().copied().collect(),
                0,
            )];

            while let Some((node, children, cursor)) = stack.last_mut() {
                if *cursor >= children.len() {
                    on_stack[node.0] = false;
                    stack.pop();
                    continue;
                }
                let next = children[*cursor];
                *cursor += 1;

                if on_stack[next.0] {
                    if let Some(position) = stack.iter().position(|frame| frame.0 == next) {
                        let cycle: Vec<NodeId> =
                            stack[position..].iter().map(|frame| frame.0).collect();
                        debug!(length = cycle.len(), "dependency cycle found");
                        cycles.push(cycle);
                    }
                } else if !visited[next.0] {
                    visited[next.0] = true;
                    on_stack[next.0] = true;
                    let children = self.nodes[next.0].dependencies.iter().copied().collect();
                    stack.push((next, children, 0));
                }
            }
        }

        self.cycles = cycles.clone();
        cycles
    }

    /// Kahn's algorithm, dependency-first.
    pub fn topological_order(&self) -> TopologicalOrder {
        let mut pending: Vec<usize> = self
            .nodes
            .iter()
            .map(|node| node.dependencies.len())
            .collect();
        let mut queue: VecDeque<NodeId> = pending
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(index, _)| NodeId(index))
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            order.push(id);
            for dependent in &self.nodes[id.0].dependents {
                pending[dependent.0] -= 1;
                if pending[dependent.0] == 0 {
                    queue.push_back(*dependent);
                }
            }
        }

        let unresolved: Vec<NodeId> = pending
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(index, _)| NodeId(index))
            .collect();
        if !unresolved.is_empty() {
            warn!(
                nodes = unresolved.len(),
                "circular dependencies: nodes left out of topological order"
            );
        }

        TopologicalOrder {
            nodes: order,
            unresolved,
        }
    }

    /// Apply `strategy` to every cached conflict. Losers get `is_conflict` set
    /// and remember the winner's version.
    ///
    /// Returns false when any pair was left undecided.
    pub fn resolve_conflicts(&mut self, strategy: ConflictStrategy) -> bool {
        if self.conflicts.is_empty() {
            return true;
        }
        let depths = if strategy == ConflictStrategy::PreferShortestPath {
            self.depths()
        } else {
            Vec::new()
        };

        let mut success = true;
        for (left, right) in self.conflicts.clone() {
            let Some(winner) = self.pick_winner(left, right, strategy, &depths) else {
                success = false;
                continue;
            };
            let loser = if winner == left { right } else { left };
            let winning_version = self.nodes[winner.0].dependency.version.clone();
            let dependency = &mut self.nodes[loser.0].dependency;
            dependency.is_conflict = true;
            dependency.conflict_resolution = winning_version;
        }
        success
    }

    /// Pick the node that should survive a conflict, or `None` when the strategy defers.
    pub fn pick_winner(
        &self,
        left: NodeId,
        right: NodeId,
        strategy: ConflictStrategy,
        depths: &[Option<usize>],
    ) -> Option<NodeId> {
        let a = &self.nodes[left.0].dependency;
        let b = &self.nodes[right.0].dependency;
        let prefer = |left_wins: bool, right_wins: bool| {
            if right_wins && !left_wins {
                right
            } else {
                left
            }
        };
        let winner = match strategy {
            ConflictStrategy::PreferLatest => match (&a.version, &b.version) {
                (Some(va), Some(vb)) => {
                    if compare_versions(vb, va) == Ordering::Greater {
                        right
                    } else {
                        left
                    }
                }
                (None, Some(_)) => right,
                _ => left,
            },
            ConflictStrategy::PreferCompileScope => prefer(
                a.scope == DependencyScope::Compile,
                b.scope == DependencyScope::Compile,
            ),
            ConflictStrategy::PreferNonOptional => prefer(!a.is_optional, !b.is_optional),
            ConflictStrategy::PreferDirect => prefer(!a.is_transitive, !b.is_transitive),
            ConflictStrategy::PreferShortestPath => {
                let depth_a = depths.get(left.0).copied().flatten();
                let depth_b = depths.get(right.0).copied().flatten();
                match (depth_a, depth_b) {
                    (Some(da), Some(db)) if db < da => right,
                    (None, Some(_)) => right,
                    _ => left,
                }
            }
            ConflictStrategy::Manual => return None,
        };
        Some(winner)
    }

    /// Shortest distance from any root, `None` for nodes no root reaches.
    pub fn depths(&self) -> Vec<Option<usize>> {
        let mut depths = vec![None; self.nodes.len()];
        let mut queue = VecDeque::new();
        for root in &self.roots {
            depths[root.0] = Some(0);
            queue.push_back(*root);
        }
        while let Some(id) = queue.pop_front() {
            let next_depth = depths[id.0].map(|depth| depth + 1);
            for child in &self.nodes[id.0].dependencies {
                if depths[child.0].is_none() {
                    depths[child.0] = next_depth;
                    queue.push_back(*child);
                }
            }
        }
        depths
    }

    /// Everything reachable from `id`, excluding `id` itself.
    pub fn transitive_dependencies(&self, id: NodeId) -> BTreeSet<NodeId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            let Some(node) = self.node(current) else {
                continue;
            };
            for child in &node.dependencies {
                if seen.insert(*child) {
                    queue.push_back(*child);
                }
            }
        }
        seen.remove(&id);
        seen
    }

    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| node.is_leaf())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn summary(&self) -> GraphSummary {
        let mut summary = GraphSummary {
            total_dependencies: self.nodes.len(),
            root_dependencies: self.roots.len(),
            leaf_dependencies: self.leaves().len(),
            conflicts: self.conflicts.len(),
            cycles: self.cycles.len(),
            ..GraphSummary::default()
        };
        for node in &self.nodes {
            let dependency = &node.dependency;
            *summary
                .scopes
                .entry(dependency.scope.as_str().to_string())
                .or_default() += 1;
            *summary
                .kinds
                .entry(dependency.kind.as_str().to_string())
                .or_default() += 1;
            if dependency.is_optional {
                summary.optional_dependencies += 1;
            }
            if dependency.is_transitive {
                summary.transitive_dependencies += 1;
            }
        }
        summary
    }

    /// Graphviz DOT rendering; conflicts are red, optional gray, transitive blue, roots green.
    pub fn to_dot(&self) -> String {
        let mut lines = vec![
            "digraph dependency_graph {".to_string(),
            "  rankdir=LR;".to_string(),
            "  node [shape=box, style=filled];".to_string(),
        ];
        for node in &self.nodes {
            let dependency = &node.dependency;
            let mut label = dependency.artifact.clone();
            if let Some(version) = &dependency.version {
                label.push_str(&format!("\\n({version})"));
            }
            let color = if dependency.is_conflict {
                "red"
            } else if dependency.is_optional {
                "lightgray"
            } else if dependency.is_transitive {
                "lightblue"
            } else if node.is_root {
                "lightgreen"
            } else {
                "white"
            };
            lines.push(format!(
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];",
                dependency.coordinates(),
                label,
                color
            ));
        }
        for node in &self.nodes {
            for child in &node.dependencies {
                lines.push(format!(
                    "  \"{}\" -> \"{}\";",
                    node.dependency.coordinates(),
                    self.nodes[child.0].dependency.coordinates()
                ));
            }
        }
        lines.push("}".to_string());
        lines.join("\n")
    }
}
