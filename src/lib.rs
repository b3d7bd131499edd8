//! Dependency analysis and bundling resolution for JVM JAR files.
//!
//! `analysis::analyze_application` is the entry point: it inspects each archive,
//! builds a dependency graph from what it finds, resolves version conflicts and
//! decides what belongs in a self-contained bundle.

pub mod analysis;
pub mod archive;
pub mod classfile;
pub mod graph;
pub mod manifest;
pub mod reader;
pub mod report;
pub mod resolver;
pub mod telemetry;

#[cfg(test)]
mod test_support;
