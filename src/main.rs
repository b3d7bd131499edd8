use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, warn};

use jarscope::analysis::{AnalysisConfig, analyze_application};
use jarscope::graph::{ConflictStrategy, Dependency, Platform};
use jarscope::report::{AnalysisReport, render_json, render_text};
use jarscope::telemetry::{Telemetry, init_logging};

const BYTES_PER_MIB: u64 = 1024 * 1024;

/// CLI arguments for jarscope execution.
#[derive(Parser, Debug)]
#[command(
    name = "jarscope",
    about = "Dependency analysis and bundling decisions for JVM JAR files.",
    version
)]
struct Cli {
    #[arg(long, value_name = "PATH", required = true, num_args = 1..)]
    input: Vec<PathBuf>,
    #[arg(long, value_enum, default_value_t = ConflictStrategy::PreferLatest)]
    strategy: ConflictStrategy,
    #[arg(long, value_enum, default_value_t = Platform::Any)]
    platform: Platform,
    /// Java release the bundle targets, e.g. `17` or `1.8`.
    #[arg(long, value_name = "VERSION")]
    java_version: Option<String>,
    #[arg(long)]
    no_native: bool,
    #[arg(long)]
    bundle_optional: bool,
    /// Report test-scope dependencies in the decisions (never bundled).
    #[arg(long)]
    include_test: bool,
    /// Report provided-scope dependencies in the decisions (never bundled).
    #[arg(long)]
    include_provided: bool,
    #[arg(long, value_name = "N", default_value_t = 10)]
    max_depth: usize,
    #[arg(long, value_name = "MB")]
    max_size_mb: Option<u64>,
    /// `group:artifact[:version]` to leave out of the bundle.
    #[arg(long, value_name = "COORDINATES", value_parser = parse_coordinates)]
    exclude: Vec<String>,
    /// Restrict the bundle to these `group:artifact[:version]` entries.
    #[arg(long, value_name = "COORDINATES", value_parser = parse_coordinates)]
    include_only: Vec<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// OTLP/HTTP collector endpoint for trace export.
    #[arg(long, value_name = "URL")]
    otel: Option<String>,
    #[arg(long)]
    quiet: bool,
    #[arg(long)]
    timing: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Dot,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    for input in &cli.input {
        if !input.exists() {
            anyhow::bail!("input not found: {}", input.display());
        }
    }

    let telemetry = match cli.otel.as_deref() {
        Some(endpoint) => Some(Telemetry::new(endpoint)?),
        None => None,
    };
    let config = analysis_config(&cli);
    debug!(inputs = cli.input.len(), strategy = %config.strategy, "starting analysis");

    let started_at = Instant::now();
    let analysis = analyze_application(&cli.input, &config, telemetry.as_ref());
    let analysis_duration_ms = started_at.elapsed().as_millis();
    if let Some(telemetry) = &telemetry {
        if let Err(err) = telemetry.shutdown() {
            warn!("{err:#}");
        }
    }
    let result = analysis?;

    let rendered = match cli.format {
        OutputFormat::Text => render_text(&AnalysisReport::from_result(&result)),
        OutputFormat::Json => {
            let mut json = render_json(&AnalysisReport::from_result(&result))?;
            json.push('\n');
            json
        }
        OutputFormat::Dot => {
            let mut dot = result.graph.to_dot();
            dot.push('\n');
            dot
        }
    };
    let mut writer = output_writer(cli.output.as_deref())?;
    writer
        .write_all(rendered.as_bytes())
        .context("failed to write analysis output")?;
    writer.flush().context("failed to flush analysis output")?;

    if cli.timing && !cli.quiet {
        eprintln!(
            "timing: total_ms={} analysis_ms={} archives={} dependencies={} bundled={}",
            started_at.elapsed().as_millis(),
            analysis_duration_ms,
            result.jar_results.len(),
            result.graph.len(),
            result.resolution.resolved.len()
        );
    }

    Ok(())
}

fn analysis_config(cli: &Cli) -> AnalysisConfig {
    AnalysisConfig {
        strategy: cli.strategy,
        target_platform: cli.platform,
        java_version: cli.java_version.clone(),
        bundle_native_libraries: !cli.no_native,
        bundle_optional_deps: cli.bundle_optional,
        include_test_scope: cli.include_test,
        include_provided_scope: cli.include_provided,
        max_dependency_depth: cli.max_depth,
        max_bundle_size: cli.max_size_mb.map(|mb| mb.saturating_mul(BYTES_PER_MIB)),
        included_dependencies: cli.include_only.iter().cloned().collect::<BTreeSet<_>>(),
        excluded_dependencies: cli.exclude.iter().cloned().collect::<BTreeSet<_>>(),
    }
}

fn parse_coordinates(value: &str) -> std::result::Result<String, String> {
    Dependency::parse_coordinates(value)
        .map(|dependency| dependency.coordinates())
        .ok_or_else(|| format!("expected group:artifact[:version], got `{value}`"))
}

fn output_writer(output: Option<&Path>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdout())),
        Some(path) => Ok(Box::new(
            File::create(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Ok(Box::new(io::stdout())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_analysis_config() {
        let cli = Cli::try_parse_from([
            "jarscope",
            "--input",
            "a.jar",
            "b.jar",
            "--strategy",
            "prefer-compile-scope",
            "--platform",
            "linux",
            "--no-native",
            "--include-test",
            "--max-size-mb",
            "3",
            "--exclude",
            "org.example:blocked",
        ])
        .expect("parse cli");

        let config = analysis_config(&cli);

        assert_eq!(cli.input.len(), 2);
        assert_eq!(config.strategy, ConflictStrategy::PreferCompileScope);
        assert_eq!(config.target_platform, Platform::Linux);
        assert!(!config.bundle_native_libraries);
        assert!(config.include_test_scope);
        assert_eq!(config.max_bundle_size, Some(3 * BYTES_PER_MIB));
        assert!(config.excluded_dependencies.contains("org.example:blocked"));
    }

    #[test]
    fn malformed_coordinates_are_rejected() {
        let parsed = Cli::try_parse_from(["jarscope", "--input", "a.jar", "--exclude", "nocolon"]);

        assert!(parsed.is_err());
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["jarscope"]).is_err());
    }
}
