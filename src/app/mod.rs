use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::{ErrorPolicy, FilterConfig};
use crate::dsl::{Constraints, TypePolicy};
use crate::mapping::Mapping;
use crate::sinks::{DataSink, JsonSink, JsonlSink, TextSink};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file, one `Name=Value, ...` record per line
    #[arg(short, long, default_value = "books.txt")]
    pub input: PathBuf,

    /// Filter expression (overrides the config file)
    #[arg(short, long, env = "RECFILTER_FILTER")]
    pub filter: Option<String>,

    /// Settings file (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output file, or `-` for stdout
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,

    /// Output format (auto-detected if omitted)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of threads (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Print the parsed filter tree to stderr
    #[arg(long)]
    pub dump: bool,

    /// Treat integer/text comparisons as errors
    #[arg(long)]
    pub strict_types: bool,

    /// What to do with records the filter cannot be evaluated against (skip, abort)
    #[arg(long)]
    pub on_error: Option<ErrorPolicy>,

    /// Maximum parenthesis nesting accepted by the parser
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum OutputFormat {
    Text,
    Json,
    Jsonl,
}

impl OutputFormat {
    /// Format implied by the output path; stdout and unknown extensions use text.
    pub fn detect(output: &Path) -> Self {
        let ext = output
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());
        match ext.as_deref() {
            Some("jsonl") | Some("ndjson") => OutputFormat::Jsonl,
            Some("json") => OutputFormat::Json,
            _ => OutputFormat::Text,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        }
    }
}

/// Settings file (if any) with command-line overrides applied.
pub fn load_settings(cli: &Cli) -> Result<FilterConfig> {
    let mut settings = match &cli.config {
        Some(path) => FilterConfig::load(path)
            .with_context(|| format!("Config: Failed to load settings from {:?}", path))?,
        None => FilterConfig::default(),
    };

    if let Some(filter) = &cli.filter {
        settings.filter = Some(filter.clone());
    }
    if let Some(max_depth) = cli.max_depth {
        settings.max_depth = max_depth;
    }
    if let Some(on_error) = cli.on_error {
        settings.on_error = on_error;
    }
    if cli.strict_types {
        settings.type_policy = TypePolicy::Strict;
    }

    Ok(settings)
}

/// Parse the configured filter.
pub fn build_constraints(settings: &FilterConfig) -> Result<Constraints> {
    let Some(filter) = settings.filter.as_deref() else {
        bail!("CLI: No filter given; use --filter or set `filter` in the config file");
    };

    let mut constraints = Constraints::with_options(settings.parse_options(), settings.type_policy);
    constraints
        .parse(filter)
        .with_context(|| format!("Filter: Failed to parse '{}'", filter))?;
    Ok(constraints)
}

pub fn compile_mappings(settings: &FilterConfig) -> Result<Vec<Mapping>> {
    let options = settings.parse_options();
    settings
        .mappings
        .iter()
        .map(|(name, mapping)| {
            Mapping::from_config(name, mapping, &options).context("Config: Invalid mapping")
        })
        .collect()
}

pub fn init_sink(format: &OutputFormat, output: &Path) -> Result<Box<dyn DataSink>> {
    let target = if output == Path::new("-") {
        "stdout".to_string()
    } else {
        format!("{:?}", output)
    };
    tracing::info!("Sink: {} -> {}", format.label(), target);

    let sink: Box<dyn DataSink> = match format {
        OutputFormat::Text => Box::new(TextSink::new(output)?),
        OutputFormat::Json => Box::new(JsonSink::new(output)?),
        OutputFormat::Jsonl => Box::new(JsonlSink::new(output)?),
    };
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["recfilter"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = cli(&["--filter", "A == 1"]);
        assert_eq!(cli.input, PathBuf::from("books.txt"));
        assert_eq!(cli.output, PathBuf::from("-"));
        assert!(!cli.dump);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(OutputFormat::detect(Path::new("-")), OutputFormat::Text);
        assert_eq!(OutputFormat::detect(Path::new("out.JSONL")), OutputFormat::Jsonl);
        assert_eq!(OutputFormat::detect(Path::new("out.json")), OutputFormat::Json);
        assert_eq!(OutputFormat::detect(Path::new("out.txt")), OutputFormat::Text);
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut file = tempfile::NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "filter: \"Language == French\"\non_error: abort").unwrap();
        let path = file.path().to_str().unwrap();

        let settings = load_settings(&cli(&["--config", path])).unwrap();
        assert_eq!(settings.filter.as_deref(), Some("Language == French"));
        assert_eq!(settings.on_error, ErrorPolicy::Abort);

        let settings = load_settings(&cli(&[
            "--config",
            path,
            "--filter",
            "Language == Spanish",
            "--on-error",
            "skip",
            "--strict-types",
        ]))
        .unwrap();
        assert_eq!(settings.filter.as_deref(), Some("Language == Spanish"));
        assert_eq!(settings.on_error, ErrorPolicy::Skip);
        assert_eq!(settings.type_policy, TypePolicy::Strict);
    }

    #[test]
    fn test_missing_filter_is_error() {
        let err = build_constraints(&FilterConfig::default()).unwrap_err();
        assert!(err.to_string().starts_with("CLI: No filter given"));
    }

    #[test]
    fn test_parse_failure_keeps_cause() {
        let settings = FilterConfig {
            filter: Some("Genre == (".into()),
            ..FilterConfig::default()
        };
        let err = build_constraints(&settings).unwrap_err();
        assert_eq!(err.to_string(), "Filter: Failed to parse 'Genre == ('");
        assert!(format!("{:#}", err).contains("empty value"));
    }

    #[test]
    fn test_max_depth_override() {
        let settings = FilterConfig {
            filter: Some("((A == 1))".into()),
            max_depth: 1,
            ..FilterConfig::default()
        };
        assert!(build_constraints(&settings).is_err());
    }
}
