mod formatter;
mod settings;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use formatter::OutputFormat;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use xmlconf_config::{
    ConfigConverter, ConfigDefinition, ConverterCache, DirectorySchemaResolver, XmlConverter,
};

#[derive(Parser)]
#[command(name = "xmlconf")]
#[command(about = "Convert schema-described XML configuration files to JSON and back", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file listing configuration kinds
    #[arg(long, global = true, env = "XMLCONF_CONFIG")]
    config: Option<PathBuf>,

    /// Directory schema files are resolved against
    #[arg(long, global = true, env = "XMLCONF_SCHEMA_DIR")]
    schema_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an XML document to JSON
    ToJson {
        #[command(flatten)]
        kind: KindArgs,

        /// Input file (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Convert a JSON document to XML
    ToXml {
        #[command(flatten)]
        kind: KindArgs,

        /// Input file (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Show the types a kind's schema declares
    Inspect {
        #[command(flatten)]
        kind: KindArgs,

        /// Output format: text (default) or json
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Selects the configuration kind, either by name or ad hoc
#[derive(Args)]
struct KindArgs {
    /// Kind name from the settings file
    #[arg(long, conflicts_with_all = ["schema", "root"])]
    kind: Option<String>,

    /// Schema file for an ad-hoc kind
    #[arg(long, requires = "root")]
    schema: Option<PathBuf>,

    /// Root element for an ad-hoc kind
    #[arg(long, requires = "schema")]
    root: Option<String>,

    /// Rename `__VALUE__` inside ELEMENT to KEY (repeatable)
    #[arg(long = "value-name", value_name = "ELEMENT=KEY", value_parser = settings::parse_value_name)]
    value_names: Vec<(String, String)>,
}

/// A kind definition together with the directory its schema lives in
struct ResolvedKind {
    definition: ConfigDefinition,
    schema_dir: PathBuf,
}

impl KindArgs {
    fn resolve(&self, cli: &GlobalArgs) -> Result<ResolvedKind> {
        let mut resolved = match (&self.kind, &self.schema, &self.root) {
            (Some(name), _, _) => {
                let settings = settings::load_settings(cli.config.as_deref())?;
                let definition = settings.kind(name)?.clone();
                let schema_dir = cli
                    .schema_dir
                    .clone()
                    .or(settings.schema_dir)
                    .unwrap_or_else(|| PathBuf::from("."));
                ResolvedKind {
                    definition,
                    schema_dir,
                }
            }
            (None, Some(schema), Some(root)) => ad_hoc_kind(schema, root)?,
            _ => bail!("either --kind or both --schema and --root are required"),
        };

        for (element, key) in &self.value_names {
            resolved.definition = resolved.definition.with_value_name(element, key);
        }
        Ok(resolved)
    }
}

fn ad_hoc_kind(schema: &Path, root: &str) -> Result<ResolvedKind> {
    let file_name = schema
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid schema path: {:?}", schema))?;
    let name = schema
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    let schema_dir = schema
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    Ok(ResolvedKind {
        definition: ConfigDefinition::new(name, file_name, root),
        schema_dir,
    })
}

/// Flags shared by every command
struct GlobalArgs {
    config: Option<PathBuf>,
    schema_dir: Option<PathBuf>,
}

fn build_converter(kind: &KindArgs, global: &GlobalArgs) -> Result<Arc<XmlConverter>> {
    let ResolvedKind {
        definition,
        schema_dir,
    } = kind.resolve(global)?;
    let resolver = DirectorySchemaResolver::new(&schema_dir);

    ConverterCache::global()
        .get_or_init(&definition, &resolver)
        .with_context(|| format!("Failed to load kind '{}' from {:?}", definition.name, schema_dir))
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {:?}", path)),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read standard input")?;
            Ok(input)
        }
    }
}

fn write_output(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}").context("Failed to write output")
}

fn run_to_json(kind: KindArgs, file: Option<PathBuf>, pretty: bool, global: GlobalArgs) -> Result<()> {
    let converter = build_converter(&kind, &global)?;
    let xml = read_input(file.as_deref())?;

    debug!("converting {} bytes of XML", xml.len());
    let json = converter
        .xml_to_json(&xml)
        .context("Failed to convert XML to JSON")?;

    write_output(&formatter::format_json(&json, pretty)?)
}

fn run_to_xml(kind: KindArgs, file: Option<PathBuf>, global: GlobalArgs) -> Result<()> {
    let converter = build_converter(&kind, &global)?;
    let json = read_input(file.as_deref())?;

    debug!("converting {} bytes of JSON", json.len());
    let xml = converter
        .json_to_xml(&json)
        .context("Failed to convert JSON to XML")?;

    write_output(&xml)
}

fn run_inspect(kind: KindArgs, format: OutputFormat, global: GlobalArgs) -> Result<()> {
    let converter = build_converter(&kind, &global)?;
    let model = converter.model();
    info!(
        "kind '{}' declares {} types",
        converter.root_element(),
        model.registry().len()
    );

    match format {
        OutputFormat::Text => write_output(&formatter::format_model(model)),
        OutputFormat::Json => write_output(&serde_json::to_string_pretty(
            &formatter::model_to_json(model),
        )?),
    }
}

fn main() -> Result<()> {
    // Logs go to stderr, keeping stdout clean for converted documents
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let global = GlobalArgs {
        config: cli.config,
        schema_dir: cli.schema_dir,
    };

    match cli.command {
        Commands::ToJson { kind, file, pretty } => run_to_json(kind, file, pretty, global),
        Commands::ToXml { kind, file } => run_to_xml(kind, file, global),
        Commands::Inspect { kind, format } => run_inspect(kind, format, global),
    }
}
