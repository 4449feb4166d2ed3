//! SchemaLens CLI - extract circuit schemas from photos of hand-drawn sketches.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand, ValueEnum};
use schemalens::ingress::content_type_for_extension;
use schemalens::{
    decode_base64, CircuitExtractor, CircuitSchema, Component, ComponentType, ImageValidator,
    Settings,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemalens")]
#[command(about = "Extract component graphs from photos of hand-drawn circuit sketches", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the drawing, identify components and infer their connections
    Schema {
        #[command(flatten)]
        input: ImageInput,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Identify which components are present (no rectification)
    Components {
        #[command(flatten)]
        input: ImageInput,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List supported component types
    Types {
        /// Show the full identification instructions
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(clap::Args)]
struct ImageInput {
    /// Path to the photo (or to a base64 text file with --base64)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// MIME type of the image; guessed from the file extension when omitted
    #[arg(long)]
    content_type: Option<String>,

    /// The file holds base64 text (a data: URL prefix is accepted)
    #[arg(long)]
    base64: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Schema { input, format } => handle_schema(&input, format).await,
        Commands::Components { input, format } => handle_components(&input, format).await,
        Commands::Types { verbose } => handle_types(verbose),
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    process::exit(exit_code);
}

/// Settings plus validated image bytes, ready for the pipeline.
fn prepare(input: &ImageInput) -> anyhow::Result<(Settings, Vec<u8>)> {
    let settings = Settings::from_env().context("Failed to load settings")?;
    settings.validate()?;

    let content_type = match &input.content_type {
        Some(ct) => ct.clone(),
        None => guess_content_type(&input.file)?,
    };

    let bytes = if input.base64 {
        let text = std::fs::read_to_string(&input.file)
            .with_context(|| format!("Failed to read {}", input.file.display()))?;
        decode_base64(&text)?
    } else {
        std::fs::read(&input.file)
            .with_context(|| format!("Failed to read {}", input.file.display()))?
    };

    ImageValidator::from_settings(&settings).validate(&content_type, &bytes)?;
    tracing::debug!("Accepted {} ({}, {} bytes)", input.file.display(), content_type, bytes.len());
    Ok((settings, bytes))
}

fn guess_content_type(path: &Path) -> anyhow::Result<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(content_type_for_extension)
        .map(str::to_string)
        .ok_or_else(|| {
            anyhow!(
                "Cannot tell the image type of {}; pass --content-type",
                path.display()
            )
        })
}

async fn handle_schema(input: &ImageInput, format: OutputFormat) -> anyhow::Result<()> {
    let (settings, bytes) = prepare(input)?;
    let extractor = CircuitExtractor::from_settings(&settings)?;
    let schema = extractor.extract_schema(&bytes).await?;

    match format {
        OutputFormat::Human => output_schema_human(&schema),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&schema)?),
    }
    Ok(())
}

async fn handle_components(input: &ImageInput, format: OutputFormat) -> anyhow::Result<()> {
    let (settings, bytes) = prepare(input)?;
    let extractor = CircuitExtractor::from_settings(&settings)?;
    let components = extractor.extract_components(&bytes).await?;

    match format {
        OutputFormat::Human => output_components_human(&components),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "components": components }))?
        ),
    }
    Ok(())
}

fn output_components_human(components: &[Component]) {
    println!("\nComponents ({}):", components.len());
    println!("{}", "─".repeat(40));
    if components.is_empty() {
        println!("  None found");
    }
    for component in components {
        println!("  {:<4} {}", component.id, component.component_type);
    }
}

fn output_schema_human(schema: &CircuitSchema) {
    output_components_human(&schema.components);

    println!("\nConnections:");
    println!("{}", "─".repeat(40));
    for entry in &schema.connections {
        if entry.connections.is_empty() {
            println!("  {:<4} (unconnected)", entry.component);
        } else {
            println!("  {:<4} -> {}", entry.component, entry.connections.join(", "));
        }
    }
}

fn handle_types(verbose: bool) -> anyhow::Result<()> {
    let prompts = Settings::from_env()
        .context("Failed to load settings")?
        .component_prompts()?;

    println!("Supported component types:\n");
    for component_type in ComponentType::ALL {
        let prompt = prompts.get(component_type);
        println!("  {} (id {})", component_type, component_type.component_id());
        println!("    Drawn as: {}", prompt.visual_representation);
        if verbose {
            println!("    {}", prompt.identification);
        }
        println!();
    }
    Ok(())
}
