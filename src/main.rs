//! # Etiqueta CLI
//!
//! Command-line interface for the label service.
//!
//! ## Usage
//!
//! ```bash
//! # Run the HTTP API
//! etiqueta serve --listen 0.0.0.0:8013
//!
//! # Compose a template to PNG without printing
//! etiqueta render product.json -o label.png --field name=Flour --size 62x29mm
//!
//! # Show what the resolver makes of a printer
//! etiqueta media Zebra
//! ```
//!
//! Service settings come from `etiqueta.toml` (or `--settings FILE`) and
//! `ETIQUETA__*` environment variables.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use etiqueta::{
    EtiquetaError,
    binding::{BindingResolver, Payload, RequestData},
    compose::Composer,
    config::{ConfigHandle, LabelConfig, Orientation, Settings},
    elements::ElementRegistry,
    job::JobAssembler,
    media::MediaResolver,
    printer::JobSubmitter,
    server::{self, ServerConfig},
    service::{LabelRequest, LabelService},
    template::{Template, TemplateStore},
    transport::{CupsCli, MemorySubmitter},
};

/// Etiqueta - label printing service
#[derive(Parser, Debug)]
#[command(name = "etiqueta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Label configuration file, overriding the settings
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (defaults to the settings' host and port)
        #[arg(long)]
        listen: Option<String>,

        /// Record print jobs instead of sending them to CUPS
        #[arg(long)]
        dry_run: bool,
    },

    /// Compose a template to a PNG file
    Render {
        /// Template file, or the name of a template in the template directory
        template: String,

        /// Output PNG file
        #[arg(short, long, default_value = "label.png")]
        output: PathBuf,

        /// Printer to resolve media against
        #[arg(long)]
        printer: Option<String>,

        /// Media size key
        #[arg(long)]
        size: Option<String>,

        /// standard or rotated
        #[arg(long, value_parser = parse_orientation)]
        orientation: Option<Orientation>,

        /// Submitted field, repeatable
        #[arg(long = "field", value_name = "NAME=VALUE", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// JSON file used as the structured payload
        #[arg(long, value_name = "FILE")]
        payload: Option<PathBuf>,
    },

    /// Show the resolved media catalog of a printer
    Media {
        /// Printer name (defaults to the resolved default printer)
        printer: Option<String>,
    },
}

fn parse_orientation(s: &str) -> Result<Orientation, String> {
    Orientation::parse(s).ok_or_else(|| format!("'{}' is not 'standard' or 'rotated'", s))
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("'{}' is not NAME=VALUE", s))
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), EtiquetaError> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.settings.as_deref())?;
    init_tracing(&settings.log_filter);

    let config_path = cli.config.clone().unwrap_or_else(|| settings.label_config.clone());

    match cli.command {
        Commands::Serve { listen, dry_run } => {
            let submitter: Option<Arc<dyn JobSubmitter>> = if dry_run {
                tracing::warn!("dry run: print jobs are recorded, not sent");
                Some(Arc::new(MemorySubmitter::new(true)))
            } else {
                None
            };
            let service = build_service(&settings, &config_path, submitter)?;
            for warning in service.validate().await {
                tracing::warn!("{}", warning);
            }

            let mut server_config = ServerConfig::new(listen.unwrap_or_else(|| settings.listen_addr()));
            server_config.purge_interval = settings.cache_ttl().max(std::time::Duration::from_secs(1));
            server::serve(Arc::new(service), server_config).await
        }

        Commands::Render {
            template,
            output,
            printer,
            size,
            orientation,
            fields,
            payload,
        } => {
            let service = build_service(&settings, &config_path, None)?;
            let template = load_template(service.templates(), &template)?;

            let payload = match payload {
                Some(path) => Payload::from_json_bytes(&std::fs::read(path)?),
                None => Payload::Empty,
            };
            let request = LabelRequest {
                printer,
                size,
                orientation,
                data: RequestData::new(fields.into_iter().collect::<BTreeMap<_, _>>(), payload),
            };

            let rendered = service.compose_label(&template, &request).await?;
            std::fs::write(&output, rendered.label.to_png()?)?;

            let (width, height) = rendered.label.dimensions();
            println!(
                "Wrote {} ({}x{} px, {} on {})",
                output.display(),
                width,
                height,
                rendered.media.key,
                rendered.profile.name
            );
            for failure in rendered.label.failures() {
                println!(
                    "  element {} ({}): {}",
                    failure.index, failure.element_type, failure.error
                );
            }
            Ok(())
        }

        Commands::Media { printer } => {
            let service = build_service(&settings, &config_path, None)?;
            let profile = service.resolve_printer(printer.as_deref()).await?;
            let default = service.resolve_media_size(&profile, None).await?;

            println!("Printer: {} ({} dpi)", profile.name, profile.dpi);
            if !profile.metadata_available {
                println!("  (no printer metadata, configured sizes only)");
            }
            for size in profile.available_sizes() {
                let resolved = service.resolve_media_size(&profile, Some(&size.key)).await?;
                let (width, height) = resolved.dimensions().unwrap_or_default();
                let marker = if size.key == default.key { "*" } else { " " };
                println!(
                    "  {} {:<28} {:<24} {:>5}x{:<5} {:?}",
                    marker, size.key, size.label, width, height, resolved.source
                );
            }
            for warning in &profile.warnings {
                println!("  warning: {}", warning);
            }
            Ok(())
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_label_config(path: &Path) -> Result<LabelConfig, EtiquetaError> {
    if path.exists() {
        LabelConfig::load(path)
    } else {
        tracing::warn!(path = %path.display(), "label configuration not found, using defaults");
        Ok(LabelConfig::default())
    }
}

fn build_service(
    settings: &Settings,
    config_path: &Path,
    submitter: Option<Arc<dyn JobSubmitter>>,
) -> Result<LabelService, EtiquetaError> {
    let config = load_label_config(config_path)?;
    let cups = Arc::new(
        CupsCli::new(config.configured_server().map(str::to_string))
            .with_timeouts(settings.timeouts.metadata(), settings.timeouts.submit()),
    );

    let resolver = MediaResolver::new(ConfigHandle::new(config), cups.clone())
        .with_metadata_timeout(settings.timeouts.metadata())
        .with_cache_ttl(settings.cache_ttl());
    let composer = Composer::new(
        Arc::new(ElementRegistry::with_builtins()),
        BindingResolver::new(settings.timeouts.fetch())?,
    );
    let jobs = JobAssembler::new(submitter.unwrap_or_else(|| cups.clone() as Arc<dyn JobSubmitter>));

    Ok(LabelService::new(resolver, composer, jobs, TemplateStore::new(&settings.template_dir))
        .with_config_path(config_path))
}

/// A path to an existing file, or a template name.
fn load_template(store: &TemplateStore, name: &str) -> Result<Template, EtiquetaError> {
    let path = Path::new(name);
    if path.is_file() {
        let mut template = Template::from_json_str(&std::fs::read_to_string(path)?)?;
        if template.name.is_none() {
            template.name = path.file_stem().and_then(|s| s.to_str()).map(str::to_string);
        }
        return Ok(template);
    }
    store.load(name)
}
