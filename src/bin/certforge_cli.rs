//! CertForge CLI - template maintenance over a JSON store file
//!
//! Commands: types, templates, create-template, add-page, add-element,
//! duplicate, load, delete-template, migrate, preview, fingerprint
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation failure, 1 on any other error

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use certforge_core::{
    config::ConfigError,
    model::{PageSpec, TemplateContext},
    render::OutlineRenderer,
    CoreConfig, CoreError, FormInput, MemoryStore, StorageError, TemplateService,
};

#[derive(Parser)]
#[command(name = "certforge-cli")]
#[command(about = "CertForge CLI - Certificate template maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the JSON store file; created on first write
    #[arg(short, long, default_value = "certforge-store.json")]
    store: PathBuf,

    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// trace, debug, info, warn or error; RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered element types
    Types,

    /// List templates
    Templates,

    /// Create a template with one default page
    CreateTemplate {
        #[arg(short, long)]
        name: String,

        /// Owning course module; omitted means the system context
        #[arg(long)]
        module: Option<i64>,
    },

    /// Append a page to a template
    AddPage {
        #[arg(short, long)]
        template: i64,

        #[arg(long)]
        width: Option<i64>,

        #[arg(long)]
        height: Option<i64>,
    },

    /// Add an element to a page
    AddElement {
        #[arg(short, long)]
        page: i64,

        /// Element type key
        #[arg(short = 'k', long = "type")]
        type_key: String,

        /// JSON object of form fields
        #[arg(long)]
        payload: String,
    },

    /// Copy a template
    Duplicate {
        #[arg(short, long)]
        template: i64,

        #[arg(short, long)]
        name: Option<String>,
    },

    /// Replace a template's pages with a copy of another's
    Load {
        #[arg(long)]
        target: i64,

        #[arg(long)]
        source: i64,
    },

    /// Delete a template with its pages and elements
    DeleteTemplate {
        #[arg(short, long)]
        template: i64,
    },

    /// Rewrite legacy element rows into the JSON envelope
    Migrate,

    /// Markup preview of every page
    Preview {
        #[arg(short, long)]
        template: i64,
    },

    /// Layout fingerprint of a template
    Fingerprint {
        #[arg(short, long)]
        template: i64,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid payload: {0}")]
    Payload(String),
}

fn setup_logging(log_level: &Option<String>) {
    let level = match log_level.as_deref().unwrap_or("warn").to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn parse_payload(payload: &str) -> Result<FormInput, CliError> {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(form)) => Ok(form),
        Ok(_) => Err(CliError::Payload("expected a JSON object".into())),
        Err(e) => Err(CliError::Payload(e.to_string())),
    }
}

/// A missing config file means defaults; an unreadable one is an error.
fn load_config(path: Option<&Path>) -> Result<CoreConfig, CliError> {
    match path {
        Some(path) => {
            if !path.exists() {
                tracing::info!(path = %path.display(), "config file not found, using defaults");
            }
            Ok(CoreConfig::load_or_default(path)?)
        }
        None => Ok(CoreConfig::default()),
    }
}

fn open_service(
    store: &Path,
    config: Option<&Path>,
) -> Result<TemplateService<MemoryStore>, CliError> {
    let config = load_config(config)?;
    Ok(TemplateService::with_builtins(MemoryStore::open(store)?, config))
}

fn run(cli: &Cli) -> Result<Value, CliError> {
    let mut service = open_service(&cli.store, cli.config.as_deref())?;

    let output = match &cli.command {
        Commands::Types => {
            let types: Vec<_> = service
                .factory()
                .registry()
                .all()
                .iter()
                .map(|(key, implementation)| json!({"type": key, "implementation": implementation}))
                .collect();
            return Ok(json!(types));
        }

        Commands::Templates => return Ok(json!(service.templates()?)),

        Commands::Preview { template } => {
            return Ok(json!(service.preview_html(*template, &OutlineRenderer)?));
        }

        Commands::Fingerprint { template } => {
            let fingerprint = service.fingerprint(*template)?;
            return Ok(json!({"template_id": template, "fingerprint": fingerprint}));
        }

        Commands::CreateTemplate { name, module } => {
            let context = module.map_or_else(TemplateContext::system, TemplateContext::module);
            json!(service.create_template(name, context)?)
        }

        Commands::AddPage { template, width, height } => {
            let defaults = service.config().page_defaults;
            let spec = PageSpec {
                width: width.unwrap_or(defaults.width),
                height: height.unwrap_or(defaults.height),
                ..defaults
            };
            json!(service.add_page(*template, Some(spec))?)
        }

        Commands::AddElement { page, type_key, payload } => {
            let form = parse_payload(payload)?;
            json!(service.add_element(*page, type_key, &form)?)
        }

        Commands::Duplicate { template, name } => {
            json!(service.duplicate(*template, name.as_deref())?)
        }

        Commands::Load { target, source } => json!(service.load(*target, *source)?),

        Commands::DeleteTemplate { template } => {
            service.delete_template(*template)?;
            json!({"deleted": template})
        }

        Commands::Migrate => json!(service.migrate_legacy_rows()?),
    };

    service.store().save(&cli.store)?;
    let diagnostics = service.diagnostics().entries();
    Ok(json!({"success": true, "result": output, "diagnostics": diagnostics}))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match run(&cli) {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let output = json!({
                "success": false,
                "error": e.to_string(),
            });
            println!("{output}");
            match e {
                CliError::Core(CoreError::Validation(_)) | CliError::Payload(_) => {
                    ExitCode::from(2)
                }
                _ => ExitCode::FAILURE,
            }
        }
    }
}
