// stripped-down generator driver.
// Reads codegen.toml, loads each service definition it names, and writes one
// module per operation under output_dir/<model name>/.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use shapegen::{config::CodegenConfig, DefaultNamingRegistry, Generator, ShapeModel};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[clap(name = "codegen", about = "Generate wire marshalling code from service definitions")]
struct Args {
    /// Path to codegen.toml
    #[clap(default_value = "./codegen.toml")]
    config: PathBuf,

    /// Overrides output_dir from the config file
    #[clap(short, long, env = "SHAPEGEN_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().without_time())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config_path = std::fs::canonicalize(&args.config)
        .with_context(|| format!("config file {} not found", args.config.display()))?;
    let mut config = load_config(&config_path)
        .with_context(|| format!("error loading config at {}", config_path.display()))?;
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }
    gen(config)
}

fn load_config(path: &Path) -> Result<CodegenConfig> {
    let cfile = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", &path.display()))?;
    let folder = path.parent().context("config file has no parent directory")?.to_path_buf();

    let mut config = cfile.parse::<CodegenConfig>()?;
    config.base_dir = folder;
    Ok(config)
}

fn gen(config: CodegenConfig) -> Result<()> {
    let output_dir = config.base_dir.join(&config.output_dir);
    for source in config.models.iter() {
        let paths = source
            .paths(&config.base_dir)
            .with_context(|| format!("listing model files in {source}"))?;
        for path in paths {
            gen_model(&config, &path, &output_dir)?;
        }
    }
    Ok(())
}

fn gen_model(config: &CodegenConfig, path: &Path, output_dir: &Path) -> Result<()> {
    let model = ShapeModel::from_path(path)
        .with_context(|| format!("loading service definition {}", path.display()))?;
    let registry = DefaultNamingRegistry::new(&model, &config.namespace);
    let generator = Generator::new(&model, &registry).with_protocol(config.protocol);

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("model");
    let dir = output_dir.join(stem.replace(['-', '.'], "_"));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut written = 0;
    for op in model.operations() {
        if !config.operations.is_empty() && !config.operations.contains(&op.name) {
            continue;
        }
        let source = match generator.operation_source(op) {
            Ok(source) => source,
            Err(e) => {
                warn!(operation = %op.name, error = %e, "skipping operation");
                continue;
            }
        };
        let file = dir.join(format!("{}.rs", inflector::cases::snakecase::to_snake_case(&op.name)));
        std::fs::write(&file, source).with_context(|| format!("writing {}", file.display()))?;
        written += 1;
    }
    info!(model = %path.display(), operations = written, dir = %dir.display(), "generated");
    Ok(())
}
