use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::Parser;
use querymodel::{
    config::{BuilderConfig, CliConfig},
    parsing::{self, NodeChain, ParseResultCollector},
};

/// querymodel - fold query operation chains into normalized query models
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON input file (`-` reads standard input)
    input: PathBuf,

    /// Input is a parse result collector instead of a node chain
    #[arg(long)]
    legacy: bool,

    /// Print the model as JSON instead of comprehension text
    #[arg(long)]
    json: bool,

    /// YAML configuration file (defaults come from QUERYMODEL_* environment variables)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum sub-query nesting depth
    #[arg(long)]
    max_subquery_depth: Option<u32>,

    /// Skip structural validation of the built model
    #[arg(long)]
    no_validate: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<BuilderConfig> {
    let mut config = match &cli.config {
        Some(path) => BuilderConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => BuilderConfig::from_env().context("loading configuration from environment")?,
    };

    let overrides = BuilderConfig::from_cli(CliConfig {
        max_subquery_depth: cli.max_subquery_depth.unwrap_or(config.max_subquery_depth),
        skip_validation: cli.no_validate || !config.validate_models,
    })?;
    config.merge(overrides);
    Ok(config)
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        Ok(content)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    log::debug!("Using {:?}", config);

    let input = read_input(&cli.input)?;
    let model = if cli.legacy {
        let collector: ParseResultCollector =
            serde_json::from_str(&input).context("parsing parse result collector")?;
        let root = collector
            .expression_tree_root
            .clone()
            .ok_or_else(|| anyhow!("parse result collector has no expression_tree_root"))?;
        parsing::create_query_model(&root, collector, &config)?
    } else {
        let chain: NodeChain = serde_json::from_str(&input).context("parsing node chain")?;
        parsing::build_query_model(&chain, &config)?
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        println!("{}", model);
    }
    Ok(())
}
