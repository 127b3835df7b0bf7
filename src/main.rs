use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use fenceguard_lib::config::{self as fenceguard_config, Config, LoadedConfig};
use fenceguard_lib::exit_codes::exit;
use fenceguard_lib::run::{RenderedRun, RunSettings, prepare};
use fenceguard_lib::store::{Document, DocumentStore, MemoryStore};
use fenceguard_lib::style::AssetResolver;
use fenceguard_lib::{RenderHooks, SyntectHighlighter};

mod site_renderer;

#[derive(Parser)]
#[command(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Control colored output: auto, always, never
    #[arg(long, global = true, default_value = "auto", value_parser = ["auto", "always", "never"], help = "Control colored output: auto, always, never")]
    color: String,

    /// Path to configuration file
    #[arg(long, global = true, help = "Path to configuration file")]
    config: Option<PathBuf>,

    /// Ignore all configuration files and use built-in defaults
    #[arg(
        long,
        global = true,
        help = "Ignore all configuration files and use built-in defaults"
    )]
    no_config: bool,

    /// Show debug output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a site dump (JSON documents with comments) to an HTML page
    Render {
        /// Site dump to render
        input: PathBuf,
        /// Write the page here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Directory holding style target stylesheets (overrides assets.dir)
        #[arg(long)]
        assets_dir: Option<String>,
        /// URL the stylesheets are served under (overrides assets.url)
        #[arg(long)]
        assets_url: Option<String>,
    },
    /// Process a single HTML fragment (a file, or stdin when omitted)
    Highlight {
        file: Option<PathBuf>,
        /// Print the head markup (stylesheet links and CSS) before the fragment
        #[arg(long)]
        with_head: bool,
    },
    /// Initialize a new configuration file
    Init,
    /// Show the effective configuration
    Config {
        /// Show the built-in defaults instead
        #[arg(long)]
        defaults: bool,
    },
    /// Print the JSON schema of the configuration file
    Schema,
    /// List the available highlighting themes
    Themes,
}

fn main() {
    let cli = Cli::parse();

    match cli.color.as_str() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => colored::control::unset_override(),
    }

    env_logger::Builder::from_default_env()
        .filter_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let result = match cli.command {
        Commands::Render {
            ref input,
            ref output,
            ref assets_dir,
            ref assets_url,
        } => {
            let mut config = load_config_with_cli_error_handling(&cli).config;
            if let Some(dir) = assets_dir {
                config.assets.dir = dir.clone();
            }
            if let Some(url) = assets_url {
                config.assets.url = url.clone();
            }
            handle_render(&config, input, output.as_deref())
        }
        Commands::Highlight { ref file, with_head } => {
            let config = load_config_with_cli_error_handling(&cli).config;
            handle_highlight(&config, file.as_deref(), with_head)
        }
        Commands::Init => handle_init(),
        Commands::Config { defaults } => {
            let loaded = if defaults {
                LoadedConfig::default()
            } else {
                load_config_with_cli_error_handling(&cli)
            };
            handle_config(&loaded)
        }
        Commands::Schema => fenceguard_config::json_schema()
            .map(|schema| println!("{schema}"))
            .map_err(anyhow::Error::from),
        Commands::Themes => {
            for name in SyntectHighlighter::theme_names() {
                println!("{name}");
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {e:#}", "Error".red().bold());
        exit::tool_error();
    }
}

fn load_config_with_cli_error_handling(cli: &Cli) -> LoadedConfig {
    if let Some(path) = &cli.config
        && !path.exists()
    {
        eprintln!("{}: Config file not found: {}", "Error".red().bold(), path.display());
        exit::tool_error();
    }

    Config::load(cli.config.as_deref(), cli.no_config).unwrap_or_else(|e| {
        eprintln!("{}: {e}", "Config error".red().bold());
        exit::tool_error();
    })
}

fn handle_render(config: &Config, input: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    let highlighter = SyntectHighlighter::new(&config.highlight.theme)?;
    let store = MemoryStore::load(input)?;
    let mut documents = store.documents()?;

    let rendered = prepare(&mut documents, &store, &highlighter, RunSettings::from(config))?;
    let mut hooks = RenderHooks::new();
    if let Some(rendered) = rendered {
        RenderedRun::install(&Rc::new(rendered), &mut hooks, AssetResolver::from_config(&config.assets));
    }

    let page = site_renderer::render_site(store.title(), &store, &hooks)?;
    write_output(output, &page)
}

fn handle_highlight(config: &Config, file: Option<&Path>, with_head: bool) -> anyhow::Result<()> {
    let content = match file {
        Some(path) => fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };

    let highlighter = SyntectHighlighter::new(&config.highlight.theme)?;
    let mut store = MemoryStore::new();
    store.add_document(Document::new(0, content));
    let mut documents = store.documents()?;

    let rendered = prepare(&mut documents, &store, &highlighter, RunSettings::from(config))?;
    let mut hooks = RenderHooks::new();
    if let Some(rendered) = rendered {
        RenderedRun::install(&Rc::new(rendered), &mut hooks, AssetResolver::from_config(&config.assets));
    }

    let fragment = documents
        .first()
        .map(|document| site_renderer::render_fragment(&document.content, &hooks, with_head))
        .unwrap_or_default();
    print!("{fragment}");
    Ok(())
}

fn handle_init() -> anyhow::Result<()> {
    let path = fenceguard_config::CONFIG_FILES[0];
    fenceguard_config::create_default_config(path)?;
    println!("Created default configuration file: {path}");
    Ok(())
}

fn handle_config(loaded: &LoadedConfig) -> anyhow::Result<()> {
    match &loaded.source {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# Built-in defaults"),
    }
    print!("{}", loaded.config.to_toml()?);
    Ok(())
}

fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}
