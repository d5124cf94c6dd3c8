//! # tssc-config demo application
//!
//! A small CLI that loads an installer configuration, applies `--set`
//! overrides and prints the result. It exists to demonstrate and manually
//! verify the crate's features.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example tssc_config -- --root demos/tssc_config show
//! cargo run --example tssc_config -- --root demos/tssc_config products
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature               | How to exercise it                                                            |
//! |-----------------------|-------------------------------------------------------------------------------|
//! | Default document      | `... --root demos/tssc_config show`                                           |
//! | Explicit file         | `... --config demos/tssc_config/installer/config.yaml show`                   |
//! | Setting override      | `... --root demos/tssc_config --set crc=true show`                            |
//! | Product override      | `... --root demos/tssc_config --set 'Product[Developer Hub].enabled=false' products` |
//! | Single key            | `... --root demos/tssc_config get tssc.settings.ci.debug`                     |
//! | Strict update         | `... --root demos/tssc_config set tssc.settings.newkey x` (fails)             |
//! | Debug logging         | `RUST_LOG=tssc_config=debug ... show`                                         |

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tssc_config::{Config, ConfigArgs, ConfigError, DirSource, Node, Product, coerce_bool};

/// tssc-config demo: inspect and update an installer configuration.
#[derive(Parser, Debug)]
#[command(name = "tssc-config-demo")]
struct Cli {
    /// Directory holding `installer/config.yaml`. Defaults to the current directory.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the whole document.
    Show,
    /// Print the value at a dotted key.
    Get { key: String },
    /// List products, enabled ones only unless `--all` is given.
    Products {
        #[arg(long)]
        all: bool,
    },
    /// Update an existing key and print the resulting document.
    Set { key: String, value: String },
}

fn load(cli: &Cli) -> Result<Config, ConfigError> {
    let source = match &cli.root {
        Some(root) => DirSource::new(root),
        None => DirSource::cwd()?,
    };
    cli.config.load(&source)
}

fn run(cli: Cli) -> Result<(), ConfigError> {
    let mut config = load(&cli)?;
    match cli.command {
        Commands::Show => print!("{}", config.to_yaml()?),
        Commands::Get { key } => match config.get(&key)? {
            Some(Node::Scalar(scalar)) => println!("{}", scalar.value()),
            Some(node) => print!("{node}"),
            None => {
                eprintln!("No value at {key}");
                std::process::exit(1);
            }
        },
        Commands::Products { all } => {
            let products: Vec<&Product> = if all {
                config.spec().products.iter().collect()
            } else {
                config.enabled_products()
            };
            for product in products {
                let namespace = product.namespace().unwrap_or("-");
                println!("{:<30} {:<8} {namespace}", product.name, product.enabled);
            }
        }
        Commands::Set { key, value } => {
            config.set(&key, coerce_bool(&value))?;
            config.validate()?;
            print!("{}", config.to_yaml()?);
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Config error:\n{e}");
        std::process::exit(1);
    }
}
