//! Netforge - a declarative network-topology provisioning engine
//!
//! This is the main entry point for the Netforge CLI.

use clap::CommandFactory;
use netforge::cli::commands::CommandContext;
use netforge::cli::{Cli, Commands};
use netforge::config::Config;
use netforge::error::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Application version information
const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).unwrap_or_else(|e| {
        if cli.verbosity() >= 1 {
            eprintln!("Warning: Failed to load config: {}", e);
        }
        Config::default()
    });

    // Initialize logging based on verbosity
    init_logging(cli.verbosity(), config.logging.level.as_deref());

    // Display version if verbose
    if cli.verbosity() >= 2 {
        eprintln!("Netforge v{} by {}", VERSION, AUTHORS);
    }

    // Create command context
    let mut ctx = CommandContext::new(&cli, config);

    // Execute the appropriate command
    let result = match &cli.command {
        Commands::Synth(args) => args.execute(&mut ctx).await,
        Commands::Validate(args) => args.execute(&mut ctx).await,
        Commands::Plan(args) => args.execute(&mut ctx).await,
        Commands::Deploy(args) => args.execute(&mut ctx).await,
        Commands::Destroy(args) => args.execute(&mut ctx).await,
        Commands::List(args) => args.execute(&mut ctx).await,
        Commands::Init(args) => init_project(&args.path, &mut ctx).await,
        Commands::Completions(args) => {
            clap_complete::generate(
                args.shell,
                &mut Cli::command(),
                "netforge",
                &mut std::io::stdout(),
            );
            Ok(0)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            ctx.output.error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbosity: u8, configured: Option<&str>) {
    let filter = match verbosity {
        0 => configured.unwrap_or("warn"),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(verbosity >= 3))
        .with(env_filter)
        .init();
}

/// Initialize a new Netforge project
async fn init_project(path: &std::path::Path, ctx: &mut CommandContext) -> Result<i32> {
    use std::fs;

    ctx.output.banner("NETFORGE INIT");
    ctx.output.info(&format!(
        "Initializing Netforge project in: {}",
        path.display()
    ));

    if !path.exists() {
        fs::create_dir_all(path)?;
    }

    let manifests_dir = path.join("manifests");
    if !manifests_dir.exists() {
        fs::create_dir_all(&manifests_dir)?;
        ctx.output.info("Created: manifests/");
    }

    let config_content = r#"# Netforge configuration

[defaults]
state_dir = ".netforge/state"

[colors]
enabled = true
"#;
    let config_path = path.join("netforge.toml");
    if !config_path.exists() {
        fs::write(&config_path, config_content)?;
        ctx.output.info("Created: netforge.toml");
    }

    let manifest_content = r#"# Netforge topology manifest
name: starter

networks:
  - id: core
    cidr: 10.0.0.0/16
    nat_gateways: 1
    subnets:
      - id: core-public
        tier: public
        prefix_len: 24
      - id: core-private
        tier: private
        prefix_len: 24

security_groups:
  - id: core-instances
    network: core
    ingress:
      - source_cidr: 10.0.0.0/16
        protocol: icmp

instances:
  - id: core-host
    subnet: core-private
    security_group: core-instances
"#;
    let manifest_path = manifests_dir.join("topology.yaml");
    if !manifest_path.exists() {
        fs::write(&manifest_path, manifest_content)?;
        ctx.output.info("Created: manifests/topology.yaml");
    }

    ctx.output
        .info("\nRun 'netforge plan manifests/topology.yaml' to see the initial plan.");
    Ok(0)
}
