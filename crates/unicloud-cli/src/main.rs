use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use unicloud_client::mock::SCENARIOS;
use unicloud_client::{
    backend_for, estimate_monthly_cost, mock_scenarios, ConnectivityMonitor, DesignBackend,
    DesignOutcome, DesignSession, HttpBackend,
};
use unicloud_core::terraform::render_terraform;
use unicloud_core::wire::wire_schemas;
use unicloud_core::{
    chat_response_to_graph, graph_to_chat_format, AppConfig, ChatResponse, Graph, PriorityKey,
    ProductType, TechStackField,
};

#[derive(Parser)]
#[command(name = "unicloud")]
#[command(version, about = "Design cloud infrastructure from a short intake and a chat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Design service base URL (overrides settings and environment)
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    /// Answer from canned scenarios instead of the design service
    #[arg(long, global = true)]
    mock: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the intake, request an initial design, then apply chat messages
    Design {
        #[arg(long, default_value = "webapp")]
        product: ProductType,
        #[arg(long)]
        frontend: Option<String>,
        #[arg(long)]
        backend: Option<String>,
        #[arg(long)]
        database: Option<String>,
        #[arg(long)]
        auth: Option<String>,
        #[arg(long)]
        other: Option<String>,
        /// Priority weight as key=value, e.g. cost=8
        #[arg(long = "priority", value_parser = parse_priority)]
        priorities: Vec<(PriorityKey, u8)>,
        /// Follow-up chat message, applied in order
        #[arg(long = "message")]
        messages: Vec<String>,
        /// Write the graph here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Export a graph as Terraform
    Export {
        /// Graph JSON file, or - for stdin
        graph: PathBuf,
        #[arg(long, default_value = "infrastructure.zip")]
        out: PathBuf,
    },
    /// Print the chat-format encoding of a graph
    Encode {
        /// Graph JSON file, or - for stdin
        graph: PathBuf,
    },
    /// Decode a chat response into a graph
    Decode {
        /// Chat response JSON file, or - for stdin
        response: PathBuf,
    },
    /// Check whether the design service is reachable
    Health,
    /// List the canned mock scenarios
    Scenarios {
        #[arg(long)]
        json: bool,
    },
    /// Print JSON schemas for the wire messages
    Schema,
}

fn parse_priority(s: &str) -> Result<(PriorityKey, u8), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {s}"))?;
    let key: PriorityKey = key.trim().parse()?;
    let value: u8 = value
        .trim()
        .parse()
        .map_err(|_| format!("priority must be a number: {value}"))?;
    Ok((key, value))
}

fn resolve_config(cli: &Cli) -> AppConfig {
    let mut config = AppConfig::load();
    if let Some(url) = &cli.api_base_url {
        config.api_base_url = url.clone();
    }
    if cli.mock {
        config.enable_mock_mode = true;
    }
    config
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_input(path)?;
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))
}

async fn design(
    config: &AppConfig,
    product: ProductType,
    stack: [(TechStackField, Option<String>); 5],
    priorities: Vec<(PriorityKey, u8)>,
    messages: Vec<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut session = DesignSession::new(backend_for(config));
    session.intake.set_product_type(product);
    for (field, value) in stack {
        if let Some(value) = value {
            session.intake.set_tech_stack_field(field, value);
        }
    }
    for (key, value) in priorities {
        session.intake.set_priority(key, value);
    }

    match session.design_initial().await? {
        DesignOutcome::Generated => info!("initial design generated"),
        DesignOutcome::Fallback { reason } => {
            eprintln!("Design service unavailable ({reason}); using the sample architecture.")
        }
    }

    for message in &messages {
        if let Err(e) = session.send_message(message).await {
            eprintln!("Message {message:?} failed: {e}");
        }
    }

    let json = serde_json::to_string_pretty(session.graph.graph())?;
    match out {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
            println!("Graph written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn export(config: &AppConfig, graph_path: &Path, out: &Path) -> Result<()> {
    let graph: Graph = read_json(graph_path)?;
    let request = graph_to_chat_format(&graph)?;
    let backend = backend_for(config);

    match backend.generate_terraform(&request).await {
        Ok(archive) => {
            fs::write(out, &archive.bytes)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Terraform archive written to {} ({} bytes)", out.display(), archive.bytes.len());
        }
        Err(e) => {
            warn!(error = %e, "export failed, rendering locally");
            let main_tf = out.with_file_name("main.tf");
            fs::write(&main_tf, render_terraform(&graph))
                .with_context(|| format!("failed to write {}", main_tf.display()))?;
            eprintln!("Export API failed ({e}); wrote local Terraform to {}", main_tf.display());
        }
    }
    Ok(())
}

async fn health(config: &AppConfig) -> Result<()> {
    let probe = HttpBackend::new(&config.api_base_url);
    let mut monitor = ConnectivityMonitor::with_system_clock(probe, config.enable_mock_mode);
    let status = monitor.check(true).await;
    println!("{}", serde_json::to_string_pretty(&status)?);
    if !status.is_reachable {
        anyhow::bail!("{} is not reachable", config.api_base_url);
    }
    Ok(())
}

fn scenarios(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&mock_scenarios())?);
        return Ok(());
    }
    for s in &SCENARIOS {
        println!(
            "{:<14} {:>2} components  ~${}/mo  {}",
            s.key,
            s.components.len(),
            estimate_monthly_cost(s.components),
            s.title
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = resolve_config(&cli);
    info!(base_url = %config.api_base_url, mock = config.enable_mock_mode, "configuration resolved");

    match cli.command {
        Command::Design {
            product,
            frontend,
            backend,
            database,
            auth,
            other,
            priorities,
            messages,
            out,
        } => {
            let stack = [
                (TechStackField::Frontend, frontend),
                (TechStackField::Backend, backend),
                (TechStackField::Database, database),
                (TechStackField::Authentication, auth),
                (TechStackField::Other, other),
            ];
            design(&config, product, stack, priorities, messages, out).await
        }
        Command::Export { graph, out } => export(&config, &graph, &out).await,
        Command::Encode { graph } => {
            let graph: Graph = read_json(&graph)?;
            let request = graph_to_chat_format(&graph)?;
            println!("{}", serde_json::to_string_pretty(&request)?);
            Ok(())
        }
        Command::Decode { response } => {
            let response: ChatResponse = read_json(&response)?;
            let graph = chat_response_to_graph(&response)?;
            println!("{}", serde_json::to_string_pretty(&graph)?);
            Ok(())
        }
        Command::Health => health(&config).await,
        Command::Scenarios { json } => scenarios(json),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&wire_schemas())?);
            Ok(())
        }
    }
}
