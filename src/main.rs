use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use panel_queue::config::PanelConfig;
use panel_queue::node::Node;
use panel_queue::shutdown::install_shutdown_handler;

#[derive(Parser, Debug)]
#[command(name = "panel-queue")]
#[command(version)]
#[command(about = "Serializes display requests onto an LED matrix panel")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the panel controller
    Serve(ServeArgs),

    /// Send a display request to a running controller
    Message {
        #[command(flatten)]
        client: ClientArgs,

        #[command(flatten)]
        message: MessageArgs,
    },

    /// Send a control command (start, stop, end, clear)
    Command {
        #[command(flatten)]
        client: ClientArgs,

        command: String,
    },

    /// Show scheduler state and pending jobs
    Status {
        #[command(flatten)]
        client: ClientArgs,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Path to the JSON configuration file
    #[arg(long, short = 'c', default_value = "config.json")]
    config: PathBuf,

    /// Override the message source listen address
    #[arg(long)]
    listen: Option<SocketAddr>,
}

// =============================================================================
// Client Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Controller address
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:8080")]
    addr: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
enum MessageKind {
    Text,
    Picture,
    Animation,
    Sync,
}

#[derive(Parser, Debug)]
struct MessageArgs {
    /// What to display
    #[arg(long, value_enum)]
    kind: MessageKind,

    /// Text to scroll (text messages)
    #[arg(long)]
    text: Option<String>,

    /// Asset file name (picture, animation, sync)
    #[arg(long)]
    file: Option<String>,

    /// Asset category for sync: picture or animation
    #[arg(long = "type")]
    asset_type: Option<String>,

    #[arg(long)]
    duration: Option<u32>,

    /// Scroll speed (text messages)
    #[arg(long)]
    speed: Option<u32>,

    /// Text color as r,g,b
    #[arg(long)]
    color: Option<String>,

    /// Replay whenever the queue drains
    #[arg(long)]
    repeat: bool,

    /// Run before anything already queued
    #[arg(long)]
    priority: bool,
}

impl MessageArgs {
    fn to_payload(&self) -> Result<Value, Box<dyn std::error::Error>> {
        let name = match self.kind {
            MessageKind::Text => "text",
            MessageKind::Picture => "picture",
            MessageKind::Animation => "animation",
            MessageKind::Sync => "sync",
        };
        let mut meta = json!({
            "name": name,
            "repeat": self.repeat,
            "priority": self.priority,
        });
        if let Some(ref t) = self.asset_type {
            meta["type"] = json!(t);
        }
        if let Some(ref f) = self.file {
            meta["pictureFile"] = json!(f);
        }
        if let Some(d) = self.duration {
            meta["duration"] = json!(d);
        }
        if let Some(s) = self.speed {
            meta["speed"] = json!(s);
        }
        if let Some(ref color) = self.color {
            let channels = color
                .split(',')
                .map(|c| c.trim().parse::<u8>())
                .collect::<Result<Vec<_>, _>>()?;
            if channels.len() != 3 {
                return Err("color must be r,g,b".into());
            }
            meta["red"] = json!(channels[0]);
            meta["green"] = json!(channels[1]);
            meta["blue"] = json!(channels[2]);
        }
        Ok(json!({ "message": self.text, "userMetadata": meta }))
    }
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServeArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = PanelConfig::load(&args.config).await?;
    if let Some(listen) = args.listen {
        config.source.listen_addr = listen;
    }

    tracing::info!(
        config = %args.config.display(),
        listen_addr = %config.source.listen_addr,
        matrix_path = %config.matrix.path.display(),
        sudo = config.matrix.sudo,
        render_timeout = ?config.scheduler.render_timeout(),
        "Starting panel-queue"
    );

    let shutdown = install_shutdown_handler()?;
    Node::new(config).run(shutdown).await?;

    tracing::info!("panel-queue stopped");
    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

fn endpoint(client: &ClientArgs, path: &str) -> String {
    format!("{}{}", client.addr.trim_end_matches('/'), path)
}

async fn post_json(
    client: &ClientArgs,
    path: &str,
    body: &Value,
) -> Result<(reqwest::StatusCode, Value), Box<dyn std::error::Error>> {
    let response = reqwest::Client::new()
        .post(endpoint(client, path))
        .json(body)
        .send()
        .await?;
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    Ok((status, body))
}

fn print_value(output: &OutputFormat, value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => {
            if let Some(map) = value.as_object() {
                for (key, val) in map {
                    println!("{:<12} {}", format!("{}:", key), val);
                }
            } else {
                println!("{}", value);
            }
        }
    }
    Ok(())
}

async fn handle_message(
    client: &ClientArgs,
    message: &MessageArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let (status, body) = post_json(client, "/api/messages", &message.to_payload()?).await?;
    print_value(&client.output, &body)?;
    if !status.is_success() {
        return Err(format!("controller rejected message ({})", status).into());
    }
    Ok(())
}

async fn handle_command(client: &ClientArgs, command: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (_, body) = post_json(client, "/api/commands", &json!({ "command": command })).await?;
    print_value(&client.output, &body)
}

/// `kind (origin)` for a job summary, tolerating missing fields.
fn describe_job(job: &Value) -> String {
    let field = |key: &str| {
        job.get(key)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string()
    };
    format!("{} ({})", field("kind"), field("origin"))
}

async fn handle_status(client: &ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let body = reqwest::Client::new()
        .get(endpoint(client, "/api/status"))
        .send()
        .await?
        .json::<Value>()
        .await?;

    match client.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&body)?),
        OutputFormat::Table => {
            println!("State:     {}", body["state"].as_str().unwrap_or("unknown"));
            println!("Queued:    {}", body["queued"]);
            if body["in_flight"].is_object() {
                println!("Rendering: {}", describe_job(&body["in_flight"]));
            }
            if body["repeat"].is_object() {
                println!("Repeating: {}", describe_job(&body["repeat"]));
            }
            if let Some(pending) = body["pending"].as_array() {
                for (i, job) in pending.iter().enumerate() {
                    println!("  {:>3}. {}", i + 1, describe_job(job));
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Serve(serve_args) => run_server(serve_args).await?,
        Commands::Message { client, message } => handle_message(&client, &message).await?,
        Commands::Command { client, command } => handle_command(&client, &command).await?,
        Commands::Status { client } => handle_status(&client).await?,
    }

    Ok(())
}
