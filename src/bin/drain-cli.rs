use std::io::{self, Read};
use std::path::PathBuf;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use reqwest::StatusCode;
use serde_json::Value;

use logdrain_router::correlation::DEFAULT_IDENTIFY_MARKER;
use logdrain_router::drain::{encode_frame, SyslogHeader};
use logdrain_router::resilience::RetryPolicy;

#[derive(Parser)]
#[command(name = "drain-cli")]
#[command(about = "Send test drains to a logdrain-router and inspect it", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Retries on connection errors and 5xx responses
    #[arg(long, default_value_t = 3)]
    retries: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send log lines from FILE (or stdin) as one drain delivery
    Send {
        /// Source name, the drain path is /logs/<source>
        #[arg(short, long)]
        source: String,

        #[arg(long, default_value = "app")]
        app: String,

        #[arg(long, default_value = "postgres.1")]
        proc_id: String,

        #[arg(long, default_value = "host")]
        host: String,

        file: Option<PathBuf>,
    },
    /// Announce that a source belongs to a configured server section
    Identify {
        #[arg(short, long)]
        source: String,

        #[arg(long)]
        section: String,
    },
    /// Show configured servers
    Status,
}

#[derive(Debug, thiserror::Error)]
enum SendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("router answered {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl SendError {
    fn is_retryable(&self) -> bool {
        match self {
            SendError::Http(e) => e.is_connect() || e.is_timeout(),
            SendError::Status { status, .. } => status.is_server_error(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let policy = RetryPolicy {
        max_retries: cli.retries,
        ..Default::default()
    };

    match cli.command {
        Commands::Send {
            source,
            app,
            proc_id,
            host,
            file,
        } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut text = String::new();
                    io::stdin().read_to_string(&mut text)?;
                    text
                }
            };
            let header = SyslogHeader {
                priority: 134,
                version: 1,
                timestamp: "-",
                hostname: &host,
                app_name: &app,
                proc_id: &proc_id,
                msg_id: "-",
            };
            let lines: Vec<&str> = text.lines().filter(|l| !l.is_empty()).collect();
            let body = render_body(&header, &lines);
            post_drain(&client, &policy, &cli.url, &source, body).await?;
            println!("sent {} lines to source '{}'", lines.len(), source);
        }
        Commands::Identify { source, section } => {
            let header = SyslogHeader {
                priority: 134,
                version: 1,
                timestamp: "-",
                hostname: "host",
                app_name: "app",
                proc_id: "postgres.1",
                msg_id: "-",
            };
            let line = format!("{DEFAULT_IDENTIFY_MARKER}: {section}");
            let body = render_body(&header, &[line.as_str()]);
            post_drain(&client, &policy, &cli.url, &source, body).await?;
            println!("identified source '{}' as section '{}'", source, section);
        }
        Commands::Status => {
            let res = client.get(format!("{}/status", cli.url)).send().await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

/// Octet-encode one syslog frame per line.
fn render_body(header: &SyslogHeader<'_>, lines: &[&str]) -> Bytes {
    let mut out = Vec::new();
    for line in lines {
        encode_frame(header.render(line).as_bytes(), &mut out);
    }
    Bytes::from(out)
}

async fn post_drain(
    client: &reqwest::Client,
    policy: &RetryPolicy,
    url: &str,
    source: &str,
    body: Bytes,
) -> Result<(), SendError> {
    let target = format!("{}/logs/{}", url.trim_end_matches('/'), source);
    let target = &target;
    let body = &body;

    policy
        .retry(
            move || async move {
                let res = client
                    .post(target)
                    .header("content-type", "application/logplex-1")
                    .body(body.clone())
                    .send()
                    .await?;
                let status = res.status();
                if status.is_success() {
                    Ok::<(), SendError>(())
                } else {
                    let text = res.text().await.unwrap_or_default();
                    Err(SendError::Status { status, body: text })
                }
            },
            SendError::is_retryable,
        )
        .await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: router returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
