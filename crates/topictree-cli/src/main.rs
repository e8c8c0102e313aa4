//! topictree demo
//!
//! Walks an in-memory topic namespace loaded from a JSON file, expanding
//! nodes down to a fixed depth and printing every add and remove.

mod config;
mod error;
mod formatter;
mod namespace_file;

use clap::Parser;
use tokio::time::timeout;
use topictree::{ChannelWalker, WalkEvent};
use tracing_subscriber::EnvFilter;

use config::{Args, DemoConfig};
use namespace_file::NamespaceFile;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("topictree=info,topictree_cli=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args.into_config()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: DemoConfig) -> error::Result<()> {
    let file = NamespaceFile::load(&config.namespace_file)?;
    tracing::info!(
        path = %config.namespace_file.display(),
        topics = file.topics.len(),
        "namespace loaded"
    );

    let formatter = formatter::create_formatter(config.format);
    let (walker, mut events) = ChannelWalker::new();
    let handle = topictree::walk(file.into_namespace(), config.walk.clone(), walker);

    let mut failure = None;
    loop {
        let event = match timeout(config.linger, events.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => {
                if !handle.is_closed() {
                    tracing::debug!(linger = ?config.linger, "namespace quiet, closing walk");
                    handle.close();
                }
                continue;
            }
        };

        match &event {
            WalkEvent::NodeAdded { node, .. } if config.expands(node.path()) => {
                if let Err(e) = node.select_descendants(true) {
                    tracing::debug!(path = node.path(), error = %e, "expansion skipped");
                }
            }
            WalkEvent::Error(error) => failure = Some(error.clone()),
            _ => {}
        }

        println!("{}", formatter.format_event(&event));
    }

    handle.closed().await;
    match failure {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}
