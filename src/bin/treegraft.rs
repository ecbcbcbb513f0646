use std::path::{Path, PathBuf};

#[cfg(target_os = "linux")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

use anyhow::Context;
use clap::Parser;
use treegraft::{merge, parse_jsonc, ConflictPolicy, Node, Value};

#[derive(Parser)]
#[command(
    name = "treegraft",
    version = "0.1.0",
    about = "Structurally merge one JSON/JSONC tree into another"
)]
struct Cli {
    /// Tree to copy from
    source: PathBuf,
    /// Tree to merge into
    target: PathBuf,
    /// Conflict policy: overwrite, prefer-source, prefer-target (or the
    /// numeric codes 0, 1, 2)
    #[arg(short, long, default_value = "overwrite", value_parser = parse_policy)]
    policy: ConflictPolicy,
    /// Write the merged tree to this file instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn parse_policy(arg: &str) -> Result<ConflictPolicy, String> {
    match arg {
        "overwrite" => Ok(ConflictPolicy::Overwrite),
        "prefer-source" => Ok(ConflictPolicy::MergePreferSource),
        "prefer-target" => Ok(ConflictPolicy::MergePreferTarget),
        other => {
            let code: i64 = other
                .parse()
                .map_err(|_| format!("unknown policy: {other}"))?;
            ConflictPolicy::from_code(code).map_err(|e| e.to_string())
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let source = read_tree(&cli.source).await?;
    let target = read_tree(&cli.target).await?;

    // A detected cycle is already reported on stderr; the partial merge is
    // still worth emitting.
    merge(
        &Value::Node(source),
        &Value::Node(target.clone()),
        cli.policy,
    )?;

    let merged = target
        .to_json()
        .context("merged tree cannot be rendered as JSON")?;
    let rendered = serde_json::to_string_pretty(&merged)?;
    match cli.out {
        Some(path) => {
            tokio::fs::write(&path, rendered + "\n")
                .await
                .with_context(|| format!("Failed to write {:?}", path))?;
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

async fn read_tree(path: &Path) -> Result<Node, anyhow::Error> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    let json: serde_json::Value =
        parse_jsonc(&content).with_context(|| format!("Failed to parse {:?}", path))?;
    Node::from_json(&json).with_context(|| format!("{:?} does not contain a tree", path))
}
