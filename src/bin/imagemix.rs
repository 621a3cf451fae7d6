//! CLI for imagemix - merge two images via the Gemini image model.

use clap::{Args, Parser, Subcommand};
use imagemix::shell::{AppShell, ImageSlot, ShellPhase};
use imagemix::{EncodedImage, GeminiMerger, MergeClient, MergedImage, DOWNLOAD_FILE_PREFIX};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "imagemix")]
#[command(about = "Merge two images with a natural-language instruction (Gemini)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web app: merge endpoint plus the single-page frontend
    Serve(ServeArgs),

    /// Merge two image files against a running server
    Merge(MergeArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
}

#[derive(Args)]
struct MergeArgs {
    /// First input image
    image1: PathBuf,

    /// Second input image
    image2: PathBuf,

    /// How the two images should be combined
    #[arg(short, long)]
    prompt: String,

    /// Base URL of a running imagemix server
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    endpoint: String,

    /// Output file path (defaults to merged-image.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imagemix=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            run_server(args).await?;
        }
        Commands::Merge(args) => {
            run_merge(args, cli.json).await?;
        }
    }

    Ok(())
}

async fn run_server(args: ServeArgs) -> anyhow::Result<()> {
    // Key resolution happens before binding: a missing GEMINI_API_KEY
    // aborts startup instead of failing on the first request.
    let backend = Arc::new(GeminiMerger::builder().build()?);
    imagemix::server::serve(args.addr, backend).await?;
    Ok(())
}

/// Drives the same state machine as the browser frontend: upload both
/// slots, submit once ready, then save the result where a browser would
/// download it.
async fn run_merge(args: MergeArgs, json_output: bool) -> anyhow::Result<()> {
    let mut shell = AppShell::new();
    shell.set_image(ImageSlot::First, EncodedImage::from_path(&args.image1).await?);
    shell.set_image(ImageSlot::Second, EncodedImage::from_path(&args.image2).await?);
    shell.set_prompt(&args.prompt);

    let request = match shell.begin_generate() {
        Some(request) => request,
        None => anyhow::bail!("Missing required fields"),
    };

    let client = MergeClient::new(&args.endpoint);
    let outcome = client
        .generate_merged_image(&request)
        .await
        .map_err(|e| e.to_string());
    shell.finish(outcome);

    match shell.phase() {
        ShellPhase::Succeeded => {}
        ShellPhase::Failed => {
            anyhow::bail!(
                "merge failed: {}",
                shell.error().unwrap_or("unknown error")
            );
        }
        other => anyhow::bail!("unexpected shell phase after merge: {other:?}"),
    }

    let data_url = shell.result().unwrap_or_default();
    let merged = MergedImage::from_data_url(data_url)?;

    let output = args.output.unwrap_or_else(|| {
        shell
            .download_file_name()
            .unwrap_or_else(|| format!("{DOWNLOAD_FILE_PREFIX}.png"))
            .into()
    });
    merged.save(&output)?;

    if json_output {
        let result = serde_json::json!({
            "success": true,
            "output": output.display().to_string(),
            "size_bytes": merged.size(),
            "format": merged.format.extension(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Merged image: {} ({} bytes)",
            output.display(),
            merged.size()
        );
    }

    Ok(())
}
