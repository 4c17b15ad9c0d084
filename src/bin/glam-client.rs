// src/bin/glam-client.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam_studio::client::StudioClient;
use glam_studio::wizard::{SelectedImage, Wizard};
use log::info;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "glam-client", version, about = "Command-line client for Glam Studio")]
struct Cli {
    #[arg(long, env = "GLAM_SERVER", default_value = "http://localhost:8080")]
    server: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check that the server is up.
    Health,
    /// List the available makeup styles.
    Styles,
    /// Upload a photo, apply a style and save the result.
    Apply(ApplyArgs),
}

#[derive(Debug, Parser)]
struct ApplyArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    style: String,
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("warn"));

    if let Err(err) = run(Cli::parse()).await {
        eprintln!("glam-client error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = StudioClient::new(&cli.server)?;
    match cli.command {
        Command::Health => {
            let health = client.health().await?;
            println!("{}: {}", health.status, health.message);
        }
        Command::Styles => {
            for style in client.styles().await? {
                println!(
                    "{:<14} {:<10} intensity {}  {}",
                    style.id,
                    serde_json::to_value(style.category)?
                        .as_str()
                        .unwrap_or_default(),
                    style.intensity,
                    style.description
                );
            }
        }
        Command::Apply(args) => apply(&client, args).await?,
    }
    Ok(())
}

async fn apply(client: &StudioClient, args: ApplyArgs) -> Result<()> {
    let styles = client.styles().await?;
    let style = styles
        .into_iter()
        .find(|s| s.id == args.style)
        .with_context(|| format!("unknown style {:?}", args.style))?;
    let image = SelectedImage::load(&args.image)
        .await
        .with_context(|| format!("cannot use {}", args.image.display()))?;

    let mut wizard = Wizard::new();
    wizard.select_image(image)?;
    wizard.select_style(style)?;
    let result = wizard.run(client).await?.clone();

    if let Some(analysis) = &result.analysis {
        println!("{}", analysis);
    }
    let url = result
        .result_url
        .as_deref()
        .context("server returned no result URL")?;
    println!("Result {} at {}", result.id, url);

    if let Some(output) = args.output {
        let bytes = client.download(url).await?;
        tokio::fs::write(&output, &bytes)
            .await
            .with_context(|| format!("cannot write {}", output.display()))?;
        info!("Saved {} bytes to {}", bytes.len(), output.display());
        println!("Saved to {}", output.display());
    }
    Ok(())
}
