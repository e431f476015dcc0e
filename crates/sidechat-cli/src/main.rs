use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod app;
mod commands;

#[derive(Parser)]
#[command(name = "sidechat")]
#[command(about = "Sidechat - chat with a multimodal model about your workspace")]
#[command(version)]
struct Cli {
    /// Run a single prompt and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Attach an image to the prompt (repeatable)
    #[arg(short, long = "image")]
    images: Vec<PathBuf>,

    /// Attach a workspace file to the prompt (repeatable)
    #[arg(short, long = "file")]
    files: Vec<String>,

    /// Model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Base URL of the chat-completion API
    #[arg(long)]
    base_url: Option<String>,

    /// Wait for the whole reply instead of streaming it
    #[arg(long)]
    no_stream: bool,

    /// Write the conversation as HTML when done
    #[arg(long)]
    html: Option<PathBuf>,

    /// Print the workspace file list and exit
    #[arg(long)]
    list_files: bool,

    /// Read settings from this file instead of the default location
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings (with flag overrides) to the config file and exit
    #[arg(long)]
    write_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = match cli.config {
        Some(ref path) if cli.write_config && !path.exists() => sidechat_core::Settings::default(),
        Some(ref path) => sidechat_core::Settings::load_from(path)?,
        None => sidechat_core::Settings::load(),
    };

    if let Some(ref model) = cli.model {
        settings.llm.model = model.clone();
    }
    if let Some(ref base_url) = cli.base_url {
        settings.llm.base_url = base_url.clone();
    }
    if cli.no_stream {
        settings.llm.stream = false;
    }

    if cli.write_config {
        let path = match cli.config {
            Some(path) => {
                settings.save_to(&path)?;
                path
            }
            None => {
                settings.save()?;
                sidechat_core::Settings::config_path()
            }
        };
        println!("Wrote settings to {}", path.display());
        return Ok(());
    }

    let workspace = app::Workspace::detect(settings.chat.max_file_bytes)?;

    if cli.list_files {
        app::print_files(&workspace, None, &sidechat_core::project::FileSelection::new());
        return Ok(());
    }

    if let Some(prompt) = cli.prompt {
        let request = app::PromptRequest {
            prompt,
            images: cli.images,
            files: cli.files,
            html: cli.html,
        };
        app::run_single_prompt(&settings, &workspace, request).await?;
    } else {
        app::run_repl(&settings, &workspace, cli.html).await?;
    }

    Ok(())
}
