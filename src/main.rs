use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use framecast::api::GifBackend;
use framecast::capture::default_launcher;
use framecast::{
    AppConfig, CaptureConfig, CaptureEngine, EncoderSettings, FrameEncoder, Pipeline, Publisher,
    RenderClient, RenderWorker,
};

#[derive(Parser)]
#[command(name = "framecast", version, about = "Four-frame promo card GIF generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the render API (frames, and one-shot GIFs when a store is configured)
    Serve {
        /// Address to bind, overrides FRAMECAST_BIND
        #[arg(long)]
        bind: Option<String>,
        #[command(flatten)]
        browser: BrowserArgs,
    },
    /// Capture the four frames locally and write them as PNG files
    Render {
        #[command(flatten)]
        input: TextArgs,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        #[command(flatten)]
        browser: BrowserArgs,
    },
    /// Render, encode and publish; prints the public URL and embed code
    Generate {
        #[command(flatten)]
        input: TextArgs,
        /// Capture in-process instead of calling the render API
        #[arg(long)]
        local: bool,
        /// Also keep the GIF at this path
        #[arg(long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        browser: BrowserArgs,
    },
    /// Check that the object store accepts the configured credential
    Health,
}

#[derive(Args)]
struct TextArgs {
    /// Card text; `\n` separates lines
    #[arg(long, conflicts_with = "text_file")]
    text: Option<String>,
    /// Read the card text from a file
    #[arg(long)]
    text_file: Option<PathBuf>,
}

impl TextArgs {
    fn resolve(&self) -> anyhow::Result<String> {
        match (&self.text, &self.text_file) {
            (Some(t), _) => Ok(t.replace("\\n", "\n")),
            (None, Some(p)) => std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display())),
            (None, None) => bail!("pass --text or --text-file"),
        }
    }
}

#[derive(Args)]
struct BrowserArgs {
    /// Run Chrome without its sandbox (containers)
    #[arg(long)]
    no_sandbox: bool,
}

fn capture_config(app: &AppConfig, browser: &BrowserArgs) -> CaptureConfig {
    CaptureConfig {
        browser_path: app.chrome_path.clone(),
        sandbox: !browser.no_sandbox,
        ..Default::default()
    }
}

fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let app = AppConfig::from_env()?;

    match cli.command {
        Command::Serve { bind, browser } => {
            let worker = RenderWorker::new(default_launcher(), capture_config(&app, &browser), app.max_sessions);
            let gif = match app.store() {
                Ok(store) => Some(GifBackend::new(FrameEncoder::new(EncoderSettings::default())?, Publisher::new(store)?)),
                Err(e) => {
                    log::warn!("{}; {} will answer 503", e, framecast::api::GIF_PATH);
                    None
                }
            };
            let bind = bind.unwrap_or_else(|| app.bind.clone());
            framecast::server::serve(&bind, worker, gif)?;
        }
        Command::Render { input, out_dir, browser } => {
            let text = input.resolve()?;
            let engine = CaptureEngine::new(default_launcher(), capture_config(&app, &browser));
            let frames = engine.capture_text(&text)?;
            std::fs::create_dir_all(&out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
            for (i, frame) in frames.frames().iter().enumerate() {
                let path = out_dir.join(format!("frame-{}.png", i + 1));
                std::fs::write(&path, frame.png()).with_context(|| format!("writing {}", path.display()))?;
                println!("{}", path.display());
            }
        }
        Command::Generate { input, local, output, browser } => {
            let text = input.resolve()?;
            let encoder = FrameEncoder::new(EncoderSettings::default())?;
            let publisher = Publisher::new(app.store()?)?;
            let outcome = if local {
                let engine = CaptureEngine::new(default_launcher(), capture_config(&app, &browser));
                Pipeline::new(engine, encoder, publisher).generate(&text, report)?
            } else {
                let client = RenderClient::new(app.render_url.clone(), Duration::from_secs(120))?;
                Pipeline::new(client, encoder, publisher).generate(&text, report)?
            };

            if let Some(path) = output {
                save(&path, outcome.artifact.bytes())?;
            }
            println!("{}", serde_json::to_string_pretty(&outcome.published)?);
        }
        Command::Health => {
            let publisher = Publisher::new(app.store()?)?;
            if publisher.check_connection()? {
                println!("object store OK ({})", publisher.config().bucket);
            } else {
                bail!("object store rejected the configured credential");
            }
        }
    }

    Ok(())
}

fn report(stage: framecast::Stage, percent: u8) {
    log::info!("{:?} {}%", stage, percent);
}

fn save(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}
