//! StreamRelay command-line front end
//!
//! Lists the streams live on a media server and runs the publish/play SDP
//! rewrites over description files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use streamrelay_webrtc::sdp::{parse, serialize, Negotiation};
use streamrelay_webrtc::{BrowserEngine, SessionConfig, SessionOptions, SignalingChannel};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "STREAMRELAY_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the streams currently live on the server, as JSON
    Streams {
        /// Signaling endpoint (ws:// or wss://)
        #[arg(long, env = "STREAMRELAY_SDP_URL")]
        url: Option<String>,

        /// Server application name
        #[arg(long, env = "STREAMRELAY_APP")]
        app: Option<String>,

        /// Stream name
        #[arg(long, env = "STREAMRELAY_STREAM")]
        stream: Option<String>,

        /// Session config file (.json, .yaml or .yml)
        #[arg(long, env = "STREAMRELAY_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Rewrite a local offer the way a publish would
    TransformOffer {
        /// SDP file to rewrite
        file: PathBuf,

        /// Session config file supplying codecs and bit rates
        #[arg(long, env = "STREAMRELAY_CONFIG")]
        config: Option<PathBuf>,

        /// Peer engine whose quirks to apply
        #[arg(long, value_enum)]
        engine: Option<Engine>,
    },

    /// Rewrite a local answer the way a play would
    TransformAnswer {
        /// SDP file to rewrite
        file: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Engine {
    Chromium,
    Firefox,
    Safari,
    Other,
}

impl From<Engine> for BrowserEngine {
    fn from(engine: Engine) -> Self {
        match engine {
            Engine::Chromium => BrowserEngine::Chromium,
            Engine::Firefox => BrowserEngine::Firefox,
            Engine::Safari => BrowserEngine::Safari,
            Engine::Other => BrowserEngine::Other,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run(args.command))
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Streams {
            url,
            app,
            stream,
            config,
        } => {
            let config = load_config(
                config.as_deref(),
                SessionOptions {
                    sdp_url: url,
                    application_name: app,
                    stream_name: stream,
                    ..Default::default()
                },
            )?;
            list_streams(&config).await
        }
        Command::TransformOffer {
            file,
            config,
            engine,
        } => {
            let config = load_config(
                config.as_deref(),
                SessionOptions {
                    engine: engine.map(Into::into),
                    ..Default::default()
                },
            )?;
            let doc = read_sdp(&file)?;
            let mut negotiation = Negotiation::from_config(&config);
            print!("{}", serialize(&negotiation.transform_offer(&doc)));
            Ok(())
        }
        Command::TransformAnswer { file } => {
            let doc = read_sdp(&file)?;
            let mut negotiation = Negotiation::from_config(&SessionConfig::default());
            print!("{}", serialize(&negotiation.transform_answer(&doc)));
            Ok(())
        }
    }
}

async fn list_streams(config: &SessionConfig) -> Result<()> {
    let channel = SignalingChannel::from_config(config);
    info!(url = %channel.url(), app = %config.application_name, "Listing available streams");

    let result = channel.get_available_streams().await;
    channel.disconnect().await;

    let streams = result
        .with_context(|| format!("getAvailableStreams against {} failed", config.sdp_url))?
        .available_streams
        .unwrap_or_default();
    debug!(count = streams.len(), "Received stream list");

    println!("{}", serde_json::to_string_pretty(&streams)?);
    Ok(())
}

fn load_config(path: Option<&Path>, overlay: SessionOptions) -> Result<SessionConfig> {
    let mut config = match path {
        Some(path) => SessionConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => SessionConfig::default(),
    };
    config.apply(overlay);
    config.validate().context("invalid session config")?;
    Ok(config)
}

fn read_sdp(path: &Path) -> Result<streamrelay_webrtc::SdpDocument> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&text).with_context(|| format!("failed to parse SDP in {}", path.display()))
}

fn init_tracing(json: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }
    Ok(())
}
