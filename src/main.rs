mod cli;
mod error;
mod session;

use crate::cli::{Cli, Commands};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::{OptionExt, ResultExt};
use showreel_catalog::{MediaItem, SourceKind, classify};
use showreel_config::Config;
use showreel_prefetch::{LoaderHandle, Playback, PrefetchController};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err:?}");
            return ExitCode::FAILURE;
        },
    };
    init_tracing(&config.log);

    let result = match session::http_loader(&config) {
        Ok(loader) => run(cli.command, &config, loader, &mut std::io::stdout()).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = ?err, "Command failed");
            ExitCode::FAILURE
        },
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(command: Commands, config: &Config, loader: LoaderHandle, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Classify { urls } => {
            for url in urls {
                writeln!(out, "{}", describe(&url)).or_raise(|| ErrorKind::Output)?;
            }
            Ok(())
        },
        Commands::List { catalog, category } => {
            let controller = session::open(config, loader).await?;
            list(&controller, config, catalog.as_deref(), category.as_deref(), out)
        },
        Commands::Prefetch { catalog, hover } => {
            let controller = session::open(config, loader).await?;
            prefetch(&controller, config, catalog.as_deref(), &hover, out).await
        },
        Commands::Play { id, catalog } => {
            let controller = session::open(config, loader).await?;
            play(&controller, config, catalog.as_deref(), &id, out).await
        },
        Commands::Status => {
            let controller = session::open(config, loader).await?;
            for url in controller.cached() {
                writeln!(out, "{url}").or_raise(|| ErrorKind::Output)?;
            }
            Ok(())
        },
        Commands::Clear => {
            let controller = session::open(config, loader).await?;
            controller.clear().await.or_raise(|| ErrorKind::Storage)?;
            writeln!(out, "Cleared prefetch record").or_raise(|| ErrorKind::Output)
        },
    }
}

/// One line per locator: its kind, and where the player would point.
fn describe(url: &str) -> String {
    let kind = classify(url);
    let label = match &kind {
        SourceKind::Direct => return format!("direct    {url}"),
        SourceKind::Bilibili { bvid: None } => "bilibili?",
        SourceKind::Bilibili { .. } => "bilibili",
        SourceKind::Embed => "embed",
    };
    format!("{label:<9} {url} -> {}", kind.embed_url(url).unwrap_or_default())
}

fn badge(controller: &PrefetchController, item: &MediaItem) -> &'static str {
    match item.is_direct() {
        true if controller.is_cached(&item.source) => "cached",
        true => "direct",
        false => "embed",
    }
}

fn list(
    controller: &PrefetchController,
    config: &Config,
    catalog: Option<&Path>,
    category: Option<&str>,
    out: &mut impl Write,
) -> Result<()> {
    let catalog = session::catalog(config, catalog)?;
    for name in catalog.categories() {
        if category.is_some_and(|wanted| wanted != name) {
            continue;
        }
        writeln!(out, "{name}").or_raise(|| ErrorKind::Output)?;
        for item in catalog.by_category(name) {
            writeln!(out, "  [{:<6}] {:<16} {}", badge(controller, item), item.id, item.title)
                .or_raise(|| ErrorKind::Output)?;
        }
    }
    Ok(())
}

async fn prefetch(
    controller: &PrefetchController,
    config: &Config,
    catalog: Option<&Path>,
    hover: &[String],
    out: &mut impl Write,
) -> Result<()> {
    let catalog = session::catalog(config, catalog)?;
    let hovers = hover
        .iter()
        .map(|id| {
            let item = catalog.get(id).ok_or_raise(|| ErrorKind::UnknownItem(id.clone()))?;
            Ok(controller.hover(&item.source))
        })
        .collect::<Result<Vec<_>>>()?;
    let batch = controller.schedule_initial_batch(catalog.items().to_vec());

    let started = batch.wait().await.flatten().unwrap_or_default();
    tracing::info!(started = started.len(), "Initial batch scheduled");
    for pending in hovers {
        pending.wait().await;
    }
    controller.settled().await;

    let direct = catalog.direct_items().count();
    let cached = catalog.direct_items().filter(|item| controller.is_cached(&item.source)).count();
    writeln!(out, "{cached} of {direct} direct videos cached").or_raise(|| ErrorKind::Output)
}

async fn play(
    controller: &PrefetchController,
    config: &Config,
    catalog: Option<&Path>,
    id: &str,
    out: &mut impl Write,
) -> Result<()> {
    let catalog = session::catalog(config, catalog)?;
    let item = catalog.get(id).ok_or_raise(|| ErrorKind::UnknownItem(id.to_string()))?;
    let written = match controller.play(item) {
        Playback::Direct { url, cached: true } => writeln!(out, "<video> {url} (cached)"),
        Playback::Direct { url, cached: false } => {
            let written = writeln!(out, "<video> {url}");
            controller.settled().await;
            written
        },
        Playback::Embed { player_url } => writeln!(out, "<iframe> {player_url}"),
    };
    written.or_raise(|| ErrorKind::Output)
}
