use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use depot_config::DepotConfig;
use depot_fetch::ReqwestClient;
use depot_layout::MetadataRef;
use depot_proxy::{NegativeCacheEntry, NegativeFetchCache, ProxyOrchestrator, Resolution, TracingAuditSink};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{App, Commands, MetadataArg, ResolveArg};

mod cli;

#[derive(Serialize)]
struct ResolveReport<'a> {
    repository:  &'a str,
    resolutions: Vec<ResolvedPath>,
    failed_urls: Vec<NegativeCacheEntry>,
}

#[derive(Serialize)]
struct ResolvedPath {
    request:    String,
    #[serde(flatten)]
    resolution: Resolution,
}

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();
    init_logging(app.verbose);

    let config = DepotConfig::load(&app.config)
        .with_context(|| format!("failed to load configuration from {}", app.config.display()))?;
    tracing::info!(
        config = %app.config.display(),
        repositories = config.repositories.len(),
        "configuration loaded"
    );

    match app.cmd {
        Commands::Check => check(config),
        Commands::Resolve(arg) => resolve(config, arg).await,
        Commands::Metadata(arg) => metadata(config, arg).await,
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

fn orchestrator(config: DepotConfig) -> Result<ProxyOrchestrator<ReqwestClient>> {
    let client = ReqwestClient::new().context("failed to build HTTP client")?;
    let mut orchestrator = ProxyOrchestrator::new(
        client,
        Arc::new(NegativeFetchCache::new()),
        Arc::new(TracingAuditSink),
        config.proxy_options(),
    );
    for (managed, remotes) in config.into_parts()? {
        let id = managed.id.clone();
        tracing::debug!(repository = %id, remotes = remotes.len(), "registering repository");
        orchestrator
            .add_repository(managed, remotes)
            .with_context(|| format!("invalid repository {id}"))?;
    }
    Ok(orchestrator)
}

fn check(config: DepotConfig) -> Result<()> {
    for repository in &config.repositories {
        println!(
            "{} ({}) at {}",
            repository.id,
            repository.layout,
            repository.root.display()
        );
        let mut remotes: Vec<_> = repository.remotes.iter().collect();
        remotes.sort_by_key(|remote| remote.priority);
        for remote in remotes {
            println!("  {:>4} {} {}", remote.priority, remote.id, remote.url);
        }
    }
    // Registration catches what validation alone does not.
    orchestrator(config)?;
    Ok(())
}

async fn resolve(config: DepotConfig, arg: ResolveArg) -> Result<()> {
    let orchestrator = orchestrator(config)?;

    let mut resolutions = Vec::with_capacity(arg.paths.len());
    for path in arg.paths {
        let resolution = orchestrator.resolve(&arg.repository, &path).await?;
        resolutions.push(ResolvedPath {
            request: path,
            resolution,
        });
    }

    let report = ResolveReport {
        repository: &arg.repository,
        resolutions,
        failed_urls: orchestrator.negative_cache().entries(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn metadata(config: DepotConfig, arg: MetadataArg) -> Result<()> {
    let orchestrator = orchestrator(config)?;
    let metadata = match arg.version {
        Some(version) => MetadataRef::versioned(arg.group, arg.name, version),
        None => MetadataRef::project(arg.group, arg.name),
    };

    let fetched = orchestrator.fetch_metadata(&arg.repository, &metadata).await?;
    println!(
        "{}",
        serde_json::json!({
            "repository": arg.repository,
            "metadata": metadata.to_string(),
            "fetched": fetched,
        })
    );
    Ok(())
}
