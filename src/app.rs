use crate::{
    cli::args::{ArchiveArgs, Cli, Command, ListArgs, WebArgs},
    config::{ConfigLoader, GlobalConfig},
    core::{
        backend::{ArchiveBackend, TargetBackend, WebBackend},
        controller::RunController,
        models::{RunReport, Target},
        state::CancelToken,
    },
    discovery::FormDiscovery,
    reporters::FileReportSink,
    ui::{ConsoleSink, printer},
    utils::logging,
    wordlists::{LocalWordlists, PinnedWordlist, RemoteCatalogue, SizeTier, SourceChain},
};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(cli: Cli) -> Result<()> {
    let level = logging::level_from_cli(&cli);
    logging::init(level)?;

    let config = ConfigLoader::load_with_custom_path(cli.config.as_deref())?;
    tracing::debug!(
        "Configuration: web delay {}ms, progress every {}ms, rules {:?}",
        config.engine.web_delay_ms,
        config.engine.progress_interval_ms,
        config.classifier.rules
    );

    match &cli.command {
        Command::Web(args) => run_web(args, &config).await.map(|_| ()),
        Command::Archive(args) => run_archive(args, &config).await.map(|_| ()),
        Command::Wordlists(args) => list_wordlists(args, &config).await,
    }
}

async fn run_web(args: &WebArgs, config: &GlobalConfig) -> Result<RunReport> {
    tracing::info!("Starting web run against {} as '{}'", args.url, args.username);
    let tier = resolve_tier(args.tier.as_deref(), &config.wordlists.web_tier)?;
    let chain = build_chain(config, args.wordlist.as_deref(), tier)?;

    let discovery = FormDiscovery::from_settings(&config.discovery, &config.http, !args.no_browser);
    let backend = WebBackend::new(
        discovery,
        config.http.clone(),
        &config.classifier,
        Duration::from_millis(config.engine.web_delay_ms),
    );
    let target = Target::web(args.url.clone(), Some(args.username.clone()));

    execute(&target, &backend, chain, config).await
}

async fn run_archive(args: &ArchiveArgs, config: &GlobalConfig) -> Result<RunReport> {
    tracing::info!("Starting archive run against {}", args.path.display());
    let tier = resolve_tier(args.tier.as_deref(), &config.wordlists.archive_tier)?;
    let chain = build_chain(config, args.wordlist.as_deref(), tier)?;

    let backend = if args.extract {
        ArchiveBackend::extracting_into(&config.output.dir)
    } else {
        ArchiveBackend::new()
    };
    let target = Target::archive(args.path.clone());

    execute(&target, &backend, chain, config).await
}

async fn list_wordlists(args: &ListArgs, config: &GlobalConfig) -> Result<()> {
    let tier = resolve_tier(args.tier.as_deref(), &config.wordlists.web_tier)?;
    let chain = build_chain(config, None, tier)?;
    let listing = chain.describe().await;
    printer::print_wordlists(&listing);
    Ok(())
}

async fn execute(
    target: &Target,
    backend: &dyn TargetBackend,
    chain: SourceChain,
    config: &GlobalConfig,
) -> Result<RunReport> {
    let cancel = CancelToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after the current attempt");
                cancel.cancel();
            }
        })
    };

    let reports = Arc::new(FileReportSink::new(&config.output.dir));
    let controller = RunController::new(chain, Arc::new(ConsoleSink::new()), reports.clone(), cancel)
        .with_progress(
            Duration::from_millis(config.engine.progress_interval_ms),
            config.engine.progress_queue,
        );

    let result = controller.run(target, backend).await;
    interrupt.abort();
    let report = result.context("Run could not start")?;

    printer::print_summary(&report, Some(&reports.dir_for(&report.run_id)));
    Ok(report)
}

fn resolve_tier(flag: Option<&str>, configured: &str) -> Result<SizeTier> {
    flag.unwrap_or(configured)
        .parse::<SizeTier>()
        .map_err(|e| anyhow::anyhow!(e))
}

/// A pinned list replaces the chain; otherwise remote first, then local
fn build_chain(config: &GlobalConfig, pinned: Option<&Path>, tier: SizeTier) -> Result<SourceChain> {
    if let Some(path) = pinned {
        tracing::info!("Using pinned wordlist {}", path.display());
        return Ok(SourceChain::new().with_tier(Box::new(PinnedWordlist::new(path))));
    }

    let mut chain = SourceChain::new();
    if let Some(remote) = &config.wordlists.remote {
        let catalogue = RemoteCatalogue::new(
            remote.base_url.clone(),
            remote.resolved_key(),
            Duration::from_secs(remote.timeout_s),
        )
        .context("Failed to set up the remote catalogue client")?;
        chain = chain.with_tier(Box::new(catalogue));
    }

    tracing::debug!("Local wordlists from {} ({:?} tier)", config.wordlists.local_dir.display(), tier);
    Ok(chain.with_tier(Box::new(LocalWordlists::new(&config.wordlists.local_dir, tier))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wordlists::SourceOrigin;

    #[test]
    fn test_resolve_tier_prefers_flag() {
        assert_eq!(resolve_tier(Some("big"), "small").unwrap(), SizeTier::Big);
        assert_eq!(resolve_tier(None, "median").unwrap(), SizeTier::Medium);
        assert!(resolve_tier(Some("huge"), "small").is_err());
    }

    #[test]
    fn test_pinned_list_replaces_chain() {
        let mut config = GlobalConfig::default();
        config.wordlists.remote = Some(crate::config::RemoteSettings {
            base_url: url::Url::parse("https://catalogue.example.test/").unwrap(),
            api_key: None,
            timeout_s: 5,
        });

        let pinned = build_chain(&config, Some(Path::new("mine.txt")), SizeTier::All).unwrap();
        let origins: Vec<_> = pinned.tiers().iter().map(|t| t.origin()).collect();
        assert_eq!(origins, vec![SourceOrigin::Pinned]);

        let full = build_chain(&config, None, SizeTier::All).unwrap();
        let origins: Vec<_> = full.tiers().iter().map(|t| t.origin()).collect();
        assert_eq!(origins, vec![SourceOrigin::Remote, SourceOrigin::Local]);
    }
}
