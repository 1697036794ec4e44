use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use nxresolve::availability::{NixPlatformProbe, PlatformProbe};
use nxresolve::lock::RevisionMap;
use nxresolve::nix::NixCommand;
use nxresolve::routing::{Route, RoutingTargets, route_candidate};
use nxresolve::{
    Availability, Candidate, PackageSource, Resolution, ResolutionCache, Resolver, ResolverConfig,
    Selection, SourcePreferences,
};
use serde_json::json;
use std::sync::Arc;

fn spinner(message: String) -> ProgressBar {
    if !std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

pub async fn resolve(
    config: &ResolverConfig,
    names: &[String],
    prefs: &SourcePreferences,
    as_json: bool,
) -> anyhow::Result<()> {
    let mut resolver = Resolver::new(config)?;
    let targets = RoutingTargets::default();
    let mut report = Vec::new();

    for name in names {
        let pb = if as_json {
            ProgressBar::hidden()
        } else {
            spinner(format!("Searching for {name}..."))
        };
        let resolution = resolver.resolve(name, prefs).await;

        let selection = if resolution.is_found() && !resolution.is_installed() {
            pb.set_message(format!("Checking {name} availability..."));
            Some(resolver.select_installable(&resolution).await)
        } else {
            None
        };
        let route = match selection.as_ref().and_then(Selection::chosen) {
            Some(chosen) => route_candidate(chosen, &targets, &[], None).await,
            None => None,
        };
        pb.finish_and_clear();

        if as_json {
            report.push(json!({
                "resolution": resolution,
                "selection": selection,
                "route": route,
            }));
        } else {
            print_resolution(&resolution, selection.as_ref(), route.as_ref());
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn describe(candidate: &Candidate) -> String {
    let attr = candidate.attr.as_deref().unwrap_or(&candidate.name);
    match &candidate.version {
        Some(version) => format!("{} {}", attr, version.dimmed()),
        None => attr.to_string(),
    }
}

fn print_resolution(resolution: &Resolution, selection: Option<&Selection>, route: Option<&Route>) {
    let best = &resolution.best;
    match best.source {
        PackageSource::NotFound => {
            println!("{} {}: {}", "✗".red(), resolution.name.bold(), best.description);
            return;
        }
        PackageSource::Installed => {
            println!("{} {}: {}", "✓".green(), resolution.name.bold(), best.description);
            return;
        }
        _ => {}
    }

    let cached = if resolution.from_cache { " (cached)".dimmed().to_string() } else { String::new() };
    println!(
        "{} {} → {} [{}] {:.2}{}",
        "==>".bold().green(),
        resolution.name.bold(),
        describe(best).cyan(),
        best.source,
        best.confidence,
        cached
    );
    if !best.description.is_empty() {
        println!("    {}", best.description.dimmed());
    }
    if best.requires_flake_input {
        if let Some(url) = &best.flake_url {
            println!("    {} requires flake input {}", "⚠".yellow(), url);
        }
    }

    match selection {
        Some(Selection::Fallback {
            replacement,
            reason,
            ..
        }) => println!(
            "    {} {}; using {}",
            "⚠".yellow(),
            reason,
            describe(replacement).cyan()
        ),
        Some(Selection::Unavailable { reason, .. }) => {
            println!("    {} {}", "✗".red(), reason)
        }
        _ => {}
    }

    if let Some(route) = route {
        println!("    target: {}", route.target);
    }

    for alternate in &resolution.alternates {
        println!(
            "    {} {} [{}] {:.2}",
            "·".dimmed(),
            describe(alternate),
            alternate.source,
            alternate.confidence
        );
    }
}

pub async fn check(config: &ResolverConfig, attr: &str) -> anyhow::Result<()> {
    let probe = NixPlatformProbe::new(Arc::new(NixCommand), config.eval_timeout);
    let pb = spinner(format!("Checking {attr}..."));
    let verdict = probe.check(attr).await;
    pb.finish_and_clear();

    match verdict {
        Availability::Available => println!("{} {} is available", "✓".green(), attr.bold()),
        Availability::Unavailable { reason } => {
            println!("{} {}: {}", "✗".red(), attr.bold(), reason);
        }
    }
    Ok(())
}

fn open_cache(config: &ResolverConfig) -> ResolutionCache {
    let revisions = config
        .flake_lock
        .as_deref()
        .map(RevisionMap::from_lock_file)
        .unwrap_or_default();
    ResolutionCache::open(&config.cache_dir, revisions)
}

pub fn cache_clear(config: &ResolverConfig) -> anyhow::Result<()> {
    let mut cache = open_cache(config);
    let count = cache.len();
    cache.clear()?;
    println!(
        "{} Removed {} cached entries from {}",
        "✓".green(),
        count,
        cache.path().display()
    );
    Ok(())
}

pub fn cache_invalidate(
    config: &ResolverConfig,
    name: &str,
    source: Option<&str>,
) -> anyhow::Result<()> {
    let source = match source {
        Some(value) => match PackageSource::parse(value) {
            Some(source) => Some(source),
            None => anyhow::bail!("unknown source '{}'", value),
        },
        None => None,
    };

    let mut cache = open_cache(config);
    let removed = cache.invalidate(name, source)?;
    println!("{} Removed {} entries for {}", "✓".green(), removed, name.bold());
    Ok(())
}
