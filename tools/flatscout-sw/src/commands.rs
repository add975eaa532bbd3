//! Subcommand handlers. Each returns a report that renders as JSON or text.

use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::Serialize;

use flatscout_worker::events::PushEvent;
use flatscout_worker::fetch::Url;
use flatscout_worker::lifecycle;
use flatscout_worker::notification::resolve_target;
use flatscout_worker::push::{self, NotificationData, NotificationOptions, PushOutcome};
use flatscout_worker::router::{self, Route};
use flatscout_worker::{CacheSnapshot, CacheStorage, Request, RequestMethod, WorkerConfig};

use crate::cli::{ActivateArgs, ClickTargetArgs, NotifyArgs, RouteArgs};
use crate::error::CliError;

// ── Reports ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RouteReport {
    pub url: String,
    pub method: RequestMethod,
    #[serde(flatten)]
    pub route: Route,
    /// Versioned cache name, when the request is intercepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
}

impl fmt::Display for RouteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.route, &self.cache) {
            (
                Route::Intercept {
                    strategy, reason, ..
                },
                Some(cache),
            ) => write!(
                f,
                "{} {}\n  strategy: {}\n  cache:    {}\n  reason:   {:?}",
                self.method, self.url, strategy, cache, reason
            ),
            _ => write!(f, "{} {}\n  passthrough", self.method, self.url),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationReport {
    pub title: String,
    pub options: NotificationOptions,
    /// The payload could not be parsed.
    pub fallback: bool,
}

impl fmt::Display for NotificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.options;
        writeln!(f, "{}{}", self.title, if self.fallback { " (fallback)" } else { "" })?;
        writeln!(f, "  body:               {}", o.body)?;
        writeln!(f, "  tag:                {}", o.tag)?;
        writeln!(f, "  icon:               {}", o.icon)?;
        writeln!(f, "  requireInteraction: {}", o.require_interaction)?;
        let vibrate: Vec<String> = o.vibrate.iter().map(u32::to_string).collect();
        writeln!(f, "  vibrate:            {}", vibrate.join(","))?;
        let actions: Vec<&str> = o.actions.iter().map(|a| a.action.as_str()).collect();
        write!(f, "  actions:            {}", actions.join(", "))
    }
}

#[derive(Debug, Serialize)]
pub struct ClickTargetReport {
    pub url: String,
}

impl fmt::Display for ClickTargetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

#[derive(Debug, Serialize)]
pub struct NamespaceSummary {
    pub name: String,
    pub entries: usize,
    pub canonical: bool,
}

#[derive(Debug, Serialize)]
pub struct CachesReport {
    pub caches: Vec<NamespaceSummary>,
}

impl fmt::Display for CachesReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.caches.is_empty() {
            return f.write_str("no caches");
        }
        let lines: Vec<String> = self
            .caches
            .iter()
            .map(|c| {
                format!(
                    "{:<32} {:>5} entries{}",
                    c.name,
                    c.entries,
                    if c.canonical { "" } else { "  (stale)" }
                )
            })
            .collect();
        f.write_str(&lines.join("\n"))
    }
}

#[derive(Debug, Serialize)]
pub struct ActivateReport {
    pub evicted: Vec<String>,
    pub retained: Vec<String>,
    pub written: bool,
}

impl fmt::Display for ActivateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.evicted.is_empty() {
            write!(f, "nothing to evict")?;
        } else {
            let lines: Vec<String> = self.evicted.iter().map(|n| format!("evict  {n}")).collect();
            write!(f, "{}", lines.join("\n"))?;
        }
        for name in &self.retained {
            write!(f, "\nkeep   {name}")?;
        }
        if self.written {
            write!(f, "\nsnapshot updated")?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigReport {
    #[serde(flatten)]
    pub config: WorkerConfig,
    #[serde(skip)]
    pub toml: String,
}

impl fmt::Display for ConfigReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.toml)
    }
}

// ── Handlers ────────────────────────────────────────────────

/// Load the configuration from `path`, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<WorkerConfig, CliError> {
    match path {
        Some(path) => Ok(WorkerConfig::from_path(path)?),
        None => Ok(WorkerConfig::default()),
    }
}

pub fn route(config: &WorkerConfig, args: &RouteArgs) -> Result<RouteReport, CliError> {
    let method = RequestMethod::parse(&args.method)
        .ok_or_else(|| CliError::InvalidMethod(args.method.clone()))?;
    let url = Url::resolve(&config.origin, &args.url)
        .map_err(|_| CliError::InvalidUrl(args.url.clone()))?;

    let request = if args.navigate {
        Request::navigate(url.clone())
    } else {
        Request::new(url.clone())
    };
    let request = request.with_method(method);

    let route = router::classify(&request, config);
    let cache = match route {
        Route::Intercept { namespace, .. } => Some(namespace.cache_name(config)),
        Route::Passthrough => None,
    };
    Ok(RouteReport {
        url,
        method,
        route,
        cache,
    })
}

/// Read the payload argument, or stdin for `-`.
pub fn read_payload(arg: &str, stdin: &mut dyn Read) -> Result<Vec<u8>, CliError> {
    if arg == "-" {
        let mut buf = Vec::new();
        stdin.read_to_end(&mut buf)?;
        Ok(buf)
    } else {
        Ok(arg.as_bytes().to_vec())
    }
}

pub fn notify(
    config: &WorkerConfig,
    args: &NotifyArgs,
    stdin: &mut dyn Read,
) -> Result<NotificationReport, CliError> {
    let bytes = read_payload(&args.payload, stdin)?;
    let report = match push::prepare(&PushEvent::new(Some(bytes)), config) {
        PushOutcome::Shown { title, options } => NotificationReport {
            title,
            options,
            fallback: false,
        },
        PushOutcome::Fallback { title, options } => NotificationReport {
            title,
            options,
            fallback: true,
        },
        // Not reachable: the payload is always present.
        PushOutcome::Ignored => NotificationReport {
            title: config.notifications.fallback_title.clone(),
            options: NotificationOptions::fallback(&config.notifications),
            fallback: true,
        },
    };
    Ok(report)
}

pub fn click_target(
    config: &WorkerConfig,
    args: &ClickTargetArgs,
) -> Result<ClickTargetReport, CliError> {
    let data: NotificationData = serde_json::from_str(&args.data)?;
    Ok(ClickTargetReport {
        url: resolve_target(&data, config),
    })
}

pub fn caches(config: &WorkerConfig, snapshot: &Path) -> Result<CachesReport, CliError> {
    let snapshot = CacheSnapshot::load(snapshot)?;
    let canonical = config.canonical_caches();
    let caches = snapshot
        .caches
        .iter()
        .map(|ns| NamespaceSummary {
            name: ns.name.clone(),
            entries: ns.entries.len(),
            canonical: canonical.contains(&ns.name),
        })
        .collect();
    Ok(CachesReport { caches })
}

pub fn activate(config: &WorkerConfig, args: &ActivateArgs) -> Result<ActivateReport, CliError> {
    let storage = CacheStorage::from_snapshot(CacheSnapshot::load(&args.snapshot)?);

    let report = if args.write {
        let report = lifecycle::activate(config, &storage);
        storage.snapshot().save(&args.snapshot)?;
        log::info!("[SW Activate] Rewrote {}", args.snapshot.display());
        report
    } else {
        let existing = storage.keys();
        let evicted = lifecycle::evictable(&existing, config);
        let retained = existing
            .into_iter()
            .filter(|name| !evicted.contains(name))
            .collect();
        lifecycle::ActivationReport { evicted, retained }
    };

    Ok(ActivateReport {
        evicted: report.evicted,
        retained: report.retained,
        written: args.write,
    })
}

pub fn config(config: WorkerConfig) -> Result<ConfigReport, CliError> {
    let toml = toml::to_string_pretty(&config)?;
    Ok(ConfigReport { config, toml })
}
