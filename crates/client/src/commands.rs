//! Application state and the command surface driven by the `sheetsync` binary.

use chrono::Local;
use serde::Serialize;
use serde_json::{Value, json};
use sheetsync_core::RecordId;
use sheetsync_reports::{InstallationReport, Record, ServiceReport};

use crate::cache::LocalCache;
use crate::config::{ClientConfig, ConfigError, INSTALLATION_URL_VAR, SERVICE_URL_VAR};
use crate::remote::{RemoteStore, SheetDbStore, UpdateMode};
use crate::synchronizer::{RecordSynchronizer, SyncError};

pub type InstallationSync = RecordSynchronizer<InstallationReport, SheetDbStore>;
pub type ServiceSync = RecordSynchronizer<ServiceReport, SheetDbStore>;

/// One synchronizer per configured domain, sharing a single local cache.
pub struct AppState {
    pub cache: LocalCache,
    installations: Option<InstallationSync>,
    services: Option<ServiceSync>,
}

impl AppState {
    pub async fn from_config(config: &ClientConfig) -> anyhow::Result<Self> {
        let cache = LocalCache::open(&config.cache_path).await?;
        tracing::info!(path = %config.cache_path.display(), "local cache opened");

        let store = |url: &reqwest::Url, mode: UpdateMode| -> anyhow::Result<SheetDbStore> {
            let store = SheetDbStore::new(url.clone(), mode, config.http_timeout)?;
            Ok(match &config.auth_token {
                Some(token) => store.with_token(token.clone()),
                None => store,
            })
        };

        let installations = match &config.installation_url {
            Some(url) => Some(RecordSynchronizer::new(store(url, UpdateMode::Put)?, cache.clone())),
            None => None,
        };
        let services = match &config.service_url {
            Some(url) => Some(RecordSynchronizer::new(store(url, UpdateMode::Patch)?, cache.clone())),
            None => None,
        };

        Ok(Self {
            cache,
            installations,
            services,
        })
    }

    pub fn installations(&self) -> Result<&InstallationSync, ConfigError> {
        self.installations
            .as_ref()
            .ok_or(ConfigError::Missing(INSTALLATION_URL_VAR))
    }

    pub fn services(&self) -> Result<&ServiceSync, ConfigError> {
        self.services
            .as_ref()
            .ok_or(ConfigError::Missing(SERVICE_URL_VAR))
    }

    /// Execute a parsed command and return its JSON rendering.
    pub async fn run(&self, command: Command) -> Result<Value, CommandError> {
        match command.domain {
            Domain::Installation => execute(self.installations()?, command.action).await,
            Domain::Service => execute_service(self.services()?, command.action).await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Installation,
    Service,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    List(Option<String>),
    Get(RecordId),
    Delete(RecordId),
    Stats,
    NextCsr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub domain: Domain,
    pub action: Action,
}

pub const USAGE: &str =
    "usage: sheetsync <installation|service> [list [query] | get <id> | delete <id> | stats | next-csr]";

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
}

impl Command {
    /// Parse arguments (without the program name). A bare domain means `list`.
    pub fn parse<I>(args: I) -> Result<Self, CommandError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();

        let domain = match args.next().as_deref() {
            Some("installation") | Some("installations") => Domain::Installation,
            Some("service") | Some("services") => Domain::Service,
            Some(other) => return Err(CommandError::Usage(format!("unknown domain {other:?}"))),
            None => return Err(CommandError::Usage("missing domain".to_string())),
        };

        let action = match args.next().as_deref() {
            None | Some("list") => {
                let words: Vec<String> = args.by_ref().collect();
                let query = words.join(" ");
                Action::List((!query.trim().is_empty()).then_some(query))
            }
            Some("get") => Action::Get(required_id(args.next())?),
            Some("delete") => Action::Delete(required_id(args.next())?),
            Some("stats") => Action::Stats,
            Some("next-csr") if domain == Domain::Service => Action::NextCsr,
            Some("next-csr") => {
                return Err(CommandError::Usage(
                    "next-csr is only available for service reports".to_string(),
                ));
            }
            Some(other) => return Err(CommandError::Usage(format!("unknown action {other:?}"))),
        };

        if let Some(extra) = args.next() {
            return Err(CommandError::Usage(format!("unexpected argument {extra:?}")));
        }

        Ok(Self { domain, action })
    }
}

fn required_id(arg: Option<String>) -> Result<RecordId, CommandError> {
    arg.as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|_| CommandError::Usage("a record id is required".to_string()))
}

fn render<T: Serialize>(notice: impl Into<String>, body: T) -> Result<Value, CommandError> {
    let notice = notice.into();
    tracing::info!(%notice, "command complete");
    Ok(json!({ "notice": notice, "result": serde_json::to_value(body)? }))
}

async fn execute<R, S>(sync: &RecordSynchronizer<R, S>, action: Action) -> Result<Value, CommandError>
where
    R: Record,
    S: RemoteStore<R>,
{
    match action {
        Action::List(query) => {
            let listing = sync.list(query.as_deref()).await;
            render(listing.notice(), &listing)
        }
        Action::Get(id) => {
            let lookup = sync.fetch(&id).await?;
            let notice = match (&lookup.record, lookup.degraded) {
                (None, _) => format!("{} {id} not found", R::LABEL),
                (Some(_), false) => format!("{} loaded from remote store", R::LABEL),
                (Some(_), true) => format!("{} loaded from local data (remote store unavailable)", R::LABEL),
            };
            render(notice, &lookup)
        }
        Action::Delete(id) => {
            let outcome = sync.delete(&id).await?;
            render(outcome.notice(), &outcome)
        }
        Action::Stats => {
            let listing = sync.list(None).await;
            render(listing.notice(), listing.stats)
        }
        Action::NextCsr => Err(CommandError::Usage(
            "next-csr is only available for service reports".to_string(),
        )),
    }
}

async fn execute_service<S>(sync: &RecordSynchronizer<ServiceReport, S>, action: Action) -> Result<Value, CommandError>
where
    S: RemoteStore<ServiceReport>,
{
    match action {
        Action::NextCsr => {
            let csr_no = sync.next_csr_no().await;
            render(format!("Next CSR number is {csr_no}"), json!({ "csrNo": csr_no }))
        }
        Action::Stats => {
            let listing = sync.list(None).await;
            let service = sheetsync_reports::ServiceStats::compute(&listing.records, Local::now().date_naive());
            render(
                listing.notice(),
                json!({ "collection": listing.stats, "service": service }),
            )
        }
        other => execute(sync, other).await,
    }
}
