use log::{debug, info, warn};

use election_results::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::sync::Arc;

use text_diff::print_diff;

pub mod auth;
pub mod config_reader;
pub mod local_cache;
pub mod remote_store;
pub mod summary;
pub mod sync_engine;

use crate::live::auth::{Authorization, CredentialCheck};
use crate::live::config_reader::*;
use crate::live::local_cache::{FileCache, LocalCache, MemoryCache};
use crate::live::remote_store::{HttpDocumentStore, StoreError};
use crate::live::summary::{build_summary_js, read_summary};
use crate::live::sync_engine::{EngineError, SyncEngine};

#[derive(Debug, Snafu)]
pub enum LiveError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}: {source}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("refreshIntervalSecs must be a positive number of seconds"))]
    InvalidRefreshInterval {},
    #[snafu(display("Error setting up the remote store: {source}"))]
    RemoteStore { source: StoreError },
    #[snafu(display("Cannot read the vote {arg:?}, expected <candidate id>=<votes>"))]
    VoteArgument { arg: String },
    #[snafu(display("This command requires --user and --password"))]
    MissingCredentials {},
    #[snafu(display(
        "Cannot read the stored results, refusing to record over the built-in dataset"
    ))]
    NoStoredState {},
    #[snafu(display("{source}"))]
    Engine { source: EngineError },
    #[snafu(display("Difference detected between the summary and the reference summary"))]
    ReferenceMismatch {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type LiveResult<T> = Result<T, LiveError>;

pub fn open_engine(config: &LiveConfig) -> LiveResult<Arc<SyncEngine>> {
    let remote = HttpDocumentStore::new(&config.remote_store).context(RemoteStoreSnafu {})?;
    let cache: Arc<dyn LocalCache> = match config.cache_dir() {
        Some(dir) => {
            let fc = FileCache::new(dir, &config.cache_key());
            info!("open_engine: local cache at {:?}", fc.path());
            Arc::new(fc)
        }
        None => {
            info!("open_engine: no cache path, keeping the backup in memory");
            Arc::new(MemoryCache::new())
        }
    };
    Ok(Arc::new(SyncEngine::new(Arc::new(remote), cache)))
}

/// Reads `id=votes` arguments. Negative numbers are accepted here: they are
/// treated as zero when the entry is validated.
pub fn parse_vote_args(args: &[String]) -> LiveResult<ProposedVotes> {
    let mut res = ProposedVotes::new();
    for arg in args.iter() {
        let (id, count) = match arg.split_once('=') {
            Some((id, count)) if !id.trim().is_empty() => (id.trim(), count.trim()),
            _ => return VoteArgumentSnafu { arg: arg.clone() }.fail(),
        };
        let count: i64 = match count.parse() {
            Ok(x) => x,
            Err(_) => return VoteArgumentSnafu { arg: arg.clone() }.fail(),
        };
        res.insert(id.to_string(), count);
    }
    Ok(res)
}

fn login(
    config: &LiveConfig,
    user: &Option<String>,
    password: &Option<String>,
) -> LiveResult<Authorization> {
    let (user, password) = match (user, password) {
        (Some(u), Some(p)) => (u, p),
        _ => return MissingCredentialsSnafu {}.fail(),
    };
    match CredentialCheck::from_config(config) {
        Some(check) => Ok(check.login(user, password)),
        None => {
            warn!("login: no operator is configured, nobody can change the results");
            Ok(Authorization::Anonymous)
        }
    }
}

fn report_degraded(engine: &SyncEngine) {
    let status = engine.status();
    if status.degraded {
        warn!("The remote store refused access: the results are only stored locally");
    } else if let Some(e) = status.last_error {
        warn!("The results could not be synchronized: {}", e);
    }
}

pub async fn run_show(
    config_path: &str,
    out: Option<String>,
    reference: Option<String>,
) -> LiveResult<()> {
    let config = read_config(config_path)?;
    let engine = open_engine(&config)?;
    engine.load().await;
    report_degraded(&engine);

    let snapshot = engine.snapshot();
    let summary_js = build_summary_js(&snapshot);
    let pretty_js_summary =
        serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu { path: "summary" })?;

    match out.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js_summary),
        Some(path) => {
            fs::write(path, &pretty_js_summary).context(WritingSummarySnafu { path })?;
            info!("run_show: summary written to {}", path);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = reference {
        let summary_ref = read_summary(&summary_p)?;
        debug!("run_show: reference: {:?}", summary_ref);
        let pretty_js_summary_ref = serde_json::to_string_pretty(&summary_ref)
            .context(ParsingJsonSnafu { path: summary_p })?;
        if pretty_js_summary_ref != pretty_js_summary {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_summary.as_str(),
                "\n",
            );
            return ReferenceMismatchSnafu {}.fail();
        }
    }
    Ok(())
}

pub async fn run_enter(
    config_path: &str,
    seat_id: &str,
    center_id: u32,
    votes: &[String],
    invalid_votes: i64,
    user: &Option<String>,
    password: &Option<String>,
) -> LiveResult<()> {
    let config = read_config(config_path)?;
    let proposed = parse_vote_args(votes)?;
    let auth = login(&config, user, password)?;
    let engine = open_engine(&config)?;
    // Start from the latest shared state, not from the local backup.
    let source = engine.load().await;
    info!("run_enter: results loaded from {:?}", source);
    // Saving on top of the built-in dataset would erase the stored results.
    ensure!(source.is_stored_state(), NoStoredStateSnafu {});

    let entry = engine
        .submit_center_update(&auth, seat_id, center_id, &proposed, invalid_votes)
        .await
        .context(EngineSnafu {})?;
    report_degraded(&engine);

    let snapshot = engine.snapshot();
    let fill = snapshot
        .seat(seat_id)
        .and_then(|s| s.center(center_id))
        .map(|c| entry.fill_percentage(c.total_voters))
        .unwrap_or(0.0);
    println!(
        "{} center {}: {} votes recorded ({} invalid), {:.2}% of the registered voters",
        seat_id, center_id, entry.total_entered, entry.invalid_votes, fill
    );
    Ok(())
}

pub async fn run_reset(
    config_path: &str,
    user: &Option<String>,
    password: &Option<String>,
) -> LiveResult<()> {
    let config = read_config(config_path)?;
    let auth = login(&config, user, password)?;
    let engine = open_engine(&config)?;
    engine.reset(&auth).await.context(EngineSnafu {})?;
    report_degraded(&engine);
    println!("All the results were reset");
    Ok(())
}

/// Loads the results, then refreshes them periodically and prints every status
/// change until Ctrl-C.
pub async fn run_watch(config_path: &str) -> LiveResult<()> {
    let config = read_config(config_path)?;
    let period = config.refresh_interval()?;
    let engine = open_engine(&config)?;
    let mut status_rx = engine.subscribe_status();

    engine.load().await;
    let task = engine.spawn_refresh_task(period);
    info!("run_watch: refreshing every {:?}", period);

    let res = loop {
        let status = status_rx.borrow_and_update().clone();
        match serde_json::to_string(&status) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("run_watch: cannot print the status: {}", e),
        }
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                break signal.whatever_context("Cannot listen for Ctrl-C");
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
        }
    };
    info!("run_watch: stopping");
    task.shutdown().await;
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    // Nothing listens on the discard port: every request fails right away.
    fn offline_config(dir: &std::path::Path) -> String {
        let path = dir.join("livetally.json");
        let js = serde_json::json!({
            "remoteStore": {
                "baseUrl": "http://127.0.0.1:9/v1/documents",
                "collection": "results",
                "documentId": "tangail",
                "timeoutSecs": 2
            },
            "localCache": { "path": dir.join("cache").display().to_string() },
            "adminUser": "operator",
            "adminPasswordSha256": "2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b"
        });
        fs::write(&path, js.to_string()).unwrap();
        path.display().to_string()
    }

    #[test]
    fn vote_args() {
        let votes = parse_vote_args(&args(&["t1-pa=812", " t1-nf = 40", "t1-in=-3"])).unwrap();
        assert_eq!(votes.get("t1-pa"), Some(&812));
        assert_eq!(votes.get("t1-nf"), Some(&40));
        assert_eq!(votes.get("t1-in"), Some(&-3));
    }

    #[test]
    fn bad_vote_args() {
        for bad in ["t1-pa", "=3", "t1-pa=lots"] {
            let res = parse_vote_args(&args(&[bad]));
            assert!(matches!(res, Err(LiveError::VoteArgument { .. })), "{}", bad);
        }
    }

    #[test]
    fn credentials() {
        let mut config = parse_config(
            r#"{"remoteStore": {"baseUrl": "http://x", "collection": "c", "documentId": "d"}}"#,
            "test.json",
        )
        .unwrap();
        let user = Some("operator".to_string());
        let password = Some("secret".to_string());

        assert!(matches!(
            login(&config, &user, &None),
            Err(LiveError::MissingCredentials {})
        ));
        assert_eq!(
            login(&config, &user, &password).unwrap(),
            Authorization::Anonymous
        );

        config.admin_user = user.clone();
        config.admin_password_sha256 =
            Some("2bb80d537b1da3e38bd30361aa855686bde0eacd7162fef6a25fe97bf527a25b".to_string());
        assert_eq!(
            login(&config, &user, &password).unwrap(),
            Authorization::Authenticated
        );
    }

    #[tokio::test]
    async fn show_checks_reference() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = offline_config(dir.path());
        let out = dir.path().join("summary.json").display().to_string();
        let reference = dir.path().join("reference.json");

        let expected = build_summary_js(&default_snapshot());
        fs::write(&reference, serde_json::to_string(&expected).unwrap()).unwrap();
        run_show(
            &config_path,
            Some(out.clone()),
            Some(reference.display().to_string()),
        )
        .await
        .unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written, expected);

        fs::write(&reference, "{\"seats\": []}").unwrap();
        let res = run_show(
            &config_path,
            Some(out),
            Some(reference.display().to_string()),
        )
        .await;
        assert!(matches!(res, Err(LiveError::ReferenceMismatch {})));
    }

    fn backup(dir: &std::path::Path) -> FileCache {
        FileCache::new(dir.join("cache"), DEFAULT_CACHE_KEY)
    }

    async fn enter(config_path: &str, password: &str) -> LiveResult<()> {
        run_enter(
            config_path,
            "tangail-1",
            1,
            &args(&["t1-pa=10", "t1-nf=5"]),
            1,
            &Some("operator".to_string()),
            &Some(password.to_string()),
        )
        .await
    }

    #[tokio::test]
    async fn enter_without_stored_results_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = offline_config(dir.path());

        let res = enter(&config_path, "secret").await;

        assert!(matches!(res, Err(LiveError::NoStoredState {})));
        // Nothing was saved, not even locally.
        assert_eq!(backup(dir.path()).get(), None);
    }

    #[tokio::test]
    async fn enter_from_local_backup() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = offline_config(dir.path());
        let votes: VoteMap = [("t2-pa".to_string(), 40)].into_iter().collect();
        let stored = apply_center_update(&default_snapshot(), "tangail-2", 2, &votes, 0);
        backup(dir.path()).set(&stored).unwrap();

        enter(&config_path, "secret").await.unwrap();

        let saved = backup(dir.path()).get().unwrap();
        let center = saved.seat("tangail-1").unwrap().center(1).unwrap();
        assert!(center.is_reported);
        assert_eq!(center.votes.get("t1-pa"), Some(&10));
        assert_eq!(saved.seat("tangail-2"), stored.seat("tangail-2"));
    }

    #[tokio::test]
    async fn enter_with_wrong_password_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = offline_config(dir.path());
        backup(dir.path()).set(&default_snapshot()).unwrap();

        let res = enter(&config_path, "not the secret").await;
        assert!(matches!(
            res,
            Err(LiveError::Engine {
                source: EngineError::Unauthorized {}
            })
        ));
    }
}
