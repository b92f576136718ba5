use std::time::Instant;

use eyre::{Context as _, Result};
use futures_util::{stream, StreamExt};
use time::{OffsetDateTime, UtcOffset};
use tokio::sync::{Mutex, RwLock};

use crate::{
    client::Client,
    database::MedalStore,
    model::{Medal, RawMedal, RecordFailure, SyncReport, SyncSummary},
};

/// Upper bound on how much of an undeserializable body ends up in an error.
const BODY_PREVIEW_LEN: usize = 256;

/// Fetches the medal catalog and writes it into a [`MedalStore`].
pub struct MedalSync<S> {
    client: Client,
    store: S,
    prune_stale: bool,
    /// Offset that stored dates are expressed in
    local_offset: UtcOffset,
    /// Maximum amount of concurrent writes
    concurrency: usize,
    running: Mutex<()>,
    last: RwLock<Option<SyncSummary>>,
}

impl<S: MedalStore> MedalSync<S> {
    pub fn new(client: Client, store: S, concurrency: usize) -> Self {
        Self {
            client,
            store,
            prune_stale: false,
            local_offset: UtcOffset::UTC,
            concurrency: concurrency.max(1),
            running: Mutex::new(()),
            last: RwLock::new(None),
        }
    }

    /// Whether medals that are no longer in the catalog get deleted after a
    /// complete cycle.
    pub fn prune_stale(mut self, prune_stale: bool) -> Self {
        self.prune_stale = prune_stale;

        self
    }

    pub fn local_offset(mut self, local_offset: UtcOffset) -> Self {
        self.local_offset = local_offset;

        self
    }

    pub async fn last_summary(&self) -> Option<SyncSummary> {
        self.last.read().await.clone()
    }

    /// Runs a sync cycle.
    ///
    /// Returns `None` without doing anything if another cycle is still in
    /// progress.
    pub async fn run(&self) -> Option<Result<SyncReport>> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Medal sync is already in progress; skipping");

            return None;
        };

        let started_at = OffsetDateTime::now_utc();
        let start = Instant::now();

        let res = self.sync().await;
        let elapsed = start.elapsed();

        let summary = match res {
            Ok(ref report) => SyncSummary::finished(started_at, elapsed, report),
            Err(ref err) => SyncSummary::failed(started_at, elapsed, err),
        };

        *self.last.write().await = Some(summary);

        Some(res)
    }

    async fn sync(&self) -> Result<SyncReport> {
        let medals = self.fetch_medals().await?;
        debug!("Received {} medals from {}", medals.len(), self.client.medals_url());

        self.store
            .ensure_schema()
            .await
            .context("failed to prepare medals table")?;

        let mut report = SyncReport::new(medals.len());

        let mut outcomes = stream::iter(0..medals.len())
            .map(|index| {
                let medal = &medals[index];

                async move {
                    let res = self.store.replace_medal(medal).await;

                    (index, medal, res)
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some((index, medal, res)) = outcomes.next().await {
            match res {
                Ok(_) => report.stored += 1,
                Err(error) => report.failures.push(RecordFailure {
                    index,
                    medal_id: medal.medal_id,
                    error,
                }),
            }
        }

        // Failures arrive in completion order
        report.failures.sort_unstable_by_key(|failure| failure.index);

        if self.prune_stale {
            report.pruned = self.prune(&medals, &report).await;
        }

        Ok(report)
    }

    /// Requests the catalog and coerces each record.
    pub async fn fetch_medals(&self) -> Result<Vec<Medal>> {
        let bytes = self
            .client
            .get_medals()
            .await
            .context("failed to request medals")?;

        let raw: Vec<RawMedal> = serde_json::from_slice(&bytes).with_context(|| {
            let text = String::from_utf8_lossy(&bytes);
            let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();

            format!("failed to deserialize medals: {preview}")
        })?;

        let medals = raw
            .iter()
            .map(|raw| Medal::from_raw(raw, self.local_offset))
            .collect();

        Ok(medals)
    }

    async fn prune(&self, medals: &[Medal], report: &SyncReport) -> Option<u64> {
        if report.fetched == 0 || !report.is_complete() {
            warn!("Skipping pruning of stale medals since not all medals were stored");

            return None;
        }

        let keep: Vec<_> = medals.iter().filter_map(|medal| medal.medal_id).collect();

        match self.store.prune_medals(&keep).await {
            Ok(pruned) => Some(pruned),
            Err(err) => {
                error!("{:?}", err.wrap_err("Failed to prune stale medals"));

                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{routing::get, Json, Router};
    use hyper::Uri;
    use serde_json::{json, Value};
    use time::macros::{datetime, offset};
    use tokio::net::TcpListener;

    use crate::database::memory::MemoryStore;

    use super::*;

    async fn serve(app: Router) -> Uri {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        format!("http://{addr}/medals/api/medals.php").parse().unwrap()
    }

    async fn upstream(body: Value) -> Uri {
        let app = Router::new().route(
            "/medals/api/medals.php",
            get(move || {
                let body = body.clone();

                async move { Json(body) }
            }),
        );

        serve(app).await
    }

    fn medal_sync(url: Uri, store: MemoryStore, prune: bool) -> MedalSync<MemoryStore> {
        MedalSync::new(Client::new(url), store, 4).prune_stale(prune)
    }

    #[tokio::test]
    async fn stores_coerced_record() {
        let url = upstream(json!([{ "MedalID": "5", "Name": "Test", "Locked": "1" }])).await;
        let sync = medal_sync(url, MemoryStore::default(), false);

        let report = sync.run().await.unwrap().unwrap();

        assert_eq!(report.fetched, 1);
        assert_eq!(report.stored, 1);
        assert!(report.failures.is_empty());

        let rows = sync.store.rows();
        assert_eq!(rows.len(), 1);

        let medal = &rows[&5];
        assert_eq!(medal.medal_id, Some(5));
        assert_eq!(medal.name.as_deref(), Some("Test"));
        assert!(medal.locked);
        assert!(!medal.solution_found);
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let catalog = json!([
            { "MedalID": "1", "Name": "One", "Rarity": "12.5", "Date": "2014-05-28" },
            { "MedalID": "2", "Name": "Two", "SolutionFound": 1, "Ordering": "3" },
        ]);

        let url = upstream(catalog).await;
        let sync = medal_sync(url, MemoryStore::default(), false);

        sync.run().await.unwrap().unwrap();
        let first = sync.store.rows();

        let report = sync.run().await.unwrap().unwrap();
        let second = sync.store.rows();

        assert_eq!(report.stored, 2);
        assert_eq!(first, second);
        assert_eq!(second.len(), 2);
    }

    #[tokio::test]
    async fn invalid_id_does_not_halt_batch() {
        let catalog = json!([
            { "MedalID": "abc", "Name": "Broken" },
            { "MedalID": "2", "Name": "Fine" },
        ]);

        let url = upstream(catalog).await;
        let sync = medal_sync(url, MemoryStore::default(), false);

        let report = sync.run().await.unwrap().unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.stored, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(report.failures[0].medal_id, None);
        assert!(sync.store.rows().contains_key(&2));
    }

    #[tokio::test]
    async fn write_failures_are_collected() {
        let catalog = json!([
            { "MedalID": "1" },
            { "MedalID": "2" },
            { "MedalID": "3" },
            { "MedalID": "4" },
        ]);

        let url = upstream(catalog).await;
        let sync = medal_sync(url, MemoryStore::failing([2, 4]), false);

        let report = sync.run().await.unwrap().unwrap();

        assert_eq!(report.stored, 2);
        assert!(!report.is_complete());

        let failed: Vec<_> = report.failures.iter().map(|f| f.medal_id).collect();
        assert_eq!(failed, [Some(2), Some(4)]);

        let stored: Vec<_> = sync.store.rows().into_keys().collect();
        assert_eq!(stored, [1, 3]);
    }

    #[tokio::test]
    async fn unreachable_upstream_fails_cycle() {
        let url = Uri::from_static("http://127.0.0.1:1/medals/api/medals.php");
        let sync = medal_sync(url, MemoryStore::default(), false);

        assert!(sync.run().await.unwrap().is_err());
        assert!(matches!(
            sync.last_summary().await,
            Some(SyncSummary::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn non_array_body_fails_cycle() {
        let url = upstream(json!({ "error": "maintenance" })).await;
        let sync = medal_sync(url, MemoryStore::default(), false);

        let err = sync.run().await.unwrap().unwrap_err();

        assert!(format!("{err:?}").contains("failed to deserialize medals"));
        assert!(sync.store.rows().is_empty());
    }

    #[tokio::test]
    async fn overlapping_run_is_skipped() {
        let app = Router::new().route(
            "/medals/api/medals.php",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(100)).await;

                Json(json!([{ "MedalID": "1" }]))
            }),
        );

        let url = serve(app).await;
        let sync = medal_sync(url, MemoryStore::default(), false);

        let (first, second) = tokio::join!(sync.run(), sync.run());

        assert!(first.unwrap().is_ok());
        assert!(second.is_none());

        // the guard is released afterwards
        assert!(sync.run().await.is_some());
    }

    #[tokio::test]
    async fn prunes_stale_medals_after_complete_cycle() {
        let url = upstream(json!([{ "MedalID": "1" }, { "MedalID": "2" }])).await;
        let store = MemoryStore::default();
        store.replace_medal(&stale_medal(99)).await.unwrap();

        let sync = medal_sync(url, store, true);
        let report = sync.run().await.unwrap().unwrap();

        assert_eq!(report.pruned, Some(1));

        let stored: Vec<_> = sync.store.rows().into_keys().collect();
        assert_eq!(stored, [1, 2]);
    }

    #[tokio::test]
    async fn keeps_stale_medals_after_partial_cycle() {
        let url = upstream(json!([{ "MedalID": "1" }, { "MedalID": "2" }])).await;
        let store = MemoryStore::failing([2]);
        store.replace_medal(&stale_medal(99)).await.unwrap();

        let sync = medal_sync(url, store, true);
        let report = sync.run().await.unwrap().unwrap();

        assert_eq!(report.pruned, None);
        assert!(sync.store.rows().contains_key(&99));
    }

    #[tokio::test]
    async fn keeps_stale_medals_without_pruning() {
        let url = upstream(json!([{ "MedalID": "1" }])).await;
        let store = MemoryStore::default();
        store.replace_medal(&stale_medal(99)).await.unwrap();

        let sync = medal_sync(url, store, false);
        let report = sync.run().await.unwrap().unwrap();

        assert_eq!(report.pruned, None);
        assert_eq!(sync.store.rows().len(), 2);
    }

    #[tokio::test]
    async fn remembers_last_summary() {
        let url = upstream(json!([{ "MedalID": "1" }, { "MedalID": "x" }])).await;
        let sync = medal_sync(url, MemoryStore::default(), false);

        assert!(sync.last_summary().await.is_none());

        sync.run().await.unwrap().unwrap();

        match sync.last_summary().await {
            Some(SyncSummary::Finished {
                fetched,
                stored,
                failed,
                ..
            }) => {
                assert_eq!(fetched, 2);
                assert_eq!(stored, 1);
                assert_eq!(failed, 1);
            }
            other => panic!("unexpected summary {other:?}"),
        }
    }

    #[tokio::test]
    async fn stores_dates_in_local_offset() {
        let catalog = json!([{
            "MedalID": "1",
            "Date": "2014-05-28T11:45:00Z",
            "FirstAchievedDate": "2014-05-28 13:45:00.250",
        }]);

        let url = upstream(catalog).await;
        let sync = medal_sync(url, MemoryStore::default(), false).local_offset(offset!(+2));

        sync.run().await.unwrap().unwrap();

        let medal = &sync.store.rows()[&1];
        assert_eq!(medal.date, Some(datetime!(2014-05-28 13:45:00)));
        assert_eq!(
            medal.first_achieved_date,
            Some(datetime!(2014-05-28 13:45:00.250))
        );
    }

    fn stale_medal(medal_id: i32) -> Medal {
        let raw = RawMedal {
            medal_id: json!(medal_id),
            ..Default::default()
        };

        Medal::from_raw(&raw, UtcOffset::UTC)
    }
}
