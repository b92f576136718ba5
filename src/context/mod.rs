use std::sync::Arc;

use eyre::{Context as _, Result};
use tokio::time::{interval, MissedTickBehavior};
use tokio_cron_scheduler::JobScheduler;
use tracing::Instrument;

use crate::{
    client::Client,
    config::Config,
    database::Database,
    schedule::{self, AUTH_REFRESH_INTERVAL},
};

pub use self::{medal::MedalSync, osu::OsuAuth};

mod medal;
mod osu;

/// Everything the background jobs and the HTTP handlers share.
pub struct Context {
    pub db: Database,
    pub medals: MedalSync<Database>,
    pub osu: OsuAuth,
}

impl Context {
    pub fn new(config: &Config, db: Database) -> Self {
        let client = Client::new(config.medals_url.clone());
        let concurrency = db.max_connections() as usize;
        let medals = MedalSync::new(client, db.clone(), concurrency)
            .prune_stale(config.prune_stale_medals)
            .local_offset(config.local_offset);

        let osu = OsuAuth::new(
            config.tokens.osu_client_id,
            config.tokens.osu_client_secret.clone(),
        );

        Self {
            db,
            medals,
            osu,
        }
    }

    pub async fn login(&self) {
        match self.osu.login().await {
            Ok(_) => info!("Logged into the osu!api"),
            Err(err) => error!("{:?}", err.wrap_err("Failed to log into the osu!api")),
        }
    }

    /// Runs a single medal sync and logs its outcome.
    pub async fn sync_medals(&self) {
        self.sync_medals_().instrument(info_span!("sync")).await
    }

    async fn sync_medals_(&self) {
        info!("Starting medal sync");

        let Some(res) = self.medals.run().await else {
            return;
        };

        match res {
            Ok(report) => {
                for failure in report.failures.iter() {
                    match failure.medal_id {
                        Some(medal_id) => warn!(
                            "Failed to store medal {medal_id} (#{}): {:?}",
                            failure.index, failure.error
                        ),
                        None => warn!(
                            "Failed to store medal #{}: {:?}",
                            failure.index, failure.error
                        ),
                    }
                }

                if report.failures.is_empty() {
                    info!("Successfully {report}");
                } else {
                    warn!("Partially finished medal sync: {report}");
                }
            }
            Err(err) => error!("{:?}", err.wrap_err("Failed to sync medals")),
        }
    }

    /// Schedules a medal sync every day at local midnight.
    ///
    /// Overlapping syncs are skipped by [`MedalSync`].
    pub async fn schedule_daily_sync(self: Arc<Self>) -> Result<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .context("failed to create scheduler")?;

        let job = schedule::daily_at_midnight(move || {
            let ctx = Arc::clone(&self);

            async move { ctx.sync_medals().await }
        })
        .context("failed to create daily medal sync job")?;

        let job_id = scheduler
            .add(job)
            .await
            .context("failed to add daily medal sync job")?;

        scheduler
            .start()
            .await
            .context("failed to start scheduler")?;

        schedule::log_next_tick(scheduler.clone(), job_id).await;

        Ok(scheduler)
    }

    /// Logs into the osu!api again in regular intervals.
    ///
    /// The initial login is expected to have happened already.
    pub async fn refresh_login(self: Arc<Self>) {
        let mut interval = interval(AUTH_REFRESH_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            self.login().await;
        }
    }
}
