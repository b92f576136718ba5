use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    future::Future,
    time::Duration,
};

use chrono::{DateTime, Local, Utc};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Interval inbetween two osu!api logins
pub const AUTH_REFRESH_INTERVAL: Duration = DAY;

/// Cron expression for 00:00:00 every day.
pub const MIDNIGHT: &str = "0 0 0 * * *";

/// Creates a job that runs `f` every day at local midnight.
///
/// The timezone rules are applied on every tick so daylight saving changes
/// do not shift the trigger.
pub fn daily_at_midnight<F, Fut>(mut f: F) -> Result<Job, JobSchedulerError>
where
    F: FnMut() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Job::new_async_tz(MIDNIGHT, Local, move |job_id, scheduler| {
        let fut = f();

        Box::pin(async move {
            fut.await;
            log_next_tick(scheduler, job_id).await;
        })
    })
}

pub async fn log_next_tick(mut scheduler: JobScheduler, job_id: Uuid) {
    match scheduler.next_tick_for_job(job_id).await {
        Ok(Some(next)) => info!(
            "Next medal sync starts in {} ({})",
            Countdown::until(next),
            next.with_timezone(&Local).format("%F %T %:z"),
        ),
        Ok(None) => warn!("Medal sync job has no upcoming tick"),
        Err(err) => warn!("Failed to determine next medal sync: {err}"),
    }
}

/// Displays a duration as hours, minutes, and seconds e.g. `3h12m5s`.
pub struct Countdown(pub Duration);

impl Countdown {
    pub fn until(datetime: DateTime<Utc>) -> Self {
        Self((datetime - Utc::now()).to_std().unwrap_or_default())
    }
}

impl Display for Countdown {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut secs = self.0.as_secs();

        let hours = secs / 3600;
        secs %= 3600;

        let minutes = secs / 60;
        secs %= 60;

        if hours > 0 {
            write!(f, "{hours}h{minutes}m")?;
        } else if minutes > 0 {
            write!(f, "{minutes}m")?;
        }

        write!(f, "{secs}s")
    }
}
