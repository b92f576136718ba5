use std::fmt::Result as FmtResult;

use time::{format_description::FormatItem, macros::format_description, UtcOffset};
use tracing::{metadata::LevelFilter, Event, Subscriber};
use tracing_appender::{
    non_blocking::{NonBlocking, WorkerGuard},
    rolling,
};
use tracing_subscriber::{
    filter::Directive,
    fmt::{
        format::Writer,
        time::{FormatTime, OffsetTime},
        FmtContext, FormatEvent, FormatFields, Layer,
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer as _,
};

static TIMESTAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Targets that are too chatty on their default level.
static QUIET_TARGETS: [&str; 3] = ["sqlx=warn", "hyper_util=info", "rosu_v2=info"];

/// Timestamps are written in `offset` so they line up with the daily sync.
pub fn init(quiet: bool, offset: UtcOffset) -> WorkerGuard {
    let stdout_layer = Layer::default().event_format(EventFormat::new(offset, false));

    let file_appender = rolling::daily("./logs", "medal-sync.log");
    let (file_writer, guard) = NonBlocking::new(file_appender);

    let file_layer = Layer::default()
        .event_format(EventFormat::new(offset, true))
        .with_writer(file_writer);

    let stdout_filter = if quiet {
        EnvFilter::default()
    } else {
        filter(LevelFilter::INFO)
    };

    tracing_subscriber::registry()
        .with(stdout_layer.with_filter(stdout_filter))
        .with(file_layer.with_filter(filter(LevelFilter::DEBUG)))
        .init();

    guard
}

fn filter(default: LevelFilter) -> EnvFilter {
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    QUIET_TARGETS
        .iter()
        .filter_map(|target| target.parse::<Directive>().ok())
        .fold(filter, EnvFilter::add_directive)
}

struct EventFormat {
    timer: OffsetTime<&'static [FormatItem<'static>]>,
    /// Whether to include the source location
    location: bool,
}

impl EventFormat {
    fn new(offset: UtcOffset, location: bool) -> Self {
        Self {
            timer: OffsetTime::new(offset, TIMESTAMP),
            location,
        }
    }
}

impl<S, N> FormatEvent<S, N> for EventFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> FmtResult {
        self.timer.format_time(&mut writer)?;
        let metadata = event.metadata();

        write!(writer, " {:>5} ", metadata.level())?;

        if self.location {
            write!(
                writer,
                "[{}:{}] ",
                metadata.file().unwrap_or_else(|| metadata.target()),
                metadata.line().unwrap_or(0),
            )?;
        }

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}: ", span.name())?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
