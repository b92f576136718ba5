use std::{env, sync::OnceLock};

use eyre::Result;
use hyper::Uri;
use time::UtcOffset;

static CONFIG: OnceLock<Config> = OnceLock::new();

static DEFAULT_MEDALS_URL: &str = "https://osekai.net/medals/api/medals.php";

pub struct Config {
    pub port: u16,
    pub database: DatabaseConfig,
    pub tokens: Tokens,
    pub medals_url: Uri,
    pub prune_stale_medals: bool,
    /// Offset of log timestamps and stored dates.
    pub local_offset: UtcOffset,
}

pub struct DatabaseConfig {
    pub host: Box<str>,
    pub port: u16,
    pub user: Box<str>,
    pub password: Option<Box<str>>,
    pub database: Box<str>,
}

pub struct Tokens {
    pub osu_client_id: u64,
    pub osu_client_secret: Box<str>,
}

impl Config {
    pub fn get() -> &'static Self {
        CONFIG.get().expect("CONFIG not yet initialized")
    }
}

pub fn init(local_offset: UtcOffset) -> Result<()> {
    if env::var_os("DATABASE_URI").is_some() {
        debug!("env variable `DATABASE_URI` is set but no document store is used; ignoring");
    }

    let config = Config {
        port: env_var_or("PORT", 5000)?,
        database: DatabaseConfig {
            host: env_var("DB_HOST")?,
            port: env_var_or("DB_PORT", 3306)?,
            user: env_var("DB_USER")?,
            password: env_var_opt("DB_PASSWORD")?,
            database: env_var("DB_DATABASE")?,
        },
        tokens: Tokens {
            osu_client_id: env_var("CLIENT_ID")?,
            osu_client_secret: env_var("CLIENT_SECRET")?,
        },
        medals_url: env_var_opt("MEDALS_URL")?
            .unwrap_or_else(|| Uri::from_static(DEFAULT_MEDALS_URL)),
        prune_stale_medals: env_var_or("PRUNE_STALE_MEDALS", false)?,
        local_offset,
    };

    CONFIG
        .set(config)
        .map_err(|_| eyre!("`Config::init` has already been called"))
}

trait EnvKind: Sized {
    const EXPECTED: &'static str;

    fn from_str(s: String) -> Result<Self, String>;
}

macro_rules! env_kind {
    ($($ty:ty: $arg:ident => $impl:block,)*) => {
        $(
            impl EnvKind for $ty {
                const EXPECTED: &'static str = stringify!($ty);

                fn from_str($arg: String) -> Result<Self, String> {
                    $impl
                }
            }
        )*
    };
}

env_kind! {
    Box<str>: s => { Ok(s.into_boxed_str()) },
    u16: s => { s.trim().parse().map_err(|_| s) },
    u64: s => { s.trim().parse().map_err(|_| s) },
    Uri: s => { s.parse().map_err(|_| s) },
    bool: s => {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(s),
        }
    },
}

fn parse_env<T: EnvKind>(name: &'static str, value: String) -> Result<T> {
    T::from_str(value).map_err(|value| {
        eyre!(
            "failed to parse env variable `{name}={value}`; expected {expected}",
            expected = T::EXPECTED
        )
    })
}

fn env_var<T: EnvKind>(name: &'static str) -> Result<T> {
    let value = env::var(name).map_err(|_| eyre!("missing env variable `{name}`"))?;

    parse_env(name, value)
}

fn env_var_opt<T: EnvKind>(name: &'static str) -> Result<Option<T>> {
    env::var(name)
        .ok()
        .map(|value| parse_env(name, value))
        .transpose()
}

fn env_var_or<T: EnvKind>(name: &'static str, default: T) -> Result<T> {
    env_var_opt(name).map(|value| value.unwrap_or(default))
}
