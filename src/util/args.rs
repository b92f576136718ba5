use clap::Parser;

pub struct Args {
    pub port: Option<u16>,
    pub quiet: bool,
    pub sync_once: bool,
}

impl Args {
    pub fn parse() -> Self {
        let ArgsCli {
            port,
            quiet,
            sync_once,
        } = ArgsCli::parse();

        Self {
            port,
            quiet,
            sync_once,
        }
    }
}

#[derive(Parser)]
#[clap(author, about = DESCRIPTION)]
struct ArgsCli {
    #[clap(short, long, value_name = "PORT")]
    /// Port to listen on; overrides the `PORT` env variable
    port: Option<u16>,
    #[clap(short, long, action)]
    /// Set this if no logs should be displayed
    quiet: bool,
    #[clap(long, action)]
    /// Run a single medal sync and exit without serving HTTP
    sync_once: bool,
}

pub static DESCRIPTION: &str = r#"
Serves medal data over HTTP and keeps the `medals` table
in sync with the osekai medal catalog.

Schedule:
  - The catalog is synced once on startup and then every
      day at midnight (local time).
  - The osu! API login is refreshed every 24 hours."#;
