use std::sync::Arc;

use eyre::{Context as _, Result};
use rosu_v2::Osu;
use tokio::sync::RwLock;

/// osu!api client that can be re-authenticated at runtime.
///
/// Logging in uses the client credentials grant which is limited to the
/// `public` scope.
pub struct OsuAuth {
    client_id: u64,
    client_secret: Box<str>,
    osu: RwLock<Option<Arc<Osu>>>,
}

impl OsuAuth {
    /// Does not log in yet; see [`OsuAuth::login`].
    pub fn new(client_id: u64, client_secret: impl Into<Box<str>>) -> Self {
        Self {
            client_id,
            client_secret: client_secret.into(),
            osu: RwLock::new(None),
        }
    }

    /// Creates a freshly authenticated client and replaces the current one.
    ///
    /// On failure the current client is kept.
    pub async fn login(&self) -> Result<()> {
        let osu = Osu::new(self.client_id, self.client_secret.as_ref())
            .await
            .context("failed to log into the osu!api")?;

        *self.osu.write().await = Some(Arc::new(osu));

        Ok(())
    }

    /// The current client or `None` if no login succeeded yet.
    pub async fn get(&self) -> Option<Arc<Osu>> {
        self.osu.read().await.clone()
    }
}
