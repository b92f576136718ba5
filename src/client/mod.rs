use std::time::Duration;

use bytes::Bytes;
use eyre::{Context as _, Result};
use http_body_util::{BodyExt, Empty};
use hyper::{
    body::Incoming,
    header::{ACCEPT, USER_AGENT},
    Method, Request, Response, Uri,
};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client as HyperClient},
    rt::TokioExecutor,
};
use tokio::time::timeout;

static MY_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

type InnerClient = HyperClient<HttpsConnector<HttpConnector>, Empty<Bytes>>;

/// HTTP client for the medal catalog.
#[derive(Clone)]
pub struct Client {
    client: InnerClient,
    medals_url: Uri,
}

impl Client {
    pub fn new(medals_url: Uri) -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let client = HyperClient::builder(TokioExecutor::new()).build(connector);

        Self { client, medals_url }
    }

    pub fn medals_url(&self) -> &Uri {
        &self.medals_url
    }

    /// Requests the raw medal catalog
    pub async fn get_medals(&self) -> Result<Bytes> {
        self.send_get_request(self.medals_url.clone()).await
    }

    /// Sends a GET request
    async fn send_get_request(&self, url: Uri) -> Result<Bytes> {
        trace!("sending GET request to url {url}");

        let req = Request::builder()
            .uri(url.clone())
            .method(Method::GET)
            .header(USER_AGENT, MY_USER_AGENT)
            .header(ACCEPT, "application/json")
            .body(Empty::new())
            .context("failed to build GET request")?;

        let response = timeout(REQUEST_TIMEOUT, self.client.request(req))
            .await
            .map_err(|_| eyre!("GET request to url {url} timed out"))?
            .context("failed to receive GET response")?;

        Self::error_for_status(response, &url).await
    }

    async fn error_for_status(response: Response<Incoming>, url: &Uri) -> Result<Bytes> {
        let status = response.status();

        ensure!(
            !(status.is_client_error() || status.is_server_error()),
            "failed with status code {status} when requesting url {url}"
        );

        response
            .into_body()
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .context("failed to extract response bytes")
    }
}
