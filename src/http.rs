//! HTTP session seam for the provider portal
//!
//! The login flow only needs two primitives: fetch a page and send a form.
//! Both live behind [`HttpSession`] so every transition of the flow can be
//! driven by canned pages in tests. [`ReqwestSession`] is the production
//! implementation: a cookie-storing reqwest client that trusts the pinned
//! bundle and follows redirects.

use crate::config::ProviderConfig;
use crate::error::{HydroError, Result};
use crate::logging::StructuredLogger;
use crate::logging::get_logger;
use crate::trust::TrustBundle;
use reqwest::Url;
use std::collections::BTreeMap;
use std::time::Duration;

/// Maximum number of redirects followed for a single request
const MAX_REDIRECTS: usize = 10;

/// A fetched page after all redirects were followed
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL of the response
    pub url: Url,
    /// HTTP status code of the final response
    pub status: u16,
    /// Response body decoded as text
    pub body: String,
}

impl Page {
    pub fn new(url: Url, status: u16, body: impl Into<String>) -> Self {
        Self {
            url,
            status,
            body: body.into(),
        }
    }
}

/// Cookie-bearing HTTP client state owned by one login flow
#[async_trait::async_trait]
pub trait HttpSession: Send {
    /// GET a URL, following redirects
    async fn get(&mut self, url: &Url) -> Result<Page>;

    /// Send form fields with the given method, following redirects
    ///
    /// `GET` sends the fields as the query string, every other method sends
    /// them url-encoded in the body.
    async fn send_form(
        &mut self,
        method: &str,
        url: &Url,
        fields: &BTreeMap<String, String>,
    ) -> Result<Page>;
}

/// Production session backed by reqwest
pub struct ReqwestSession {
    client: reqwest::Client,
    logger: StructuredLogger,
}

impl ReqwestSession {
    /// Build a fresh session with an empty cookie jar
    pub fn new(provider: &ProviderConfig, trust: &TrustBundle) -> Result<Self> {
        let builder = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(provider.request_timeout_secs))
            .user_agent(provider.user_agent.clone());
        let client = trust.apply(builder).build()?;
        Ok(Self {
            client,
            logger: get_logger("http"),
        })
    }

    async fn finish(&self, response: reqwest::Response) -> Result<Page> {
        let url = response.url().clone();
        let status = response.status().as_u16();
        let body = response.text().await?;
        self.logger.debug(&format!(
            "Response {} from {} ({} bytes)",
            status,
            url,
            body.len()
        ));
        Ok(Page { url, status, body })
    }
}

#[async_trait::async_trait]
impl HttpSession for ReqwestSession {
    async fn get(&mut self, url: &Url) -> Result<Page> {
        self.logger.debug(&format!("GET {}", url));
        let response = self.client.get(url.clone()).send().await?;
        self.finish(response).await
    }

    async fn send_form(
        &mut self,
        method: &str,
        url: &Url,
        fields: &BTreeMap<String, String>,
    ) -> Result<Page> {
        let method = reqwest::Method::from_bytes(method.as_bytes()).map_err(|_| {
            HydroError::structural(format!("Form declares unusable method '{}'", method))
        })?;
        self.logger.debug(&format!(
            "{} {} with {} field(s)",
            method,
            url,
            fields.len()
        ));
        let request = self.client.request(method.clone(), url.clone());
        let request = if method == reqwest::Method::GET {
            request.query(fields)
        } else {
            request.form(fields)
        };
        let response = request.send().await?;
        self.finish(response).await
    }
}
