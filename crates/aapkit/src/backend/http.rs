//! HTTP backend for a live platform.
//!
//! This module provides [`HttpBackend`], a blocking client for the
//! `api/v2` inventory, group and host endpoints.
//!
//! # Pagination
//!
//! List endpoints return pages of results with a `next` link. The backend
//! follows `next` until it is exhausted or `max_pages` pages have been read,
//! whichever comes first. Hitting the bound logs a warning and returns what
//! was collected.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{
    AssociationRequest, Group, GroupRequest, Host, HostRequest, Inventory, InventoryRequest, Page,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Status codes the platform uses for success.
const SUCCESS_CODES: [u16; 4] = [200, 201, 202, 204];

/// Default API path below the host URL.
pub const DEFAULT_API_PREFIX: &str = "api/v2/";

/// Default bound on pages read per list call.
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Blocking HTTP backend.
///
/// # Example
///
/// ```no_run
/// use aapkit::backend::Backend;
/// use aapkit::backend::http::HttpBackend;
///
/// let backend = HttpBackend::builder("https://aap.example.com")
///     .basic_auth("admin", "secret")
///     .build()
///     .unwrap();
/// let groups = backend.list_inventory_groups(3).unwrap();
/// println!("Found {} groups", groups.len());
/// ```
pub struct HttpBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Host URL, always ending in `/`.
    host_url: String,
    /// API path below the host, always ending in `/`.
    api_prefix: String,
    /// Precomputed `Authorization` header value.
    authorization: Option<String>,
    /// Bound on pages read per list call.
    max_pages: usize,
}

/// Builder for [`HttpBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackendBuilder {
    host: String,
    api_prefix: String,
    credentials: Option<(String, String)>,
    insecure_skip_verify: bool,
    timeout: Option<Duration>,
    max_pages: usize,
}

impl HttpBackendBuilder {
    /// Authenticate every request with HTTP basic auth.
    #[must_use]
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Skip TLS certificate verification.
    #[must_use]
    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }

    /// Overall timeout for each request.
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Bound on pages read per list call. `1` reads only the first page.
    #[must_use]
    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// API path below the host, e.g. `api/controller/v2/` behind a gateway.
    #[must_use]
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = prefix.into();
        self
    }

    /// Build the backend.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the host is not an http(s) URL.
    pub fn build(self) -> Result<HttpBackend> {
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(Error::InvalidUrl(format!(
                "host must start with http:// or https://, got {:?}",
                self.host
            )));
        }

        let tls = ureq::tls::TlsConfig::builder()
            .disable_verification(self.insecure_skip_verify)
            .build();
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(self.timeout)
            .tls_config(tls)
            .build();

        Ok(HttpBackend {
            agent: ureq::Agent::new_with_config(config),
            host_url: with_trailing_slash(&self.host),
            api_prefix: with_trailing_slash(self.api_prefix.trim_start_matches('/')),
            authorization: self
                .credentials
                .map(|(user, pass)| basic_auth_header(&user, &pass)),
            max_pages: self.max_pages,
        })
    }
}

impl HttpBackend {
    /// Start building a backend for the given host URL.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> HttpBackendBuilder {
        HttpBackendBuilder {
            host: host.into(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            credentials: None,
            insecure_skip_verify: false,
            timeout: None,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Get the host URL (with trailing slash).
    #[must_use]
    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    /// Build an endpoint URL from a path relative to the API prefix.
    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.host_url, self.api_prefix, path)
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let request = request.header("Accept", "application/json");
        match &self.authorization {
            Some(value) => request.header("Authorization", value),
            None => request,
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        log::trace!("GET {url}");
        let response = self.authorize(self.agent.get(url)).call()?;
        let body = read_success(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn post_json<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T> {
        log::trace!("POST {url}");
        let response = self.authorize(self.agent.post(url)).send_json(body)?;
        let body = read_success(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn put_json<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T> {
        log::trace!("PUT {url}");
        let response = self.authorize(self.agent.put(url)).send_json(body)?;
        let body = read_success(response)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// POST to an association endpoint; the platform answers 204 with no body.
    fn associate(&self, url: &str, body: AssociationRequest) -> Result<()> {
        log::trace!("POST {url} {body:?}");
        let response = self.authorize(self.agent.post(url)).send_json(body)?;
        read_success(response).map(|_| ())
    }

    fn delete(&self, url: &str) -> Result<()> {
        log::trace!("DELETE {url}");
        let response = self.authorize(self.agent.delete(url)).call()?;
        read_success(response).map(|_| ())
    }

    /// Collect every result of a paged list endpoint.
    fn list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        collect_pages(&self.host_url, &self.url(path), self.max_pages, |url| self.get_json(url))
    }
}

impl Backend for HttpBackend {
    fn create_inventory(&self, request: &InventoryRequest) -> Result<Inventory> {
        self.post_json(&self.url("inventories/"), request)
    }

    fn get_inventory(&self, id: i64) -> Result<Inventory> {
        self.get_json(&self.url(&format!("inventories/{id}/")))
    }

    fn update_inventory(&self, id: i64, request: &InventoryRequest) -> Result<Inventory> {
        self.put_json(&self.url(&format!("inventories/{id}/")), request)
    }

    fn delete_inventory(&self, id: i64) -> Result<()> {
        self.delete(&self.url(&format!("inventories/{id}/")))
    }

    fn create_group(&self, request: &GroupRequest) -> Result<Group> {
        self.post_json(&self.url("groups/"), request)
    }

    fn get_group(&self, id: i64) -> Result<Group> {
        self.get_json(&self.url(&format!("groups/{id}/")))
    }

    fn update_group(&self, id: i64, request: &GroupRequest) -> Result<Group> {
        self.put_json(&self.url(&format!("groups/{id}/")), request)
    }

    fn delete_group(&self, id: i64) -> Result<()> {
        self.delete(&self.url(&format!("groups/{id}/")))
    }

    fn list_group_children(&self, id: i64) -> Result<Vec<Group>> {
        self.list(&format!("groups/{id}/children/"))
    }

    fn list_inventory_groups(&self, inventory_id: i64) -> Result<Vec<Group>> {
        self.list(&format!("inventories/{inventory_id}/groups/"))
    }

    fn create_host(&self, request: &HostRequest) -> Result<Host> {
        self.post_json(&self.url("hosts/"), request)
    }

    fn get_host(&self, id: i64) -> Result<Host> {
        self.get_json(&self.url(&format!("hosts/{id}/")))
    }

    fn update_host(&self, id: i64, request: &HostRequest) -> Result<Host> {
        self.put_json(&self.url(&format!("hosts/{id}/")), request)
    }

    fn delete_host(&self, id: i64) -> Result<()> {
        self.delete(&self.url(&format!("hosts/{id}/")))
    }

    fn list_host_groups(&self, id: i64) -> Result<Vec<Group>> {
        self.list(&format!("hosts/{id}/groups/"))
    }

    fn list_inventory_hosts(&self, inventory_id: i64) -> Result<Vec<Host>> {
        self.list(&format!("inventories/{inventory_id}/hosts/"))
    }

    fn add_child_to_group(&self, parent_id: i64, child_id: i64) -> Result<()> {
        self.associate(
            &self.url(&format!("groups/{parent_id}/children/")),
            AssociationRequest::associate(child_id),
        )
    }

    fn remove_child_from_group(&self, parent_id: i64, child_id: i64) -> Result<()> {
        self.associate(
            &self.url(&format!("groups/{parent_id}/children/")),
            AssociationRequest::disassociate(child_id),
        )
    }

    fn add_group_to_host(&self, host_id: i64, group_id: i64) -> Result<()> {
        self.associate(
            &self.url(&format!("hosts/{host_id}/groups/")),
            AssociationRequest::associate(group_id),
        )
    }

    fn remove_group_from_host(&self, host_id: i64, group_id: i64) -> Result<()> {
        self.associate(
            &self.url(&format!("hosts/{host_id}/groups/")),
            AssociationRequest::disassociate(group_id),
        )
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Read the body and map non-success statuses to `Error::Status`.
fn read_success(mut response: ureq::http::Response<ureq::Body>) -> Result<String> {
    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string()?;
    if SUCCESS_CODES.contains(&status) {
        Ok(body)
    } else {
        Err(Error::status(status, body))
    }
}

fn with_trailing_slash(s: &str) -> String {
    if s.is_empty() || s.ends_with('/') {
        s.to_string()
    } else {
        format!("{s}/")
    }
}

fn basic_auth_header(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// Scheme and authority of a URL, e.g. `https://aap.example.com:8443`.
fn origin(url: &str) -> &str {
    let after_scheme = url.find("://").map_or(0, |i| i + 3);
    match url[after_scheme..].find('/') {
        Some(i) => &url[..after_scheme + i],
        None => url,
    }
}

/// Turn a `next` link into an absolute URL.
///
/// The platform returns links relative to the server root
/// (`/api/v2/groups/?page=2`); some proxies rewrite them to absolute URLs or
/// bare query strings.
fn resolve_next(host_url: &str, current: &str, next: &str) -> String {
    if next.starts_with("http://") || next.starts_with("https://") {
        next.to_string()
    } else if next.starts_with('/') {
        format!("{}{}", origin(host_url), next)
    } else if next.starts_with('?') {
        let path = current.split('?').next().unwrap_or(current);
        format!("{path}{next}")
    } else {
        format!("{host_url}{next}")
    }
}

/// Follow `next` links from `first`, reading at most `max_pages` pages.
///
/// A `next` link pointing at a different origin than `host_url` is refused:
/// every request carries the configured credentials.
fn collect_pages<T, F>(
    host_url: &str,
    first: &str,
    max_pages: usize,
    mut fetch: F,
) -> Result<Vec<T>>
where
    F: FnMut(&str) -> Result<Page<T>>,
{
    let mut url = first.to_string();
    let mut results = Vec::new();

    for page_number in 1..=max_pages {
        let page = fetch(&url)?;
        results.extend(page.results);

        let Some(next) = page.next.filter(|n| !n.is_empty()) else {
            break;
        };
        if page_number == max_pages {
            log::warn!(
                "Stopped reading {first} after {page_number} pages; {} of {} results collected",
                results.len(),
                page.count
            );
            break;
        }

        let next_url = resolve_next(host_url, &url, &next);
        if !origin(&next_url).eq_ignore_ascii_case(origin(host_url)) {
            return Err(Error::InvalidResponse(format!(
                "next page link {next_url} leaves {}",
                origin(host_url)
            )));
        }
        url = next_url;
    }

    Ok(results)
}
