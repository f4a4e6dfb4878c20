use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::multipart::{Form, Part};
use reqwest::{header, StatusCode, Url};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::endpoints::auth::REFRESH_PATH;
use crate::request::{ApiRequest, FieldValue, MultipartForm, RequestBody};
use crate::TransportError;

/// A response that reached the client, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends one request. An `Err` means no response arrived.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> impl Future<Output = Result<RawResponse, TransportError>> + Send;
}

/// Cookie jar that also remembers the path each cookie was set on, which
/// reqwest's `Jar` does not hand back.
#[derive(Default)]
struct PathJar {
    jar: Jar,
    paths: Mutex<HashMap<String, String>>,
}

impl PathJar {
    fn path_of(&self, name: &str) -> Option<String> {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

impl CookieStore for PathJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<&HeaderValue> = cookie_headers.collect();
        {
            let mut paths = self.paths.lock().unwrap_or_else(PoisonError::into_inner);
            for raw in headers.iter().filter_map(|value| value.to_str().ok()) {
                if let Some((name, path)) = cookie_path(raw, url) {
                    paths.insert(name, path);
                }
            }
        }
        self.jar.set_cookies(&mut headers.into_iter(), url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

/// Name and effective path of a `Set-Cookie` value.
fn cookie_path(set_cookie: &str, url: &Url) -> Option<(String, String)> {
    let mut parts = set_cookie.split(';').map(str::trim);
    let (name, _) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let path = parts
        .filter_map(|attribute| attribute.split_once('='))
        .filter(|(key, _)| key.trim().eq_ignore_ascii_case("path"))
        .map(|(_, value)| value.trim())
        .filter(|value| value.starts_with('/'))
        .last()
        .map(str::to_owned)
        .unwrap_or_else(|| default_path(url));
    Some((name.to_string(), path))
}

/// RFC 6265 default-path: the request path up to its last `/`.
fn default_path(url: &Url) -> String {
    match url.path().rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(last) => url.path()[..last].to_string(),
    }
}

/// reqwest-backed transport. The refresh credential lives in its cookie jar.
/// Clone is cheap - reqwest::Client and the jar are shared.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    jar: Arc<PathJar>,
}

impl HttpTransport {
    /// `timeout` of `None` keeps reqwest's defaults.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let jar = Arc::new(PathJar::default());
        let mut builder = reqwest::Client::builder().cookie_provider(jar.clone());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            jar,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn refresh_url(&self) -> Option<Url> {
        Url::parse(&self.url(REFRESH_PATH)).ok()
    }

    /// Cookies that would accompany a refresh call, as a `Cookie` header value.
    pub fn refresh_cookie(&self) -> Option<String> {
        let url = self.refresh_url()?;
        self.jar
            .cookies(&url)?
            .to_str()
            .ok()
            .map(str::to_owned)
    }

    /// The refresh cookies in the form `restore_refresh_cookies` takes back:
    /// one cookie per line, each with the path the backend set it on.
    pub fn saved_refresh_cookies(&self) -> Option<String> {
        let header = self.refresh_cookie()?;
        let lines: Vec<String> = header
            .split(';')
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let name = pair.split_once('=').map_or(pair, |(name, _)| name);
                match self.jar.path_of(name) {
                    Some(path) => format!("{pair}; Path={path}"),
                    None => pair.to_string(),
                }
            })
            .collect();
        Some(lines.join("\n"))
    }

    /// Seed the jar with cookies saved by an earlier process.
    ///
    /// Lines carrying a `Path` go back on that path, so the cookie the backend
    /// rotates on refresh replaces them. A bare `Cookie` header has no paths
    /// and is scoped to the whole origin.
    pub fn restore_refresh_cookies(&self, saved: &str) {
        let Some(url) = self.refresh_url() else {
            tracing::warn!(base_url = %self.base_url, "Cannot restore cookies for invalid base URL");
            return;
        };

        let mut cookies = Vec::new();
        for line in saved.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if has_path(line) {
                cookies.push(line.to_string());
            } else {
                cookies.extend(
                    line.split(';')
                        .map(str::trim)
                        .filter(|pair| !pair.is_empty())
                        .map(|pair| format!("{pair}; Path=/")),
                );
            }
        }

        let values: Vec<HeaderValue> = cookies
            .iter()
            .filter_map(|cookie| match HeaderValue::from_str(cookie) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable saved cookie");
                    None
                }
            })
            .collect();
        self.jar.set_cookies(&mut values.iter(), &url);
    }
}

fn has_path(cookie: &str) -> bool {
    cookie
        .split(';')
        .skip(1)
        .filter_map(|attribute| attribute.split_once('='))
        .any(|(key, _)| key.trim().eq_ignore_ascii_case("path"))
}

impl Transport for HttpTransport {
    async fn execute(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<RawResponse, TransportError> {
        let url = self.url(&request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(header::CACHE_CONTROL, "no-cache");

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(form) => builder.multipart(multipart_form(form)?),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        tracing::trace!(%status, url = %url, "Response received");

        Ok(RawResponse { status, body })
    }
}

fn multipart_form(form: &MultipartForm) -> Result<Form, TransportError> {
    let mut multipart = Form::new();
    for field in form.fields() {
        multipart = match &field.value {
            FieldValue::Text(text) => multipart.text(field.name.clone(), text.clone()),
            FieldValue::File(attachment) => {
                let part = Part::bytes(attachment.bytes.clone())
                    .file_name(attachment.file_name.clone())
                    .mime_str(&attachment.content_type)?;
                multipart.part(field.name.clone(), part)
            }
        };
    }
    Ok(multipart)
}
