use std::{collections::HashSet, str::FromStr, time::Duration};

use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::debug;
use url::Url;

use crate::{DEFAULT_TIMEOUT_MS, error::Result, form::FormPart};

/// Everything needed for one multipart POST. Built once per call.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    url: String,
    headers: Vec<(String, String)>,
    parts: Vec<FormPart>,
    timeout: Duration,
}

impl UploadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: vec![],
            parts: vec![],
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn part(mut self, part: FormPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn parts(mut self, parts: impl IntoIterator<Item = FormPart>) -> Self {
        self.parts.extend(parts);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_ms(self, timeout_ms: u64) -> Self {
        self.timeout(Duration::from_millis(timeout_ms))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Checks the request invariants without touching the network.
    pub fn validate(self) -> Result<ValidatedRequest> {
        let url = Url::parse(&self.url)
            .map_err(|err| invalid_request!("invalid url `{}`: {err}", self.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid_request!(
                "unsupported url scheme `{}`, expect http or https",
                url.scheme()
            ));
        }
        if !url.has_host() {
            return Err(invalid_request!("url `{}` has no host", self.url));
        }

        if self.parts.is_empty() {
            return Err(invalid_request!("request has no form parts"));
        }
        let mut names = HashSet::with_capacity(self.parts.len());
        for (idx, part) in self.parts.iter().enumerate() {
            if part.name().is_empty() {
                return Err(invalid_request!("form part #{idx} has an empty name"));
            }
            if !names.insert(part.name()) {
                return Err(invalid_request!(
                    "duplicate form part name `{}`",
                    part.name()
                ));
            }
        }

        if self.timeout.is_zero() {
            return Err(invalid_request!("timeout must be positive"));
        }

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            let header_name = HeaderName::from_str(&name)
                .map_err(|err| invalid_request!("invalid header name `{name}`: {err}"))?;
            if header_name == CONTENT_TYPE || header_name == CONTENT_LENGTH {
                debug!("drop caller header `{header_name}`, it is computed from the body");
                continue;
            }
            let header_value = HeaderValue::from_str(&value)
                .map_err(|err| invalid_request!("invalid value for header `{name}`: {err}"))?;
            headers.append(header_name, header_value);
        }

        Ok(ValidatedRequest {
            url,
            headers,
            parts: self.parts,
            timeout: self.timeout,
        })
    }
}

/// An `UploadRequest` that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub parts: Vec<FormPart>,
    pub timeout: Duration,
}
