//! Responses with single-read bodies.
//!
//! A [`Response`] body can be consumed once. Code that needs to both store
//! a fetched response and hand it to the caller must duplicate it first
//! with [`Response::split_for_cache_and_caller`]; after the body has been
//! read there is nothing left to duplicate.

use serde::{Deserialize, Serialize};

use crate::{Result, SwCacheError};

/// Single-read response body.
#[derive(Debug, Default)]
pub struct Body {
    bytes: Option<Vec<u8>>,
}

impl Body {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    /// Whether the body has been consumed.
    pub fn is_used(&self) -> bool {
        self.bytes.is_none()
    }

    /// Consume the body.
    fn take(&mut self) -> Result<Vec<u8>> {
        self.bytes.take().ok_or(SwCacheError::BodyAlreadyUsed)
    }

    /// Borrow the unread body without consuming it.
    fn peek(&self) -> Result<&[u8]> {
        self.bytes.as_deref().ok_or(SwCacheError::BodyAlreadyUsed)
    }
}

/// A response as returned to the page.
#[derive(Debug)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Body,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::new(body),
        }
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the status is in the 200–299 range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header value matching `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_used(&self) -> bool {
        self.body.is_used()
    }

    /// Read the body. Fails with `BodyAlreadyUsed` on a second read.
    pub fn bytes(&mut self) -> Result<Vec<u8>> {
        self.body.take()
    }

    /// Read the body as UTF-8 (lossy).
    pub fn text(&mut self) -> Result<String> {
        let bytes = self.bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Duplicate an unread response.
    pub fn try_clone(&self) -> Result<Response> {
        let bytes = self.body.peek()?;
        Ok(Response {
            status: self.status,
            headers: self.headers.clone(),
            body: Body::new(bytes),
        })
    }

    /// Split one unread response into `(cache_copy, caller_copy)`.
    ///
    /// Both halves are independent and unread.
    pub fn split_for_cache_and_caller(self) -> Result<(Response, Response)> {
        let copy = self.try_clone()?;
        Ok((copy, self))
    }

    /// Consume into persistable content.
    pub(crate) fn into_stored(mut self) -> Result<StoredResponse> {
        let body = self.body.take()?;
        Ok(StoredResponse {
            status: self.status,
            headers: self.headers,
            body,
        })
    }
}

/// Persisted content of a response.
///
/// Every lookup materialises a fresh, unread [`Response`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl StoredResponse {
    pub fn to_response(&self) -> Response {
        Response {
            status: self.status,
            headers: self.headers.clone(),
            body: Body::new(self.body.clone()),
        }
    }
}
