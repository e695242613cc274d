use std::time::Duration;

use anyhow::Result;
use opentag_spool_sync::{HttpClient, HttpResponse, Method, TransportError};

/// `HttpClient` over reqwest; every call is one independent request.
pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

fn transport_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect
    } else {
        TransportError::Io
    }
}

impl HttpClient for ReqwestHttp {
    async fn request(
        &mut self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, TransportError> {
        let mut req = match method {
            Method::Get => self.client.get(url),
            Method::Put => self.client.put(url),
        };
        if let Some(body) = body {
            req = req
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body.to_vec());
        }

        tracing::debug!(method = method.as_str(), url, "request");
        let resp = req.send().await.map_err(|e| {
            tracing::warn!(url, error = %e, "request failed");
            transport_error(&e)
        })?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| transport_error(&e))?;
        tracing::debug!(status, len = body.len(), "response");
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}
