//! Scripted collaborators for unit tests.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use opentag_tag_codec::{JSON_MIME_TYPE, NDEF_RECORD_HEADER_LEN, TLV_AREA_START, TLV_NDEF_MESSAGE};

use crate::cycle::{Indicator, Outcome, Scale};
use crate::http::{HttpClient, HttpResponse, Method, TransportError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Call {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
}

/// Answers requests from a queue; an exhausted queue means "not connected".
#[derive(Default)]
pub struct MockHttp {
    script: VecDeque<Result<HttpResponse, TransportError>>,
    calls: Vec<Call>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, status: u16, body: Vec<u8>) -> Self {
        self.script.push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn fail(mut self, err: TransportError) -> Self {
        self.script.push_back(Err(err));
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }
}

impl HttpClient for MockHttp {
    async fn request(
        &mut self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
    ) -> Result<HttpResponse, TransportError> {
        self.calls.push(Call {
            method,
            url: String::from(url),
            body: body.map(Vec::from),
        });
        self.script
            .pop_front()
            .unwrap_or(Err(TransportError::NotConnected))
    }
}

pub struct FixedScale(pub u32);

impl Scale for FixedScale {
    async fn read_weight(&mut self) -> u32 {
        self.0
    }
}

#[derive(Default)]
pub struct RecordingIndicator {
    pub signals: Vec<Outcome>,
}

impl Indicator for RecordingIndicator {
    async fn signal(&mut self, outcome: Outcome) {
        self.signals.push(outcome);
    }
}

/// Tag memory holding `json` as a single short-form MIME record.
pub fn tag_with_json(json: &[u8]) -> Vec<u8> {
    let record_len = NDEF_RECORD_HEADER_LEN + JSON_MIME_TYPE.len() + json.len();
    let mut image = Vec::from([0u8; TLV_AREA_START]);
    image.extend_from_slice(&[TLV_NDEF_MESSAGE, record_len as u8]);
    image.extend_from_slice(&[0xD2, JSON_MIME_TYPE.len() as u8, (record_len - 3) as u8]);
    image.extend_from_slice(JSON_MIME_TYPE);
    image.extend_from_slice(json);
    image.push(0xFE);
    image
}
