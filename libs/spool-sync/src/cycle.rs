//! One synchronization cycle, from "tag present" to a signalled outcome.
//!
//! Steps run strictly in order (read, decode, resolve, weigh, submit) and the
//! first failure ends the cycle. Nothing is carried over to the next cycle.

use opentag_led_effects::{BlinkPattern, Color};
use opentag_tag_codec::{EnvelopeError, NdefEnvelope, TagTransport};

use crate::config::SyncConfig;
use crate::http::HttpClient;
use crate::identity::{self, ResolveError};
use crate::record::{self, DecodeStatus, ParseError, SpoolRecord};
use crate::tag::read_tag_json;
use crate::weight::{self, SyncStatus};

/// Terminal state of a cycle, listed in the order failures are detected.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    TagUnreadable,
    InvalidRecord,
    UnresolvedIdentity,
    SyncRejected,
    SyncSucceeded,
}

impl Outcome {
    pub const fn pattern(self) -> BlinkPattern {
        match self {
            Outcome::TagUnreadable => BlinkPattern::new(Color::Cyan, 2),
            Outcome::InvalidRecord => BlinkPattern::new(Color::Purple, 2),
            Outcome::UnresolvedIdentity => BlinkPattern::new(Color::Yellow, 2),
            Outcome::SyncRejected => BlinkPattern::new(Color::Red, 4),
            Outcome::SyncSucceeded => BlinkPattern::new(Color::White, 4),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::TagUnreadable => "tag-unreadable",
            Outcome::InvalidRecord => "tag-invalid",
            Outcome::UnresolvedIdentity => "identity-unresolved",
            Outcome::SyncRejected => "sync-rejected",
            Outcome::SyncSucceeded => "success",
        }
    }

    pub const fn is_success(self) -> bool {
        matches!(self, Outcome::SyncSucceeded)
    }
}

/// Why a cycle stopped short of [`Outcome::SyncSucceeded`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleError {
    Envelope(EnvelopeError),
    Parse(ParseError),
    /// The record decoded but carries no identity.
    InvalidRecord,
    Resolve(ResolveError),
    /// Any non-success submission status.
    Sync(SyncStatus),
}

impl From<CycleError> for Outcome {
    fn from(err: CycleError) -> Self {
        match err {
            CycleError::Envelope(_) => Outcome::TagUnreadable,
            CycleError::Parse(_) | CycleError::InvalidRecord => Outcome::InvalidRecord,
            CycleError::Resolve(_) => Outcome::UnresolvedIdentity,
            CycleError::Sync(_) => Outcome::SyncRejected,
        }
    }
}

impl From<EnvelopeError> for CycleError {
    fn from(err: EnvelopeError) -> Self {
        CycleError::Envelope(err)
    }
}

impl From<ParseError> for CycleError {
    fn from(err: ParseError) -> Self {
        CycleError::Parse(err)
    }
}

impl From<ResolveError> for CycleError {
    fn from(err: ResolveError) -> Self {
        CycleError::Resolve(err)
    }
}

/// Gross weight currently on the platform, in grams, already clamped at zero.
pub trait Scale {
    async fn read_weight(&mut self) -> u32;
}

/// User-visible feedback; receives exactly one outcome per cycle.
pub trait Indicator {
    async fn signal(&mut self, outcome: Outcome);
}

/// Everything a cycle learned before it ended.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub outcome: Outcome,
    pub envelope: Option<NdefEnvelope>,
    pub record: Option<SpoolRecord>,
    pub catalog_id: Option<u32>,
    pub weight_grams: Option<u32>,
    pub error: Option<CycleError>,
}

impl CycleReport {
    fn empty() -> Self {
        Self {
            outcome: Outcome::TagUnreadable,
            envelope: None,
            record: None,
            catalog_id: None,
            weight_grams: None,
            error: None,
        }
    }
}

/// Owns the collaborators of one accessory and runs cycles against them.
pub struct SyncEngine<T, H, S, I> {
    tag: T,
    http: H,
    scale: S,
    indicator: I,
    config: SyncConfig,
}

impl<T, H, S, I> SyncEngine<T, H, S, I>
where
    T: TagTransport,
    H: HttpClient,
    S: Scale,
    I: Indicator,
{
    pub fn new(tag: T, http: H, scale: S, indicator: I, config: SyncConfig) -> Self {
        Self {
            tag,
            http,
            scale,
            indicator,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Swap in the tag that just entered the field.
    pub fn set_tag(&mut self, tag: T) {
        self.tag = tag;
    }

    pub fn tag(&self) -> &T {
        &self.tag
    }

    pub fn http(&self) -> &H {
        &self.http
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    pub fn into_parts(self) -> (T, H, S, I) {
        (self.tag, self.http, self.scale, self.indicator)
    }

    /// Run one cycle to its terminal state and signal it.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::empty();
        report.outcome = match self.drive(&mut report).await {
            Ok(()) => Outcome::SyncSucceeded,
            Err(err) => {
                warn!("cycle failed: {:?}", err);
                report.error = Some(err);
                Outcome::from(err)
            }
        };
        info!("cycle outcome: {}", report.outcome.as_str());
        self.indicator.signal(report.outcome).await;
        report
    }

    async fn drive(&mut self, report: &mut CycleReport) -> Result<(), CycleError> {
        let (envelope, json) = read_tag_json(&mut self.tag, &self.config.envelope).await?;
        report.envelope = Some(envelope);

        let record = record::decode_tag_json(&json)?;
        let status = record.decode_status;
        let record = report.record.insert(record);
        if status == DecodeStatus::Invalid {
            return Err(CycleError::InvalidRecord);
        }

        let catalog_id = identity::resolve(&mut self.http, &self.config, record).await?;
        report.catalog_id = Some(catalog_id);

        let weight_grams = self.scale.read_weight().await;
        report.weight_grams = Some(weight_grams);

        match weight::submit(&mut self.http, &self.config, catalog_id, weight_grams).await {
            SyncStatus::Success => Ok(()),
            status => Err(CycleError::Sync(status)),
        }
    }
}
