//! Severity levels, incident categories and the classification record
//!
//! Both enumerations are closed: any text outside them is rejected by
//! `FromStr` so callers must decide on a default explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordinal incident impact, most severe first
///
/// The derived `Ord` follows declaration order, so `Sev1 < Sev4` and the
/// *minimum* of two severities is the more severe one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Severity {
    /// Customer-impacting outage
    #[serde(rename = "SEV1")]
    Sev1,
    /// Major degradation
    #[serde(rename = "SEV2")]
    Sev2,
    /// Performance degradation; also the default when the level is unknown
    #[default]
    #[serde(rename = "SEV3")]
    Sev3,
    /// Minor or internal-only
    #[serde(rename = "SEV4")]
    Sev4,
}

impl Severity {
    /// All levels, most severe first
    pub const ALL: [Severity; 4] = [Self::Sev1, Self::Sev2, Self::Sev3, Self::Sev4];

    /// Canonical label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sev1 => "SEV1",
            Self::Sev2 => "SEV2",
            Self::Sev3 => "SEV3",
            Self::Sev4 => "SEV4",
        }
    }

    /// Numeric level (1 = most severe)
    #[inline]
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Self::Sev1 => 1,
            Self::Sev2 => 2,
            Self::Sev3 => 3,
            Self::Sev4 => 4,
        }
    }

    /// One level more severe, saturating at SEV1
    #[inline]
    #[must_use]
    pub fn escalate(self) -> Self {
        match self {
            Self::Sev1 | Self::Sev2 => Self::Sev1,
            Self::Sev3 => Self::Sev2,
            Self::Sev4 => Self::Sev3,
        }
    }

    /// Whether `self` is strictly more severe than `other`
    #[inline]
    #[must_use]
    pub fn is_more_severe_than(self, other: Self) -> bool {
        self < other
    }

    /// The more severe of two levels
    #[inline]
    #[must_use]
    pub fn most_severe(self, other: Self) -> Self {
        self.min(other)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownLabel(trimmed.to_string()))
    }
}

/// Incident and playbook category
///
/// Classification may only produce the first eight variants
/// ([`Category::CLASSIFIABLE`]); `General` is reserved for playbooks that
/// match no keyword during indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Relational stores, connection pools, queries
    #[serde(rename = "Database")]
    Database,
    /// REST APIs, microservices, auth, gateways
    #[serde(rename = "API/Service")]
    ApiService,
    /// Compute, memory, disk, orchestration platforms
    #[serde(rename = "Infrastructure")]
    Infrastructure,
    /// DNS, firewalls, load balancers
    #[serde(rename = "Network")]
    Network,
    /// Certificates, authentication, intrusion
    #[serde(rename = "Security")]
    Security,
    /// Latency and throughput
    #[serde(rename = "Performance")]
    Performance,
    /// Queues, streams, ETL
    #[serde(rename = "Data Pipeline")]
    DataPipeline,
    /// Client-side applications
    #[serde(rename = "Frontend")]
    Frontend,
    /// Playbooks with no recognisable category
    #[serde(rename = "General")]
    General,
}

impl Category {
    /// Closed set a classification may produce
    pub const CLASSIFIABLE: [Category; 8] = [
        Self::Database,
        Self::ApiService,
        Self::Infrastructure,
        Self::Network,
        Self::Security,
        Self::Performance,
        Self::DataPipeline,
        Self::Frontend,
    ];

    /// Fallback when a generated category is outside the closed set
    pub const DEFAULT_CLASSIFICATION: Category = Self::Infrastructure;

    /// Canonical label
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Database => "Database",
            Self::ApiService => "API/Service",
            Self::Infrastructure => "Infrastructure",
            Self::Network => "Network",
            Self::Security => "Security",
            Self::Performance => "Performance",
            Self::DataPipeline => "Data Pipeline",
            Self::Frontend => "Frontend",
            Self::General => "General",
        }
    }

    /// Whether classification may produce this category
    #[inline]
    #[must_use]
    pub fn is_classifiable(self) -> bool {
        !matches!(self, Self::General)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::CLASSIFIABLE
            .into_iter()
            .chain(std::iter::once(Self::General))
            .find(|cat| cat.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownLabel(trimmed.to_string()))
    }
}

/// Label outside a closed enumeration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label: '{0}'")]
pub struct UnknownLabel(pub String);

/// Severity/category judgment for one incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Impact level
    pub severity: Severity,
    /// Incident category (always classifiable)
    pub category: Category,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Explanation of the judgment
    pub reasoning: String,
    /// Coercions and escalations applied after generation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Classification {
    /// Create classification; confidence is clamped to [0, 1]
    #[must_use]
    pub fn new(
        severity: Severity,
        category: Category,
        confidence: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            confidence: clamp_unit(confidence),
            reasoning: reasoning.into(),
            warnings: Vec::new(),
        }
    }

    /// Record a post-generation adjustment
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Clamp to [0, 1], mapping NaN to 0
#[inline]
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
