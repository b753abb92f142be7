//! Incident Triage Model
//!
//! Plain data types shared by every layer of the triage pipeline.
//!
//! # Overview
//!
//! - **IncidentAlert / IncidentContext**: validated caller input
//! - **Severity / Category / Classification**: closed enumerations and the
//!   classification judgment
//! - **DocumentRecord / RetrievalResult**: indexed playbooks and search hits
//! - **RootCauseAnalysis / MitigationPlan**: intermediate stage outputs
//! - **TriageResult**: the terminal record of one run
//!
//! # Example
//!
//! ```rust
//! use triage_model::{IncidentAlert, IncidentContext, Severity};
//!
//! let alert = IncidentAlert::new(
//!     "INC-1",
//!     "2024-01-15T10:30:00Z",
//!     "prometheus",
//!     "Auth service down",
//!     "Login endpoint returning 503",
//! )
//! .with_service("auth-service")
//! .with_metric("failed_requests_per_min", 450.0);
//!
//! let ctx = IncidentContext::new(alert).unwrap().with_logs("Connection refused");
//! assert_eq!(ctx.incident_id(), "INC-1");
//! assert!(Severity::Sev1.is_more_severe_than(Severity::Sev2));
//! ```

#![warn(missing_docs)]

pub mod alert;
pub mod analysis;
pub mod classification;
pub mod document;
pub mod error;
pub mod result;

// Re-exports
pub use alert::{truncate_chars, IncidentAlert, IncidentContext};
pub use analysis::{
    EscalationPolicy, InvestigationStep, MitigationAction, MitigationPlan, RootCauseAnalysis,
    RootCauseFinding,
};
pub use classification::{clamp_unit, Category, Classification, Severity, UnknownLabel};
pub use document::{DocumentRecord, GroundingReference, RetrievalResult};
pub use error::ValidationError;
pub use result::TriageResult;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for triage data types
    pub use crate::{
        Category, Classification, DocumentRecord, IncidentAlert, IncidentContext, MitigationPlan,
        RetrievalResult, RootCauseAnalysis, Severity, TriageResult, ValidationError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
