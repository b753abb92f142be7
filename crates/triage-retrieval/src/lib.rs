//! Incident Triage Retrieval
//!
//! Loads playbook corpora, infers their categories, keeps the embedding
//! index populated and serves search and lookup to the triage stages.
//!
//! # Overview
//!
//! - **CorpusSource**: where playbooks come from ([`DirectoryCorpus`],
//!   [`StaticCorpus`])
//! - **playbook**: title and section extraction from markdown
//! - **category**: keyword-table category inference
//! - **RetrievalService**: reindex, search, lookup

#![warn(missing_docs)]

pub mod category;
pub mod corpus;
pub mod error;
pub mod playbook;
pub mod service;

// Re-exports
pub use category::{infer_category, CATEGORY_KEYWORDS};
pub use corpus::{CorpusDocument, CorpusSource, DirectoryCorpus, StaticCorpus};
pub use error::RetrievalError;
pub use playbook::{mitigation_excerpt, root_cause_excerpt, PlaybookSection};
pub use service::{ReindexReport, RetrievalService};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for retrieval
    pub use crate::{
        CorpusSource, DirectoryCorpus, RetrievalError, RetrievalService, StaticCorpus,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
