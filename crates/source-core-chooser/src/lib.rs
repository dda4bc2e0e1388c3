#![warn(missing_docs)]
//! Source Core Chooser - candidate disambiguation for source-core
//!
//! # Overview
//!
//! When a reference resolves to more than one target, the [`CandidateChooser`] orders the
//! targets and asks a [`CandidatePicker`] (typically a UI prompt) to pick one. The ordering
//! uses two keys:
//!
//! 1. structural [`Proximity`] to the reference: same file, same module, same library,
//!    unrelated
//! 2. how often the candidate was picked for the same reference shape before, read from a
//!    [`StatisticsStore`]
//!
//! A single candidate is bound directly without consulting the statistics.
//!
//! Users may also exclude namespace prefixes. The chooser only records exclusions in an
//! [`ExclusionStore`]; the component that builds candidate sets applies them.
//!
//! # Quick Start
//!
//! ```rust
//! use source_core_chooser::{
//!     Candidate, CandidateChooser, FirstPicker, MemorySettingsStore, MemoryStatisticsStore,
//!     ReferenceSite,
//! };
//! use std::sync::Arc;
//!
//! let chooser = CandidateChooser::new(
//!     Arc::new(MemoryStatisticsStore::new()),
//!     Arc::new(MemorySettingsStore::new()),
//! );
//! let site = ReferenceSite::new("Target", "pkg.a");
//! let candidates = [Candidate::new("pkg.b.Target"), Candidate::new("pkg.a.Target")];
//!
//! let chosen = chooser.choose(&site, &candidates, &mut FirstPicker).unwrap();
//! assert_eq!(chosen.unwrap().qualified_name, "pkg.a.Target");
//! ```
//!
//! # Module Description
//!
//! - [`candidate`]: reference sites, candidates, proximity
//! - [`chooser`]: ranking and selection
//! - [`stats`]: usage statistics stores
//! - [`settings`]: exclusion list and its stores
//! - [`error`]: error types

pub mod candidate;
pub mod chooser;
pub mod error;
pub mod settings;
pub mod stats;

pub use candidate::{Candidate, Proximity, ReferenceSite};
pub use chooser::{CandidateChooser, CandidatePicker, FirstPicker, RankedCandidate};
pub use error::{ChooserError, StoreError};
pub use settings::{
    ChooserSettings, ExclusionStore, JsonSettingsStore, MemorySettingsStore, exclusion_choices,
};
pub use stats::{JsonStatisticsStore, MemoryStatisticsStore, StatisticsStore, UseSignature};
