//! Per-domain response cache and cross-domain invalidation bus.
//!
//! Each data domain (doctor, nurse, admin, ...) owns one [`CacheStore`]:
//! reads are served from memory while fresh, writes always go to the network
//! and mark tagged entries stale. A successful write is announced on the
//! [`InvalidationBus`], which applies the static rule table to the *other*
//! domains' stores before `publish` returns.
//!
//! # Example
//!
//! ```rust,ignore
//! use medflow_cache::{InvalidationBus, InvalidationRule, StoreConfig, Tag};
//!
//! let bus = InvalidationBus::new(vec![InvalidationRule::new(
//!     "doctor",
//!     "approve_recommendation",
//!     "nurse",
//!     Tag::kind("Recommendation"),
//! )])?;
//!
//! let doctor = bus.mount("doctor", executor.clone(), StoreConfig::default())?;
//! let nurse = bus.mount("nurse", executor, StoreConfig::default())?;
//! ```

mod bus;
mod config;
mod error;
mod store;
mod tag;

pub use bus::{BusStats, InvalidationBus, InvalidationEvent, InvalidationRule, PublishReport};
pub use config::StoreConfig;
pub use error::{CacheError, Result};
pub use store::{CacheEntry, CacheStats, CacheStore};
pub use tag::Tag;
