//! Clouded Deals - daily cannabis deal feed for Las Vegas dispensaries
//!
//! This library turns scraped product rows into a capped, filterable deal
//! feed, personalizes it from anonymous save history, and tracks badges.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{apply_diversity_caps, derive_preferences, normalize_product, DealFeed, DealFilter};
pub use crate::models::{Deal, DiversityCaps, PersonalizedDeal, RawProduct, ScoringWeights, UserPreferences};
