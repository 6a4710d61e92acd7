//! # scroll2study Core Library
//!
//! This library provides the tracking core for scroll2study, a short-video
//! study app. Catalog videos sit in a grid of (subject, complexity level)
//! cells; the core records which cells a user watched, keeps a
//! consecutive-day study streak, and unlocks milestone achievements.
//! The `scroll2study` CLI is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Profile**: the per-user document, decoded fail-closed and written
//!   back as JSON merge patches
//! - **Catalog**: subjects, levels, videos and the grid index over them
//! - **Progress / Streak / Achievements**: pure rules over the profile
//! - **Storage**: SQLite-backed document store and TOML configuration
//! - **Service**: the tracking operations bound to a signed-in session
//!
//! ## Key Components
//!
//! - [`StudyService`]: Entry point for every tracking operation
//! - [`GridIndex`]: (subject, level) lookup over the active catalog
//! - [`SqliteStore`]: Profile, progress and catalog persistence
//! - [`Config`]: Application configuration management

pub mod achievements;
pub mod ai;
pub mod auth;
pub mod catalog;
pub mod collection;
pub mod error;
pub mod profile;
pub mod progress;
pub mod service;
pub mod snapshot;
pub mod storage;
pub mod streak;

pub use achievements::{Achievement, AchievementCategory, SessionOutcome, StudySession, TrackingRules};
pub use auth::{Identity, IdentityProvider, LocalIdentityProvider, SessionHandle};
pub use catalog::{Catalog, CatalogItem, DuplicatePolicy, GridIndex};
pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use profile::{UserId, UserProfile};
pub use progress::{ProgressMap, ProgressRecord};
pub use service::{StudyService, WatchOutcome};
pub use storage::{Config, MemoryStore, ProfileStore, SqliteStore};
pub use streak::{StreakState, StreakTransition};
