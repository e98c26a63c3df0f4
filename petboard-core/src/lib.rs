//! Pet dashboard engine for a Notion page.
//!
//! This crate provides:
//! - Content-signature discovery of the dashboard's blocks inside an
//!   externally editable page tree
//! - Layered configuration resolution and settings-block schema migration
//! - Aggregation of schema-flexible health-log records into a date-keyed
//!   calendar index
//! - Pure age/season arithmetic and the calendar month-grid projector
//!
//! Everything network-facing goes through the `notion` client crate; the
//! scanner and settings reconciler reach it through the [`scan::BlockSource`]
//! seam so tests can run against an in-memory tree.

pub mod age;
pub mod calendar;
pub mod config;
pub mod letters;
pub mod project;
pub mod scan;
pub mod settings;
pub mod testing;

// Primary public API
pub use age::{compute_age, compute_season, today_at_home, AgeSnapshot, Season, SeasonSnapshot};
pub use calendar::{aggregate, date_key, CalendarEntry, CalendarIndex};
pub use config::{resolve, Config, PartialConfig};
pub use project::{month_view, MonthView, ViewState};
pub use scan::{default_signatures, scan, BlockSource, Role, Signature};
pub use settings::{classify, reconcile, SettingsState};
