//! Layered configuration resolution.
//!
//! Configuration is assembled by folding partial layers left-to-right:
//! built-in defaults, the optional local `petboard.json`, the first record
//! of the pet-info collection, and the free-text settings block. A later
//! layer overrides a key only when it actually supplies that key; absent
//! keys never blank out an earlier layer's value.

use chrono::NaiveDate;
use notion::{PropertyValue, Record};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::calendar::date_key;

/// Title fragment identifying the pet-info collection.
pub const PET_INFO_MARKER: &str = "Pet Info";

const DEFAULT_PET_NAME: &str = "Milk";

fn default_birth_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2013, 9, 30)
}

/// A configuration layer contributing only the keys it has.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PartialConfig {
    pub pet_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub breed: Option<String>,
    pub weight: Option<String>,
    pub vet_contact: Option<String>,
}

impl PartialConfig {
    /// Overlay a later layer on top of this one, key by key.
    pub fn overlay(self, later: PartialConfig) -> PartialConfig {
        PartialConfig {
            pet_name: later.pet_name.or(self.pet_name),
            birth_date: later.birth_date.or(self.birth_date),
            breed: later.breed.or(self.breed),
            weight: later.weight.or(self.weight),
            vet_contact: later.vet_contact.or(self.vet_contact),
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub pet_name: String,
    pub birth_date: NaiveDate,
    pub breed: Option<String>,
    pub weight: Option<String>,
    pub vet_contact: Option<String>,
}

/// The built-in bottom layer.
pub fn defaults() -> PartialConfig {
    PartialConfig {
        pet_name: Some(DEFAULT_PET_NAME.to_string()),
        birth_date: default_birth_date(),
        ..PartialConfig::default()
    }
}

/// Fold layers onto the defaults, left to right.
pub fn resolve(layers: impl IntoIterator<Item = PartialConfig>) -> Config {
    let merged = layers.into_iter().fold(defaults(), PartialConfig::overlay);
    Config {
        pet_name: merged
            .pet_name
            .unwrap_or_else(|| DEFAULT_PET_NAME.to_string()),
        birth_date: merged
            .birth_date
            .or_else(default_birth_date)
            .unwrap_or_default(),
        breed: merged.breed,
        weight: merged.weight,
        vet_contact: merged.vet_contact,
    }
}

/// Read the local config file layer. A missing file is an empty layer; a
/// parse failure is logged and the layer is skipped, never fatal.
pub fn from_file(path: &Path) -> PartialConfig {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(_) => return PartialConfig::default(),
    };
    match serde_json::from_str(&contents) {
        Ok(layer) => {
            info!(path = %path.display(), "loaded local config layer");
            layer
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unparseable local config, skipping layer");
            PartialConfig::default()
        }
    }
}

/// Build a layer from the first record of the pet-info collection: its
/// title-typed property supplies the name, its date-typed property the
/// birth date.
pub fn from_record(record: &Record) -> PartialConfig {
    let mut layer = PartialConfig::default();

    for value in record.properties.values() {
        match value {
            PropertyValue::Title { text } if !text.is_empty() && layer.pet_name.is_none() => {
                layer.pet_name = Some(text.clone());
            }
            PropertyValue::Date { start: Some(start) } if layer.birth_date.is_none() => {
                match NaiveDate::parse_from_str(&date_key(start), "%Y-%m-%d") {
                    Ok(date) => layer.birth_date = Some(date),
                    Err(e) => {
                        warn!(record = %record.id, value = %start, error = %e,
                            "unparseable birth date on pet record");
                    }
                }
            }
            _ => {}
        }
    }

    layer
}

/// Parse free-text settings lines (`Label: value`) into a layer.
///
/// Only the recognized labels contribute; unknown lines and empty values
/// are ignored. Labels match case-insensitively, values keep their case.
pub fn parse_settings_text(text: &str) -> PartialConfig {
    let mut layer = PartialConfig::default();

    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = label.trim();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        if label.eq_ignore_ascii_case("name") {
            layer.pet_name = Some(value.to_string());
        } else if label.eq_ignore_ascii_case("birthday") {
            match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                Ok(date) => layer.birth_date = Some(date),
                Err(e) => warn!(value = %value, error = %e, "unparseable birthday in settings"),
            }
        } else if label.eq_ignore_ascii_case("breed") {
            layer.breed = Some(value.to_string());
        } else if label.eq_ignore_ascii_case("weight") {
            layer.weight = Some(value.to_string());
        } else if label.eq_ignore_ascii_case("vet contact") {
            layer.vet_contact = Some(value.to_string());
        }
    }

    layer
}
