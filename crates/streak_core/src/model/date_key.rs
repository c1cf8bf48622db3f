//! `yyyy-MM-dd` date keys, the calendar identity used by completions,
//! exclusions and the streak guard.

use crate::error::AppError;
use serde::{Deserialize, Deserializer, Serializer};
use time::Date;
use time::format_description::FormatItem;
use time::macros::format_description;

const DATE_KEY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn format_date_key(date: Date) -> String {
    date.format(DATE_KEY_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

pub fn parse_date_key(raw: &str) -> Result<Date, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("date is required"));
    }
    Date::parse(trimmed, DATE_KEY_FORMAT)
        .map_err(|_| AppError::validation(format!("date must be yyyy-MM-dd: {trimmed:?}")))
}

pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_date_key(*date))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date_key(&raw).map_err(|err| serde::de::Error::custom(err.message()))
}

pub mod option {
    use super::{format_date_key, parse_date_key};
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_some(&format_date_key(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Date>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|value| parse_date_key(&value).map_err(|err| serde::de::Error::custom(err.message())))
            .transpose()
    }
}
