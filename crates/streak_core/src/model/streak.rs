use crate::model::date_key;
use serde::{Deserialize, Serialize};
use time::Date;

/// Persisted streak counter. `last_validated_date` is the day on which
/// the validator last rendered a verdict and is the only idempotency guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakState {
    pub count: u32,
    #[serde(default, with = "date_key::option")]
    pub last_validated_date: Option<Date>,
}
