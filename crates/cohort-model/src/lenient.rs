//! Field parsers for event records
//!
//! A single unreadable event must not stop the rest of the file from
//! loading. Each parser reads the raw JSON value and maps anything it cannot
//! interpret to an empty value, which leaves the event malformed so the
//! evaluator skips and counts it.

use chrono::NaiveDate;
use cohort_codelist::{Code, CodingSystem};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Placeholder for a missing or unreadable coding system
pub(crate) fn unknown_system() -> CodingSystem {
    CodingSystem::Other(String::new())
}

pub(crate) fn system<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CodingSystem, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(name)) if !name.trim().is_empty() => CodingSystem::from(name),
        _ => unknown_system(),
    })
}

/// Codes are trimmed; numeric codes are kept as their digits
pub(crate) fn code<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(code)) => code.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    })
}

pub(crate) fn date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) => NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok(),
        _ => None,
    })
}

pub(crate) fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Decimal>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) => Decimal::from_str(text.trim()).ok(),
        Some(Value::Number(number)) => Decimal::from_str(&number.to_string())
            .or_else(|_| Decimal::from_scientific(&number.to_string()))
            .ok(),
        _ => None,
    })
}

pub(crate) fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    })
}

pub(crate) fn product<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Code>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|value| serde_json::from_value::<Code>(value).ok())
        .map(|code| Code::new(code.system, code.code.trim()))
        .filter(|code| !code.code.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Fields {
        #[serde(default, deserialize_with = "date")]
        date: Option<NaiveDate>,
        #[serde(default, deserialize_with = "decimal")]
        value: Option<Decimal>,
        #[serde(default, deserialize_with = "code")]
        code: String,
    }

    fn parse(json: &str) -> Fields {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_impossible_date_is_none() {
        assert_eq!(parse(r#"{ "date": "2021-02-30" }"#).date, None);
        assert_eq!(parse(r#"{ "date": 20210201 }"#).date, None);
        assert_eq!(
            parse(r#"{ "date": "2021-02-01" }"#).date,
            NaiveDate::from_ymd_opt(2021, 2, 1)
        );
    }

    #[test]
    fn test_values_accept_numbers_and_text() {
        assert_eq!(parse(r#"{ "value": 41.5 }"#).value, Some(Decimal::new(415, 1)));
        assert_eq!(parse(r#"{ "value": " 30 " }"#).value, Some(Decimal::new(30, 0)));
        assert_eq!(parse(r#"{ "value": "n/a" }"#).value, None);
    }

    #[test]
    fn test_codes_are_trimmed() {
        assert_eq!(parse(r#"{ "code": " 22K5. " }"#).code, "22K5.");
        assert_eq!(parse(r#"{ "code": 1240581000000104 }"#).code, "1240581000000104");
        assert_eq!(parse(r#"{ "code": null }"#).code, "");
    }
}
