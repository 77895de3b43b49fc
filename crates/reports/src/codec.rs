//! Storage-boundary codecs for spreadsheet rows.
//!
//! Spreadsheet cells are strings: unset cells come back as `""`, numbers may
//! arrive quoted, and nested line items live in a single column as embedded
//! JSON. These helpers are wired in through `#[serde(with = ...)]` so the
//! in-memory record types stay typed and defaults are applied exactly once.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn cell_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Required text cell. Missing, `null` and `""` all decode to an empty string.
pub fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(cell_to_string).unwrap_or_default())
}

/// Optional text cell: `""` and `null` decode to `None`; `None` encodes as `""`
/// so a full-row write clears the cell.
pub mod opt_string {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(value.and_then(cell_to_string).filter(|s| !s.is_empty()))
    }
}

/// `"Yes"` / `"No"` flag cell. Anything other than a case-insensitive `yes`
/// (or JSON `true`) decodes to `false`.
pub mod yes_no {
    use super::*;
    use serde::Serializer;

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(if *value { "Yes" } else { "No" })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("yes"),
            _ => false,
        })
    }
}

/// Optional numeric cell that may arrive as a number or a quoted string.
/// Blank or unparsable values decode to `None`.
pub mod lenient {
    use super::*;
    use core::str::FromStr;
    use serde::{Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr + DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(Value::String(s)) => s.trim().parse().ok(),
            Some(number @ Value::Number(_)) => serde_json::from_value(number).ok(),
            _ => None,
        })
    }
}

/// Line-item quantity: lenient, and anything missing or below 1 becomes 1.
pub fn quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed: Option<u32> = lenient::deserialize(deserializer)?;
    Ok(parsed.filter(|q| *q > 0).unwrap_or(1))
}

/// Nested sequence stored as a JSON string in a single column.
///
/// Encodes as a string (`"[{...}]"`). Decodes from that string or from a real
/// JSON array; anything unparsable becomes an empty sequence.
pub mod embedded_json {
    use super::*;
    use serde::{Serialize, Serializer};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S, T>(items: &Vec<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        let encoded = serde_json::to_string(items).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(decode_embedded(value).unwrap_or_default())
    }
}

/// Like [`embedded_json`] on the read side, but reports an absent or blank
/// column as `None` so callers can tell "no column" from "empty list".
pub mod embedded_json_opt {
    use super::*;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Option::<Value>::deserialize(deserializer)?;
        Ok(decode_embedded(value))
    }
}

fn decode_embedded<T: DeserializeOwned>(value: Option<Value>) -> Option<Vec<T>> {
    let parsed = match value? {
        Value::Null => return None,
        Value::String(s) if s.trim().is_empty() => return None,
        Value::String(s) => serde_json::from_str::<Vec<T>>(&s),
        array @ Value::Array(_) => serde_json::from_value::<Vec<T>>(array),
        other => {
            tracing::warn!(value = %other, "unexpected line item encoding; treating as empty");
            return Some(Vec::new());
        }
    };

    match parsed {
        Ok(items) => Some(items),
        Err(err) => {
            tracing::warn!(error = %err, "malformed embedded line items; treating as empty");
            Some(Vec::new())
        }
    }
}
