//! Log line normalization.
//!
//! Each raw line pushed by the backend becomes one [`LogRecord`]. Lines that
//! are already JSON are kept exactly as decoded. Anything else goes through
//! the lenient `key=value` decoder, which rebuilds a JSON object literal from
//! the pairs and hands it back to the JSON decoder.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::{Map, Value};

/// One structured entry decoded from a single raw log line.
#[derive(Debug, Clone, PartialEq)]
pub enum LogRecord {
    /// The line was a complete JSON document.
    Structured(Value),
    /// The line was recovered from comma separated `key=value` pairs.
    Fields(Vec<LogField>),
}

/// A field recovered by the lenient decoder.
///
/// `value` is `None` when the token carried no `=`; such fields are kept
/// with an undefined value instead of being dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct LogField {
    pub key: String,
    pub value: Option<Value>,
}

impl LogRecord {
    /// Looks up a top-level field. Undefined fields and non-object
    /// structured records yield `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            LogRecord::Structured(value) => value.get(key),
            LogRecord::Fields(fields) => fields
                .iter()
                .find(|field| field.key == key)
                .and_then(|field| field.value.as_ref()),
        }
    }

    /// True when the field exists, even if its value is undefined.
    pub fn contains_key(&self, key: &str) -> bool {
        match self {
            LogRecord::Structured(value) => value
                .as_object()
                .is_some_and(|object| object.contains_key(key)),
            LogRecord::Fields(fields) => fields.iter().any(|field| field.key == key),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, LogRecord::Structured(_))
    }

    /// Renders the record as JSON for display. Undefined fields are omitted.
    pub fn to_json(&self) -> Value {
        match self {
            LogRecord::Structured(value) => value.clone(),
            LogRecord::Fields(fields) => {
                let object: Map<String, Value> = fields
                    .iter()
                    .filter_map(|field| {
                        field
                            .value
                            .as_ref()
                            .map(|value| (field.key.clone(), value.clone()))
                    })
                    .collect();
                Value::Object(object)
            }
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("undecodable log line {line:?}: {message}")]
    Undecodable { line: String, message: String },
}

/// Decode one raw line, strict first and lenient second.
///
/// Only fails when the lenient decoder also fails.
pub fn normalize(raw: &str) -> Result<LogRecord, NormalizeError> {
    match decode_strict(raw) {
        Ok(value) => Ok(LogRecord::Structured(value)),
        Err(_) => decode_lenient(raw),
    }
}

/// Strict stage: the line must be a well-formed JSON document.
pub fn decode_strict(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Lenient stage: `{k1=v1, k2=v2}` style lines.
///
/// Every brace anywhere in the line is removed, the rest is split on `,`
/// and each token on its first `=`. Values are classified as boolean,
/// number or string and the pairs are re-encoded as a JSON object literal
/// without escaping, so a value holding a quote (or a numeric-looking value
/// that is not a JSON number) makes the whole line undecodable.
pub fn decode_lenient(raw: &str) -> Result<LogRecord, NormalizeError> {
    let stripped: String = raw.chars().filter(|c| !matches!(c, '{' | '}')).collect();
    if stripped.trim().is_empty() {
        return Ok(LogRecord::Fields(Vec::new()));
    }

    let pairs: Vec<(&str, Option<&str>)> = stripped.split(',').map(split_pair).collect();
    let literal = object_literal(&pairs);

    let OrderedEntries(entries) =
        serde_json::from_str(&literal).map_err(|err| NormalizeError::Undecodable {
            line: raw.to_string(),
            message: err.to_string(),
        })?;

    let mut fields: Vec<LogField> = Vec::with_capacity(entries.len());
    for ((key, value), &(_, raw_value)) in entries.into_iter().zip(pairs.iter()) {
        let value = raw_value.map(|_| value);
        // Later duplicates overwrite the value but keep the first position.
        match fields.iter_mut().find(|field| field.key == key) {
            Some(existing) => existing.value = value,
            None => fields.push(LogField { key, value }),
        }
    }
    Ok(LogRecord::Fields(fields))
}

fn split_pair(token: &str) -> (&str, Option<&str>) {
    let token = token.trim();
    match token.split_once('=') {
        Some((key, value)) => (key.trim(), Some(value.trim())),
        None => (token, None),
    }
}

fn object_literal(pairs: &[(&str, Option<&str>)]) -> String {
    let mut literal = String::from("{");
    for (index, (key, value)) in pairs.iter().enumerate() {
        if index > 0 {
            literal.push_str(", ");
        }
        literal.push('"');
        literal.push_str(key);
        literal.push_str("\": ");
        match value {
            // Placeholder only; the field is restored as undefined afterwards.
            None => literal.push_str("null"),
            Some(value) if *value == "true" || *value == "false" => literal.push_str(value),
            Some(value) if parses_as_number(value) => literal.push_str(value),
            Some(value) => {
                literal.push('"');
                literal.push_str(value);
                literal.push('"');
            }
        }
    }
    literal.push('}');
    literal
}

/// Loose numeric test used to classify lenient values. An empty string
/// counts as numeric, as do signed decimals with optional fraction and
/// exponent, `Infinity`, and unsigned `0x`/`0o`/`0b` literals.
pub(crate) fn parses_as_number(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return true;
    }

    let lower = text.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            return !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix));
        }
    }

    let unsigned = text
        .strip_prefix('+')
        .or_else(|| text.strip_prefix('-'))
        .unwrap_or(text);
    if unsigned == "Infinity" {
        return true;
    }

    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
        None => (unsigned, None),
    };

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (mantissa, None),
    };
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !frac_part.map_or(true, all_digits) {
        return false;
    }
    if int_part.is_empty() && frac_part.map_or(true, str::is_empty) {
        return false;
    }

    match exponent {
        None => true,
        Some(exp) => {
            let digits = exp
                .strip_prefix('+')
                .or_else(|| exp.strip_prefix('-'))
                .unwrap_or(exp);
            !digits.is_empty() && all_digits(digits)
        }
    }
}

/// Object entries in source order, duplicates included.
struct OrderedEntries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Value>()? {
                    entries.push(entry);
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::parses_as_number;

    #[test]
    fn decimal_forms_are_numeric() {
        for text in ["0", "3", "-7", "+5", "1.5", "1.", ".5", "1e3", "2E-4", "-0.0e+1"] {
            assert!(parses_as_number(text), "{text}");
        }
    }

    #[test]
    fn loose_forms_are_numeric() {
        for text in ["", "Infinity", "-Infinity", "0x1F", "0o17", "0b101"] {
            assert!(parses_as_number(text), "{text:?}");
        }
    }

    #[test]
    fn partial_numbers_are_not_numeric() {
        for text in [".", "e5", "1e", "1.2.3", "12abc", "-0x1F", "0x", "infinity", "1_000", "+-1"] {
            assert!(!parses_as_number(text), "{text:?}");
        }
    }
}
