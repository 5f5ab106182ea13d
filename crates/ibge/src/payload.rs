//! Normalization of IBGE payloads.
//!
//! The CNAE API returns one JSON shape per level, with the parent embedded
//! as a nested object named after the parent level:
//!
//! ```json
//! {"id": "011", "descricao": "PRODUÇÃO DE LAVOURAS TEMPORÁRIAS",
//!  "divisao": {"id": "01", "descricao": "...", "secao": {"id": "A"}},
//!  "observacoes": ["..."]}
//! ```
//!
//! Field names have drifted over the years, so the normalizer accepts a few
//! spellings for each concept and ignores anything it does not know.

use crate::error::{IbgeError, IbgeResult};
use mcpbr_core::{CnaeEntity, Level};
use serde_json::{Map, Value};

const CODE_FIELDS: [&str; 3] = ["id", "codigo", "code"];
const DESCRIPTION_FIELDS: [&str; 4] = ["descricao", "description", "nome", "titulo"];

/// Digits in a numeric code, used to restore leading zeros lost to JSON numbers
fn code_width(level: Level) -> Option<usize> {
    match level {
        Level::Section => None,
        Level::Division => Some(2),
        Level::Group => Some(3),
        Level::Class => Some(5),
        Level::Subclass => Some(7),
    }
}

/// Normalize a listing response (a JSON array of records).
pub fn normalize_list(level: Level, body: &Value) -> IbgeResult<Vec<CnaeEntity>> {
    let records = body.as_array().ok_or_else(|| {
        IbgeError::payload(format!("expected a list of {} records, got {}", level, kind_of(body)))
    })?;

    records
        .iter()
        .map(|record| normalize_record(level, record))
        .collect()
}

/// Normalize a lookup response.
///
/// The API answers lookups with a bare object or with a list; an empty list,
/// an empty object or `null` mean the code is unknown.
pub fn normalize_lookup(level: Level, code: &str, body: &Value) -> IbgeResult<Option<CnaeEntity>> {
    match body {
        Value::Null => Ok(None),
        Value::Object(map) if map.is_empty() => Ok(None),
        Value::Object(_) => normalize_record(level, body).map(Some),
        Value::Array(records) => {
            let entities = records
                .iter()
                .map(|record| normalize_record(level, record))
                .collect::<IbgeResult<Vec<_>>>()?;
            let exact = entities.iter().position(|e| e.code == code);
            Ok(match exact {
                Some(index) => entities.into_iter().nth(index),
                None => entities.into_iter().next(),
            })
        }
        other => Err(IbgeError::payload(format!(
            "expected a {} record, got {}",
            level,
            kind_of(other)
        ))),
    }
}

/// Map one raw record onto `(code, description, parent_code?)`.
pub fn normalize_record(level: Level, record: &Value) -> IbgeResult<CnaeEntity> {
    let map = record.as_object().ok_or_else(|| {
        IbgeError::payload(format!("expected a {} object, got {}", level, kind_of(record)))
    })?;

    let code = pick_code(level, map)
        .ok_or_else(|| IbgeError::payload(format!("{} record without code", level)))?;

    let description = pick_string(map, &DESCRIPTION_FIELDS)
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    let parent_code = match level.parent() {
        Some(parent_level) => pick_parent(parent_level, map),
        None => None,
    };

    Ok(CnaeEntity::new(level, code, description, parent_code))
}

fn pick_code(level: Level, map: &Map<String, Value>) -> Option<String> {
    for field in CODE_FIELDS {
        match map.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => {
                let digits = n.to_string();
                return Some(match code_width(level) {
                    Some(width) => format!("{:0>width$}", digits, width = width),
                    None => digits,
                });
            }
            _ => {}
        }
    }
    None
}

fn pick_string<'a>(map: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .find_map(|field| map.get(*field).and_then(Value::as_str))
}

/// The parent is usually a nested object (`"secao": {"id": "A"}`), but a
/// bare code (`"secao": "A"`) or a flat `secao_id` field are accepted too.
fn pick_parent(parent_level: Level, map: &Map<String, Value>) -> Option<String> {
    let key = parent_level.key();

    match map.get(key) {
        Some(Value::Object(parent)) => {
            if let Some(code) = pick_code(parent_level, parent) {
                return Some(code);
            }
        }
        Some(Value::String(code)) if !code.trim().is_empty() => {
            return Some(code.trim().to_string());
        }
        _ => {}
    }

    let flat = format!("{}_id", key);
    match map.get(&flat) {
        Some(Value::String(code)) if !code.trim().is_empty() => Some(code.trim().to_string()),
        Some(Value::Number(n)) => {
            let digits = n.to_string();
            Some(match code_width(parent_level) {
                Some(width) => format!("{:0>width$}", digits, width = width),
                None => digits,
            })
        }
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
