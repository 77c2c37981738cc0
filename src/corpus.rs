//! JSON corpus loading and saving.
//!
//! A corpus is an array of palettes, each an array of `[r, g, b]` or
//! `[r, g, b, weight]` records:
//!
//! ```json
//! [[[10, 10, 10, 0.5], [200, 200, 200, 0.5]], [[255, 0, 0]]]
//! ```

use log::warn;
use serde_json::Value;

use crate::color::{Palette, WeightedColor};
use crate::error::MachineError;

/// Parse a corpus, failing on the first malformed palette.
///
/// A document that is not nested arrays three deep is
/// [`MachineError::Json`]; anything wrong inside a record, including a
/// component that is not a number, is [`MachineError::InvalidRecord`].
pub fn parse_corpus(text: &str) -> Result<Vec<Palette>, MachineError> {
    let raw: Vec<Vec<Vec<Value>>> = serde_json::from_str(text)?;
    raw.iter()
        .enumerate()
        .map(|(i, records)| palette_from_records(i, records))
        .collect()
}

/// Parse a corpus, skipping palettes that are malformed.
///
/// Returns the well-formed palettes in corpus order and the number skipped.
/// Only a document that is not a JSON array at all is an error.
pub fn parse_corpus_lenient(text: &str) -> Result<(Vec<Palette>, usize), MachineError> {
    let raw: Vec<Value> = serde_json::from_str(text)?;
    let mut palettes = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for (i, value) in raw.into_iter().enumerate() {
        let parsed = serde_json::from_value::<Vec<Vec<Value>>>(value)
            .map_err(MachineError::from)
            .and_then(|records| palette_from_records(i, &records));
        match parsed {
            Ok(palette) => palettes.push(palette),
            Err(e) => {
                warn!("Skipping palette {i}: {e}");
                skipped += 1;
            }
        }
    }

    Ok((palettes, skipped))
}

fn palette_from_records(position: usize, records: &[Vec<Value>]) -> Result<Palette, MachineError> {
    let palette: Palette = records
        .iter()
        .enumerate()
        .map(|(entry, record)| {
            record_to_entry(record).map_err(|reason| MachineError::InvalidRecord {
                palette: position,
                entry,
                reason,
            })
        })
        .collect::<Result<Vec<_>, _>>()?
        .into();
    palette.validate(position)?;
    Ok(palette)
}

fn record_to_entry(record: &[Value]) -> Result<WeightedColor, String> {
    let components = record
        .iter()
        .enumerate()
        .map(|(i, value)| {
            value
                .as_f64()
                .ok_or_else(|| format!("component {i} is not a number: {value}"))
        })
        .collect::<Result<Vec<f64>, _>>()?;
    WeightedColor::from_components(&components)
}

/// Serialize palettes in the corpus format, pretty-printed.
///
/// Unweighted entries are written as `[r, g, b]`.
pub fn to_json(palettes: &[Palette]) -> String {
    let value = Value::Array(
        palettes
            .iter()
            .map(|palette| {
                Value::Array(
                    palette
                        .iter()
                        .map(|wc| {
                            let mut record = vec![
                                Value::from(wc.color.r),
                                Value::from(wc.color.g),
                                Value::from(wc.color.b),
                            ];
                            if let Some(w) = wc.weight {
                                record.push(Value::from(w));
                            }
                            Value::Array(record)
                        })
                        .collect(),
                )
            })
            .collect(),
    );
    // A tree of numbers and arrays always serializes.
    serde_json::to_string_pretty(&value).unwrap_or_default()
}
