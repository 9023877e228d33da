//! Line-protocol encoding of buffered points.
//!
//! `measurement[,tag=value...] field=value[,field=value...] timestamp`, with tags and fields in
//! key order and the timestamp in the point's own precision.

use crate::error::{ClientError, Result};
use crate::types::{FieldValue, TimeSeriesPoint};

/// Encodes one point. `label`, when set, prefixes the measurement as `<label>_<measurement>`.
///
/// Line breaks in names, tag values and string fields are escaped as `\n`/`\r`, so the output
/// is always a single line.
///
/// # Errors
/// [`ClientError::InvalidPoint`] for a non-finite float field or a timestamp that does not fit
/// the point's precision.
pub fn encode_point(point: &TimeSeriesPoint, label: Option<&str>) -> Result<String> {
    let mut line = String::with_capacity(64);

    match label {
        Some(label) if !label.is_empty() => {
            escape_into(&mut line, label, &[',', ' ']);
            line.push('_');
        }
        _ => {}
    }
    escape_into(&mut line, &point.measurement, &[',', ' ']);

    for (key, value) in &point.tags {
        line.push(',');
        escape_into(&mut line, key, &[',', ' ', '=']);
        line.push('=');
        escape_into(&mut line, value, &[',', ' ', '=']);
    }

    line.push(' ');
    for (i, (key, value)) in point.fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        escape_into(&mut line, key, &[',', ' ', '=']);
        line.push('=');
        match value {
            FieldValue::Float(v) if v.is_finite() => line.push_str(&v.to_string()),
            FieldValue::Float(v) => {
                return Err(ClientError::InvalidPoint(format!(
                    "field '{}' of '{}' is {}",
                    key, point.measurement, v
                )))
            }
            FieldValue::Text(s) => {
                line.push('"');
                escape_into(&mut line, s, &['"', '\\']);
                line.push('"');
            }
        }
    }

    let timestamp = point.precision.encode(&point.timestamp).ok_or_else(|| {
        ClientError::InvalidPoint(format!(
            "timestamp {} of '{}' overflows {} precision",
            point.timestamp, point.measurement, point.precision
        ))
    })?;
    line.push(' ');
    line.push_str(&timestamp.to_string());
    Ok(line)
}

/// Encodes a batch, one point per line. Fails on the first point that cannot be encoded.
pub fn encode_batch(points: &[TimeSeriesPoint], label: Option<&str>) -> Result<String> {
    Ok(points
        .iter()
        .map(|p| encode_point(p, label))
        .collect::<Result<Vec<_>>>()?
        .join("\n"))
}

fn escape_into(out: &mut String, raw: &str, special: &[char]) {
    for c in raw.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => {
                if special.contains(&c) {
                    out.push('\\');
                }
                out.push(c);
            }
        }
    }
}
