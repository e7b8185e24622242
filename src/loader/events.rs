//! Laser event loader.
//!
//! Two formats are accepted:
//! - JSON with `LaserOnTimes` / `LaserOffTimes` arrays (seconds)
//! - CSV or plain text with one `on,off` pair per row, header optional

use std::path::PathBuf;

use serde::Deserialize;

use super::types::Event;
use super::{EventSource, LoadError};

/// Laser times as exported from the acquisition rig.
#[derive(Debug, Deserialize)]
struct LaserTimes {
    #[serde(rename = "LaserOnTimes")]
    on: Vec<f64>,
    #[serde(rename = "LaserOffTimes")]
    off: Vec<f64>,
}

/// An event file on disk. The format is chosen by extension.
#[derive(Debug, Clone)]
pub struct EventFile {
    path: PathBuf,
}

impl EventFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn is_json(&self) -> bool {
        self.path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
    }
}

impl EventSource for EventFile {
    fn load_events(&self) -> Result<Vec<Event>, LoadError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| LoadError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;

        let events = if self.is_json() {
            parse_events_json(&content)?
        } else {
            parse_events_csv(&content)?
        };
        tracing::debug!(path = %self.path.display(), events = events.len(), "loaded events");
        Ok(events)
    }
}

/// Parse the JSON form. Both arrays must have equal length.
pub fn parse_events_json(content: &str) -> Result<Vec<Event>, LoadError> {
    let times: LaserTimes = serde_json::from_str(content).map_err(|e| LoadError::Malformed {
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    })?;

    if times.on.len() != times.off.len() {
        return Err(LoadError::ColumnMismatch {
            line: 0,
            expected: times.on.len(),
            found: times.off.len(),
        });
    }

    Ok(times
        .on
        .into_iter()
        .zip(times.off)
        .map(|(on, off)| Event::new(on, off))
        .collect())
}

/// Parse `on,off` rows. Only the first row may be a non-numeric header.
pub fn parse_events_csv(content: &str) -> Result<Vec<Event>, LoadError> {
    let mut events = Vec::new();
    let mut first_row = true;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c == '\t' || c == ' ')
            .filter(|s| !s.is_empty())
            .collect();

        if std::mem::take(&mut first_row)
            && fields.first().is_some_and(|f| f.parse::<f64>().is_err())
        {
            continue;
        }

        if fields.len() != 2 {
            return Err(LoadError::ColumnMismatch {
                line: line_no,
                expected: 2,
                found: fields.len(),
            });
        }

        let mut values = [0.0; 2];
        for (column, (slot, field)) in values.iter_mut().zip(&fields).enumerate() {
            *slot = field.parse::<f64>().map_err(|e| LoadError::Malformed {
                line: line_no,
                column: column + 1,
                message: format!("{field:?}: {e}"),
            })?;
        }
        events.push(Event::new(values[0], values[1]));
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json() {
        let json = r#"{"LaserOnTimes": [10.0, 20.5], "LaserOffTimes": [11.5, 22.0]}"#;
        let events = parse_events_json(json).unwrap();
        assert_eq!(events, vec![Event::new(10.0, 11.5), Event::new(20.5, 22.0)]);
    }

    #[test]
    fn test_parse_json_unequal_lengths() {
        let json = r#"{"LaserOnTimes": [10.0, 20.5], "LaserOffTimes": [11.5]}"#;
        assert!(matches!(
            parse_events_json(json),
            Err(LoadError::ColumnMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_csv_with_header() {
        let csv = "on,off\n10.0,11.5\n\n20.5,22.0\n";
        let events = parse_events_csv(csv).unwrap();
        assert_eq!(events, vec![Event::new(10.0, 11.5), Event::new(20.5, 22.0)]);
    }

    #[test]
    fn test_parse_csv_bad_row_after_header() {
        let err = parse_events_csv("on,off\n2.0s,3.0\nx,4\n5.0,6.0\n").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Malformed {
                line: 2,
                column: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_csv_header_after_comment() {
        let events = parse_events_csv("# rig 3\non,off\n1.0,2.0\n").unwrap();
        assert_eq!(events, vec![Event::new(1.0, 2.0)]);
    }

    #[test]
    fn test_parse_whitespace_separated() {
        let events = parse_events_csv("10\t11.5\n20.5 22\n").unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], Event::new(20.5, 22.0));
    }

    #[test]
    fn test_parse_csv_bad_row() {
        let err = parse_events_csv("10.0,11.5\n20.5\n").unwrap_err();
        assert!(matches!(
            err,
            LoadError::ColumnMismatch {
                line: 2,
                expected: 2,
                found: 1
            }
        ));

        let err = parse_events_csv("10.0,11.5\n20.5,x\n").unwrap_err();
        assert!(matches!(err, LoadError::Malformed { line: 2, column: 2, .. }));
    }
}
