//! DeepLabCut CSV coordinate loader.
//!
//! A DLC export starts with header rows (`scorer`, `bodyparts`, `coords`)
//! followed by one row per frame: the frame index, then an
//! `(x, y, likelihood)` triple for every tracked part. Likelihood columns
//! are never read.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::types::{BodyPart, Point, TrackSet};
use super::{CoordinateSource, LoadError};

/// How x/y columns are located in a coordinate table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ColumnLayout {
    /// Fixed positions: nose in columns 1-2, body in 4-5, tail base in 7-8.
    #[default]
    Positional,
    /// Look up each part by its label in the `bodyparts` header row.
    ByLabel {
        nose: String,
        body: String,
        tail_base: String,
    },
}

impl ColumnLayout {
    fn label(&self, part: BodyPart) -> Option<&str> {
        match self {
            ColumnLayout::Positional => None,
            ColumnLayout::ByLabel {
                nose,
                body,
                tail_base,
            } => Some(match part {
                BodyPart::Nose => nose,
                BodyPart::Body => body,
                BodyPart::TailBase => tail_base,
            }),
        }
    }
}

/// A DLC coordinate CSV on disk.
#[derive(Debug, Clone)]
pub struct DlcCsvFile {
    path: PathBuf,
    layout: ColumnLayout,
    max_frames: Option<usize>,
}

impl DlcCsvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            layout: ColumnLayout::Positional,
            max_frames: None,
        }
    }

    pub fn with_layout(mut self, layout: ColumnLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Only keep the first `max_frames` rows.
    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

}

impl CoordinateSource for DlcCsvFile {
    fn load_tracks(&self) -> Result<TrackSet, LoadError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| LoadError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        let tracks = parse_dlc_csv(&content, &self.layout, self.max_frames)?;
        tracing::debug!(
            path = %self.path.display(),
            frames = tracks.frame_count(),
            "loaded coordinates"
        );
        Ok(tracks)
    }
}

/// `(x, y)` column indices for nose, body and tail base.
type PartColumns = [(usize, usize); 3];

/// Parse DLC CSV text into a [`TrackSet`].
pub fn parse_dlc_csv(
    content: &str,
    layout: &ColumnLayout,
    max_frames: Option<usize>,
) -> Result<TrackSet, LoadError> {
    let mut bodyparts_row: Option<Vec<String>> = None;
    let mut coords_row: Option<Vec<String>> = None;
    let mut columns: Option<PartColumns> = None;
    let mut width = 0;
    let mut points: [Vec<Point>; 3] = [Vec::new(), Vec::new(), Vec::new()];

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;
        if max_frames.is_some_and(|max| points[0].len() >= max) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();

        // Header rows only appear before the first frame
        if columns.is_none() && fields[0].parse::<f64>().is_err() {
            let owned = fields.iter().map(|s| s.to_string()).collect();
            match fields[0] {
                "bodyparts" => bodyparts_row = Some(owned),
                "coords" => coords_row = Some(owned),
                _ => {}
            }
            continue;
        }

        let cols = match columns {
            Some(cols) => cols,
            None => {
                let cols = resolve_columns(layout, bodyparts_row.as_deref(), coords_row.as_deref())?;
                let needed = cols.iter().map(|&(x, y)| x.max(y)).max().unwrap_or(0) + 1;
                if fields.len() < needed {
                    return Err(LoadError::ColumnMismatch {
                        line: line_no,
                        expected: needed,
                        found: fields.len(),
                    });
                }
                width = fields.len();
                columns = Some(cols);
                cols
            }
        };

        if fields.len() != width {
            return Err(LoadError::ColumnMismatch {
                line: line_no,
                expected: width,
                found: fields.len(),
            });
        }

        for (part_points, &(x_col, y_col)) in points.iter_mut().zip(cols.iter()) {
            let x = parse_field(&fields, line_no, x_col)?;
            let y = parse_field(&fields, line_no, y_col)?;
            part_points.push(Point::new(x, y));
        }
    }

    let [nose, body, tail] = points;
    TrackSet::new(nose, body, tail)
}

fn parse_field(fields: &[&str], line: usize, column: usize) -> Result<f64, LoadError> {
    fields[column]
        .parse::<f64>()
        .map_err(|e| LoadError::Malformed {
            line,
            column: column + 1,
            message: format!("{:?}: {e}", fields[column]),
        })
}

fn resolve_columns(
    layout: &ColumnLayout,
    bodyparts: Option<&[String]>,
    coords: Option<&[String]>,
) -> Result<PartColumns, LoadError> {
    let mut cols = [(0, 0); 3];
    for part in BodyPart::ALL {
        cols[part.position()] = match layout.label(part) {
            None => {
                let x = 1 + part.position() * 3;
                (x, x + 1)
            }
            Some(label) => {
                let bodyparts =
                    bodyparts.ok_or_else(|| LoadError::MissingBodyPart(label.to_string()))?;
                labelled_columns(label, bodyparts, coords)?
            }
        };
    }
    Ok(cols)
}

fn labelled_columns(
    label: &str,
    bodyparts: &[String],
    coords: Option<&[String]>,
) -> Result<(usize, usize), LoadError> {
    let find = |axis: &str| {
        bodyparts.iter().enumerate().position(|(i, name)| {
            name == label && coords.map_or(true, |c| c.get(i).map(String::as_str) == Some(axis))
        })
    };

    let x = find("x").ok_or_else(|| LoadError::MissingBodyPart(label.to_string()))?;
    let y = if coords.is_some() {
        find("y").ok_or_else(|| LoadError::MissingBodyPart(label.to_string()))?
    } else {
        x + 1
    };
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "scorer,DLC,DLC,DLC,DLC,DLC,DLC,DLC,DLC,DLC\n\
                          bodyparts,nose,nose,nose,body,body,body,tail,tail,tail\n\
                          coords,x,y,likelihood,x,y,likelihood,x,y,likelihood\n";

    fn sample() -> String {
        format!(
            "{HEADER}\
             0,1.0,2.0,0.9,3.0,4.0,0.9,5.0,6.0,0.9\n\
             1,1.5,2.5,0.8,3.5,4.5,0.8,5.5,6.5,0.8\n"
        )
    }

    #[test]
    fn test_positional_columns() {
        let tracks = parse_dlc_csv(&sample(), &ColumnLayout::Positional, None).unwrap();

        assert_eq!(tracks.frame_count(), 2);
        assert_eq!(tracks.nose()[0], Point::new(1.0, 2.0));
        assert_eq!(tracks.body()[1], Point::new(3.5, 4.5));
        assert_eq!(tracks.tail()[1], Point::new(5.5, 6.5));
    }

    #[test]
    fn test_columns_by_label() {
        // Parts listed in a different order than the positional default
        let content = "scorer,DLC,DLC,DLC,DLC,DLC,DLC,DLC,DLC,DLC\n\
                       bodyparts,tailbase,tailbase,tailbase,snout,snout,snout,center,center,center\n\
                       coords,x,y,likelihood,x,y,likelihood,x,y,likelihood\n\
                       0,5.0,6.0,0.9,1.0,2.0,0.9,3.0,4.0,0.9\n";
        let layout = ColumnLayout::ByLabel {
            nose: "snout".into(),
            body: "center".into(),
            tail_base: "tailbase".into(),
        };

        let tracks = parse_dlc_csv(content, &layout, None).unwrap();
        assert_eq!(tracks.nose()[0], Point::new(1.0, 2.0));
        assert_eq!(tracks.body()[0], Point::new(3.0, 4.0));
        assert_eq!(tracks.tail()[0], Point::new(5.0, 6.0));
    }

    #[test]
    fn test_missing_label() {
        let layout = ColumnLayout::ByLabel {
            nose: "nose".into(),
            body: "body".into(),
            tail_base: "tailbase".into(),
        };
        let err = parse_dlc_csv(&sample(), &layout, None).unwrap_err();
        assert!(matches!(err, LoadError::MissingBodyPart(ref l) if l == "tailbase"));
    }

    #[test]
    fn test_column_mismatch() {
        let content = format!(
            "{HEADER}\
             0,1.0,2.0,0.9,3.0,4.0,0.9,5.0,6.0,0.9\n\
             1,1.5,2.5,0.8,3.5,4.5\n"
        );
        let err = parse_dlc_csv(&content, &ColumnLayout::Positional, None).unwrap_err();
        assert!(matches!(
            err,
            LoadError::ColumnMismatch {
                line: 5,
                expected: 10,
                found: 6
            }
        ));
    }

    #[test]
    fn test_too_few_columns_for_parts() {
        let err = parse_dlc_csv("0,1.0,2.0,0.9\n", &ColumnLayout::Positional, None).unwrap_err();
        assert!(matches!(err, LoadError::ColumnMismatch { expected: 9, .. }));
    }

    #[test]
    fn test_malformed_number() {
        let content = format!("{HEADER}0,1.0,abc,0.9,3.0,4.0,0.9,5.0,6.0,0.9\n");
        let err = parse_dlc_csv(&content, &ColumnLayout::Positional, None).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { line: 4, column: 3, .. }));
    }

    #[test]
    fn test_max_frames_truncates() {
        let tracks = parse_dlc_csv(&sample(), &ColumnLayout::Positional, Some(1)).unwrap();
        assert_eq!(tracks.frame_count(), 1);
    }

    #[test]
    fn test_header_only_is_empty() {
        let err = parse_dlc_csv(HEADER, &ColumnLayout::Positional, None).unwrap_err();
        assert!(matches!(err, LoadError::Empty));
    }

    #[test]
    fn test_missing_file() {
        let err = DlcCsvFile::new("/nonexistent/coords.csv")
            .load_tracks()
            .unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
