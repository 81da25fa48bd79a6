//! Decoder for the per-frame point text encoding.

use super::{CategoryId, CategoryTable, Dataset, Frame, Timeline};

/// Malformed dataset text. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Frame count header (line 1) is empty")]
    EmptyHeader,
    #[error("Frame count header has invalid point count {token:?}")]
    InvalidPointCount { token: String },
    #[error("Line {line}: invalid category header entry {entry:?}")]
    InvalidCategoryHeader { line: usize, entry: String },
    #[error("Line {line}: expected at least 3 columns, found {found}")]
    MissingColumns { line: usize, found: usize },
    #[error("Line {line}: invalid coordinate {token:?}")]
    InvalidCoordinate { line: usize, token: String },
    #[error("Line {line}: invalid category id {token:?}")]
    InvalidCategory { line: usize, token: String },
    #[error("Frame {frame} declares {expected} points but only {found} rows remain")]
    TruncatedFrame {
        frame: usize,
        expected: usize,
        found: usize,
    },
}

/// Decode dataset text into a [`Dataset`].
///
/// Fails if the frame count header is empty or non-numeric, if any row is
/// malformed, or if fewer data rows remain than the header declares.
pub fn parse(text: &str) -> Result<Dataset, FormatError> {
    let lines: Vec<&str> = text.trim().lines().collect();

    let counts = parse_point_counts(lines.first().copied().unwrap_or(""))?;
    log::debug!(
        "Found {} frames, max {} points per frame",
        counts.len(),
        counts.iter().max().copied().unwrap_or(0)
    );

    // Data rows never contain ':', so its presence marks a name header.
    let (categories, data_start_line) = match lines.get(1) {
        Some(line) if line.contains(':') => (parse_category_header(line, 2)?, 2),
        _ => (CategoryTable::new(), 1),
    };

    let rows = &lines[data_start_line.min(lines.len())..];
    let has_category_data = rows.first().is_some_and(|row| row.split(',').count() >= 4);

    // Declared counts are untrusted: check them against the rows before allocating.
    let mut available = rows.len();
    for (frame, &count) in counts.iter().enumerate() {
        available = available
            .checked_sub(count)
            .ok_or(FormatError::TruncatedFrame {
                frame,
                expected: count,
                found: available,
            })?;
    }
    let declared = rows.len() - available;

    let mut frames = Vec::with_capacity(counts.len());
    let mut offset = 0;
    for &count in &counts {
        let mut frame = Frame::with_capacity(count);
        for (i, row) in rows[offset..offset + count].iter().enumerate() {
            let line_number = data_start_line + offset + i + 1;
            let (position, category) = parse_row(row, line_number, has_category_data)?;
            frame.push(position, category);
        }
        offset += count;
        frames.push(frame);
    }

    let extra = available;
    if extra > 0 {
        log::warn!("Ignoring {extra} data rows beyond the declared point counts");
    }

    let timeline = Timeline::new(frames, has_category_data)?;
    let dataset = Dataset::new(timeline, categories, data_start_line);
    log::debug!(
        "Parsed {} points, {} categories, category data: {}",
        declared,
        dataset.categories.len(),
        has_category_data
    );
    Ok(dataset)
}

/// Parse line 0: one non-negative point count per frame.
fn parse_point_counts(line: &str) -> Result<Vec<usize>, FormatError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(FormatError::EmptyHeader);
    }
    line.split(',')
        .map(|token| {
            let token = token.trim();
            token
                .parse::<usize>()
                .map_err(|_| FormatError::InvalidPointCount {
                    token: token.to_string(),
                })
        })
        .collect()
}

/// Parse `id: name, id: name, ...`.
fn parse_category_header(line: &str, line_number: usize) -> Result<CategoryTable, FormatError> {
    let mut table = CategoryTable::new();
    for entry in line.split(',') {
        let invalid = || FormatError::InvalidCategoryHeader {
            line: line_number,
            entry: entry.trim().to_string(),
        };
        let (id, name) = entry.split_once(':').ok_or_else(invalid)?;
        let id: CategoryId = id.trim().parse().map_err(|_| invalid())?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid());
        }
        table.insert(id, name);
    }
    Ok(table)
}

/// Parse `x,y,z[,category]`.
fn parse_row(
    row: &str,
    line_number: usize,
    has_category_data: bool,
) -> Result<([f32; 3], CategoryId), FormatError> {
    let columns: Vec<&str> = row.split(',').map(str::trim).collect();
    if columns.len() < 3 {
        return Err(FormatError::MissingColumns {
            line: line_number,
            found: columns.len(),
        });
    }

    let mut position = [0.0f32; 3];
    for (slot, token) in position.iter_mut().zip(&columns) {
        *slot = token
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| FormatError::InvalidCoordinate {
                line: line_number,
                token: token.to_string(),
            })?;
    }

    let category = match columns.get(3) {
        Some(token) if has_category_data => {
            parse_category(token).ok_or_else(|| FormatError::InvalidCategory {
                line: line_number,
                token: token.to_string(),
            })?
        }
        _ => 0,
    };

    Ok((position, category))
}

/// Category ids are integers, but exporters sometimes write them as `3.0`.
fn parse_category(token: &str) -> Option<CategoryId> {
    if let Ok(id) = token.parse::<CategoryId>() {
        return Some(id);
    }
    let value = token.parse::<f64>().ok()?;
    (value.fract() == 0.0 && (0.0..=CategoryId::MAX as f64).contains(&value))
        .then_some(value as CategoryId)
}
