//! Expansion of row bands into individual seat cells.
//!
//! A screen layout is described as a column count plus a list of bands, each
//! assigning a contiguous range of single-letter rows to a seat category and
//! price. Every (row, column) cell becomes one seat numbered `{row}{column}`.

use std::collections::HashSet;

use crate::error::{AppError, AppResult};
use crate::models::SeatBand;

#[derive(Debug, Clone, PartialEq)]
pub struct SeatCell {
    pub row_label: String,
    pub column_number: i32,
    pub seat_number: String,
    pub seat_category_id: i64,
    pub price: f64,
}

pub fn seat_number(row: char, column: i32) -> String {
    format!("{}{}", row, column)
}

fn parse_row(label: &str) -> AppResult<char> {
    let mut chars = label.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Ok(c.to_ascii_uppercase()),
        _ => Err(AppError::InvalidInput(format!(
            "row label '{}' must be a single letter A-Z",
            label
        ))),
    }
}

pub fn expand_bands(total_columns: i32, bands: &[SeatBand]) -> AppResult<Vec<SeatCell>> {
    if total_columns < 1 {
        return Err(AppError::InvalidInput("total_columns must be at least 1".to_string()));
    }
    if bands.is_empty() {
        return Err(AppError::InvalidInput("at least one seat band is required".to_string()));
    }

    let mut seen_rows = HashSet::new();
    let mut cells = Vec::new();

    for band in bands {
        let start = parse_row(&band.row_start)?;
        let end = parse_row(&band.row_end)?;
        if start > end {
            return Err(AppError::InvalidInput(format!(
                "row range {}..{} is inverted",
                start, end
            )));
        }
        if !band.price.is_finite() || band.price < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "price {} for rows {}..{} is invalid",
                band.price, start, end
            )));
        }

        for row in start..=end {
            if !seen_rows.insert(row) {
                return Err(AppError::InvalidInput(format!(
                    "row {} is assigned to more than one band",
                    row
                )));
            }
            for column in 1..=total_columns {
                cells.push(SeatCell {
                    row_label: row.to_string(),
                    column_number: column,
                    seat_number: seat_number(row, column),
                    seat_category_id: band.seat_category_id,
                    price: band.price,
                });
            }
        }
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn band(start: &str, end: &str, category: i64, price: f64) -> SeatBand {
        SeatBand {
            row_start: start.to_string(),
            row_end: end.to_string(),
            seat_category_id: category,
            price,
        }
    }

    #[test]
    fn expands_each_row_and_column() {
        let cells = expand_bands(3, &[band("A", "B", 1, 10.0), band("c", "C", 2, 12.5)]).unwrap();
        let numbers: Vec<&str> = cells.iter().map(|c| c.seat_number.as_str()).collect();
        assert_eq!(numbers, ["A1", "A2", "A3", "B1", "B2", "B3", "C1", "C2", "C3"]);
        assert!(cells[..6].iter().all(|c| c.seat_category_id == 1 && c.price == 10.0));
        assert!(cells[6..].iter().all(|c| c.seat_category_id == 2 && c.price == 12.5));
    }

    #[test]
    fn rejects_overlapping_bands() {
        let err = expand_bands(2, &[band("A", "C", 1, 10.0), band("C", "D", 2, 8.0)]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(msg) if msg.contains("row C")));
    }

    #[test]
    fn rejects_inverted_ranges_and_bad_labels() {
        assert!(matches!(
            expand_bands(2, &[band("D", "A", 1, 10.0)]),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            expand_bands(2, &[band("AA", "AB", 1, 10.0)]),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            expand_bands(2, &[band("1", "2", 1, 10.0)]),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_empty_layouts() {
        assert!(matches!(expand_bands(0, &[band("A", "A", 1, 1.0)]), Err(AppError::InvalidInput(_))));
        assert!(matches!(expand_bands(4, &[]), Err(AppError::InvalidInput(_))));
    }

    proptest! {
        #[test]
        fn cell_count_and_numbers_follow_layout(
            split in 0u8..25,
            columns in 1i32..30,
        ) {
            let split = (b'A' + split) as char;
            let next = ((split as u8) + 1) as char;
            let bands = vec![
                band("A", &split.to_string(), 1, 5.0),
                band(&next.to_string(), "Z", 2, 9.0),
            ];
            let cells = expand_bands(columns, &bands).unwrap();

            prop_assert_eq!(cells.len(), 26 * columns as usize);
            let unique: HashSet<&str> = cells.iter().map(|c| c.seat_number.as_str()).collect();
            prop_assert_eq!(unique.len(), cells.len());
            for cell in &cells {
                prop_assert_eq!(&cell.seat_number, &format!("{}{}", cell.row_label, cell.column_number));
                let expected_category = if cell.row_label.as_str() <= split.to_string().as_str() { 1 } else { 2 };
                prop_assert_eq!(cell.seat_category_id, expected_category);
            }
        }
    }
}
