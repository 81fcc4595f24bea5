//! Каталог мест: сетка `rows × cols`, которая создается вместе с площадкой
//! и больше никогда не меняется.

use std::sync::Arc;
use tracing::info;

use crate::config::CatalogConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Actor, NewSeat, Seat, UserRole, Venue};
use crate::store::InventoryStore;

/// Метка ряда по его номеру (с единицы): 1 -> "A", 26 -> "Z", 27 -> "AA".
pub fn row_label(row: u32) -> String {
    let mut n = row;
    let mut label = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        label.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// Все места площадки, ряд за рядом, номера мест с единицы.
pub fn generate_seats(rows: i32, cols: i32) -> Vec<NewSeat> {
    let rows = rows.max(0) as u32;
    let cols = cols.max(0);
    let mut seats = Vec::with_capacity(rows as usize * cols as usize);
    for r in 1..=rows {
        let label = row_label(r);
        for c in 1..=cols {
            seats.push(NewSeat {
                row: label.clone(),
                number: c,
            });
        }
    }
    seats
}

#[derive(Clone)]
pub struct VenueCatalog {
    store: Arc<dyn InventoryStore>,
    config: CatalogConfig,
}

impl VenueCatalog {
    pub fn new(store: Arc<dyn InventoryStore>, config: CatalogConfig) -> Self {
        Self { store, config }
    }

    fn validate(&self, name: &str, rows: i32, cols: i32) -> AppResult<()> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Venue name must not be empty".to_string()));
        }
        if !(1..=self.config.max_rows).contains(&rows) {
            return Err(AppError::Validation(format!(
                "rows must be between 1 and {}",
                self.config.max_rows
            )));
        }
        if !(1..=self.config.max_cols).contains(&cols) {
            return Err(AppError::Validation(format!(
                "cols must be between 1 and {}",
                self.config.max_cols
            )));
        }
        Ok(())
    }

    /// Создать площадку. Места пишутся в той же транзакции, так что площадки
    /// без полного набора мест не бывает.
    pub async fn create_venue(&self, actor: &Actor, name: &str, rows: i32, cols: i32) -> AppResult<Venue> {
        actor.require(UserRole::Organizer)?;
        let name = name.trim();
        self.validate(name, rows, cols)?;

        let seats = generate_seats(rows, cols);
        let venue = self.store.create_venue(name, rows, cols, seats).await?;
        info!("Venue {} ({}) created: {}x{} seats", venue.id, venue.name, rows, cols);
        Ok(venue)
    }

    pub async fn get_venue(&self, venue_id: i64) -> AppResult<Venue> {
        self.store
            .get_venue(venue_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Venue {} not found", venue_id)))
    }

    pub async fn list_venues(&self, offset: i64, limit: i64) -> AppResult<Vec<Venue>> {
        Ok(self.store.list_venues(offset.max(0), limit.clamp(1, 100)).await?)
    }

    pub async fn venue_seats(&self, venue_id: i64) -> AppResult<Vec<Seat>> {
        let venue = self.get_venue(venue_id).await?;
        Ok(self.store.venue_seats(venue.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_rows_are_single_letters() {
        assert_eq!(row_label(1), "A");
        assert_eq!(row_label(2), "B");
        assert_eq!(row_label(26), "Z");
    }

    #[test]
    fn rows_past_z_continue_with_two_letters() {
        assert_eq!(row_label(27), "AA");
        assert_eq!(row_label(28), "AB");
        assert_eq!(row_label(52), "AZ");
        assert_eq!(row_label(53), "BA");
        assert_eq!(row_label(702), "ZZ");
        assert_eq!(row_label(703), "AAA");
    }

    #[test]
    fn five_by_ten_grid() {
        let seats = generate_seats(5, 10);
        assert_eq!(seats.len(), 50);
        assert_eq!(seats[0], NewSeat { row: "A".into(), number: 1 });
        assert_eq!(seats[9], NewSeat { row: "A".into(), number: 10 });
        assert_eq!(seats[10], NewSeat { row: "B".into(), number: 1 });
        assert_eq!(seats[49], NewSeat { row: "E".into(), number: 10 });
    }

    proptest! {
        #[test]
        fn grid_has_every_row_and_column_once(rows in 1i32..=26, cols in 1i32..=60) {
            let seats = generate_seats(rows, cols);
            prop_assert_eq!(seats.len(), (rows * cols) as usize);

            for (r, chunk) in seats.chunks(cols as usize).enumerate() {
                let expected = ((b'A' + r as u8) as char).to_string();
                for (c, seat) in chunk.iter().enumerate() {
                    prop_assert_eq!(&seat.row, &expected);
                    prop_assert_eq!(seat.number, c as i32 + 1);
                }
            }
        }

        #[test]
        fn labels_are_unique(rows in 1u32..2000) {
            let labels: std::collections::HashSet<String> = (1..=rows).map(row_label).collect();
            prop_assert_eq!(labels.len(), rows as usize);
        }
    }
}
