use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Площадка. Размеры задаются один раз при создании и дальше не меняются.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub cols: i32,
}

impl Venue {
    pub fn capacity(&self) -> usize {
        (self.rows.max(0) as usize) * (self.cols.max(0) as usize)
    }
}
