//! HTTP handlers, grouped by resource. Routing lives in `main`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod categories;
pub mod offers;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<Uuid>,
}

impl ListParams {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).min(100)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * i64::from(self.per_page())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_defaults_and_caps() {
        let p = ListParams {
            page: None,
            per_page: Some(1000),
            category: None,
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.per_page(), 100);
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn offset_survives_extreme_page_numbers() {
        let p = ListParams {
            page: Some(u32::MAX),
            per_page: Some(100),
            category: None,
        };
        assert_eq!(p.offset(), i64::from(u32::MAX - 1) * 100);
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}
