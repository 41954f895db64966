use serde::Deserialize;

pub mod orders;
pub mod payments;
pub mod sessions;
pub mod users;
pub mod wallets;

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Pagination {
    pub page_number: u64,
    pub count: u64,
}

impl Pagination {
    const MAX_COUNT: u64 = 100;

    pub fn limit(&self) -> i64 {
        self.count.clamp(1, Self::MAX_COUNT) as i64
    }

    /// Pages start at 1; page 0 is treated as the first page.
    pub fn offset(&self) -> i64 {
        let skipped = i64::try_from(self.page_number.saturating_sub(1)).unwrap_or(i64::MAX);
        skipped.saturating_mul(self.limit())
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_number: 1,
            count: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_offsets() {
        let first = Pagination {
            page_number: 1,
            count: 20,
        };
        assert_eq!(first.limit(), 20);
        assert_eq!(first.offset(), 0);

        let third = Pagination {
            page_number: 3,
            count: 20,
        };
        assert_eq!(third.offset(), 40);

        let zero = Pagination {
            page_number: 0,
            count: 0,
        };
        assert_eq!(zero.limit(), 1);
        assert_eq!(zero.offset(), 0);

        let huge = Pagination {
            page_number: 2,
            count: 10_000,
        };
        assert_eq!(huge.limit(), 100);
        assert_eq!(huge.offset(), 100);
    }

    #[test]
    fn test_offset_saturates_for_large_pages() {
        let far = Pagination {
            page_number: 1 << 62,
            count: 10,
        };
        assert_eq!(far.offset(), i64::MAX);

        let last = Pagination {
            page_number: u64::MAX,
            count: 100,
        };
        assert_eq!(last.offset(), i64::MAX);
    }
}
