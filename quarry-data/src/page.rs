use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::sort::SortOrder;

/// Request for one page of an entity listing.
///
/// `draw` is an opaque caller token echoed back in the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ListQuery {
    #[garde(range(min = 0))]
    pub skip: i64,
    #[garde(range(min = 0))]
    pub take: i64,
    #[garde(skip)]
    #[serde(default)]
    pub sort_order: SortOrder,
    #[garde(skip)]
    #[serde(default)]
    pub draw: i64,
}

impl ListQuery {
    pub fn new(skip: i64, take: i64, sort_order: SortOrder, draw: i64) -> Self {
        Self {
            skip,
            take,
            sort_order,
            draw,
        }
    }
}

/// One page of results with the listing metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListQueryResult<T> {
    pub data: Vec<T>,
    pub total_elements: u64,
    pub skip: i64,
    pub take: i64,
    pub sort_order: SortOrder,
    pub draw: i64,
}

impl<T> ListQueryResult<T> {
    pub fn new(data: Vec<T>, total_elements: u64, query: &ListQuery) -> Self {
        Self {
            data,
            total_elements,
            skip: query.skip,
            take: query.take,
            sort_order: query.sort_order,
            draw: query.draw,
        }
    }

    /// Number of pages of `take` elements; zero when `take` is zero.
    pub fn total_pages(&self) -> u64 {
        match u64::try_from(self.take) {
            Ok(take) if take > 0 => self.total_elements.div_ceil(take),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_echoes_the_query() {
        let query = ListQuery::new(20, 10, SortOrder::Descending, 7);
        let result = ListQueryResult::new(vec!["a", "b"], 42, &query);
        assert_eq!(result.skip, 20);
        assert_eq!(result.take, 10);
        assert_eq!(result.sort_order, SortOrder::Descending);
        assert_eq!(result.draw, 7);
        assert_eq!(result.total_pages(), 5);
    }

    #[test]
    fn zero_take_has_no_pages() {
        let query = ListQuery::new(0, 0, SortOrder::Ascending, 0);
        let result = ListQueryResult::<u8>::new(Vec::new(), 3, &query);
        assert_eq!(result.total_pages(), 0);
    }

    #[test]
    fn negative_bounds_fail_validation() {
        assert!(ListQuery::new(-1, 10, SortOrder::Ascending, 0).validate().is_err());
        assert!(ListQuery::new(0, -5, SortOrder::Ascending, 0).validate().is_err());
        assert!(ListQuery::new(0, 5, SortOrder::Ascending, 0).validate().is_ok());
    }

    #[test]
    fn deserializes_with_sort_order_names() {
        let query: ListQuery =
            serde_json::from_str(r#"{"skip":0,"take":5,"sort_order":"desc","draw":3}"#).unwrap();
        assert_eq!(query.sort_order, SortOrder::Descending);
        assert!(serde_json::from_str::<ListQuery>(r#"{"skip":0,"take":5,"sort_order":9}"#).is_err());
    }
}
