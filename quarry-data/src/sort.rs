use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DataError;

/// Direction applied to every configured ordering key of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "SortOrderRepr")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn is_ascending(self) -> bool {
        matches!(self, SortOrder::Ascending)
    }
}

impl TryFrom<i64> for SortOrder {
    type Error = DataError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SortOrder::Ascending),
            1 => Ok(SortOrder::Descending),
            other => Err(DataError::out_of_range(
                "sort_order",
                format!("{other} is not a known sort order"),
            )),
        }
    }
}

impl FromStr for SortOrder {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            _ => Err(DataError::out_of_range(
                "sort_order",
                format!("'{s}' is not a known sort order"),
            )),
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("ascending"),
            SortOrder::Descending => f.write_str("descending"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SortOrderRepr {
    Number(i64),
    Name(String),
}

impl TryFrom<SortOrderRepr> for SortOrder {
    type Error = DataError;

    fn try_from(repr: SortOrderRepr) -> Result<Self, Self::Error> {
        match repr {
            SortOrderRepr::Number(n) => SortOrder::try_from(n),
            SortOrderRepr::Name(name) => name.parse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("ASC".parse::<SortOrder>().unwrap(), SortOrder::Ascending);
        assert_eq!("Descending".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert_eq!(SortOrder::try_from(1).unwrap(), SortOrder::Descending);
    }

    #[test]
    fn unknown_values_are_out_of_range() {
        assert!(SortOrder::try_from(2).unwrap_err().is_out_of_range());
        assert!(SortOrder::try_from(-1).unwrap_err().is_out_of_range());
        assert!("sideways".parse::<SortOrder>().unwrap_err().is_out_of_range());
    }

    #[test]
    fn deserializes_from_either_form() {
        let order: SortOrder = serde_json::from_str("\"desc\"").unwrap();
        assert_eq!(order, SortOrder::Descending);
        let order: SortOrder = serde_json::from_str("0").unwrap();
        assert_eq!(order, SortOrder::Ascending);
        assert!(serde_json::from_str::<SortOrder>("7").is_err());
    }
}
