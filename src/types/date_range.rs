use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A pair of instants bounding a query or availability window.
///
/// A missing endpoint means the range is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTimeRange {
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
}

impl DateTimeRange {
    pub fn new(start: Option<DateTime<FixedOffset>>, end: Option<DateTime<FixedOffset>>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Whether `instant` lies inside the range, both bounds inclusive.
    pub fn contains(&self, instant: &DateTime<FixedOffset>) -> bool {
        self.start.map_or(true, |start| start <= *instant)
            && self.end.map_or(true, |end| *instant <= end)
    }

    /// A range whose start lies after its end can never match anything.
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::timestamp::parse_timestamp;

    #[test]
    fn bounds_are_inclusive_and_optional() {
        let start = parse_timestamp("2020010100").unwrap();
        let end = parse_timestamp("2020010200").unwrap();
        let range = DateTimeRange::new(Some(start), Some(end));
        assert!(range.contains(&start));
        assert!(range.contains(&end));
        assert!(!range.contains(&parse_timestamp("2020010201").unwrap()));

        let open_end = DateTimeRange::new(Some(start), None);
        assert!(open_end.contains(&parse_timestamp("2099010100").unwrap()));
        assert!(DateTimeRange::unbounded().contains(&start));
    }

    #[test]
    fn detects_switched_bounds() {
        let a = parse_timestamp("2020010100").unwrap();
        let b = parse_timestamp("2021010100").unwrap();
        assert!(DateTimeRange::new(Some(b), Some(a)).is_inverted());
        assert!(!DateTimeRange::new(Some(a), Some(b)).is_inverted());
        assert!(!DateTimeRange::new(Some(b), None).is_inverted());
    }
}
