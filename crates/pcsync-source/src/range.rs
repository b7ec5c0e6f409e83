use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

const QUERY_FORMAT: &str = "%Y%m%d%H%M%S";

/// Inclusive, second-granular window for the `products/bydate` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl DateRange {
    #[must_use]
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        Self { from, to }
    }

    /// `00:00:00` through `23:59:59` of `day`.
    #[must_use]
    pub fn whole_day(day: NaiveDate) -> Self {
        let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        Self {
            from: day.and_time(NaiveTime::MIN),
            to: day.and_time(end),
        }
    }

    /// `from` formatted as the API expects (`YYYYMMDDhhmmss`).
    #[must_use]
    pub fn from_param(&self) -> String {
        self.from.format(QUERY_FORMAT).to_string()
    }

    #[must_use]
    pub fn to_param(&self) -> String {
        self.to.format(QUERY_FORMAT).to_string()
    }

    /// Number of whole seconds covered, counting both ends.
    #[must_use]
    pub fn span_secs(&self) -> i64 {
        (self.to - self.from).num_seconds() + 1
    }

    /// Splits into three contiguous, non-overlapping sub-ranges that together
    /// cover exactly this range. Returns `None` below three seconds.
    #[must_use]
    pub fn split_three(&self) -> Option<[DateRange; 3]> {
        let span = self.span_secs();
        if span < 3 {
            return None;
        }
        let third = span / 3;
        let first_end = self.from + Duration::seconds(third - 1);
        let second_start = first_end + Duration::seconds(1);
        let second_end = second_start + Duration::seconds(third - 1);
        let third_start = second_end + Duration::seconds(1);

        Some([
            DateRange::new(self.from, first_end),
            DateRange::new(second_start, second_end),
            DateRange::new(third_start, self.to),
        ])
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.from_param(), self.to_param())
    }
}
