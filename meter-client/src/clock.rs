use time::{macros::format_description, OffsetDateTime};

/// Wall-clock source used to label submissions that carry no period.
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Month label in the `Oct-2025` style the shell offers by default.
pub fn period_label(ts: OffsetDateTime) -> Result<String, time::error::Format> {
    ts.format(format_description!("[month repr:short]-[year]"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn period_label_uses_short_month_and_year() {
        let label = period_label(datetime!(2025-10-14 09:30:00 UTC)).unwrap();
        assert_eq!(label, "Oct-2025");
    }

    #[test]
    fn fixed_clock_returns_pinned_instant() {
        let ts = datetime!(2024-02-29 00:00:00 UTC);
        assert_eq!(FixedClock(ts).now(), ts);
    }
}
