//! Daily window in which new hand-offs are accepted.

use {
    chrono::{Timelike, Utc},
    chrono_tz::Tz,
    studybot_config::WorkingHoursConfig,
};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    /// Minutes since midnight.
    start: u32,
    /// Minutes since midnight, up to 1440.
    end: u32,
    /// `None` means the host's local time.
    tz: Option<Tz>,
}

impl WorkingHours {
    pub fn new(start: u32, end: u32, tz: Option<Tz>) -> Self {
        Self { start, end, tz }
    }

    pub fn from_config(config: &WorkingHoursConfig) -> Result<Self> {
        let (start, end) = config.window_minutes().map_err(Error::message)?;
        let tz = config.tz().map_err(Error::message)?;
        Ok(Self::new(start, end, tz))
    }

    pub fn is_open(&self) -> bool {
        self.is_open_at(self.current_minutes())
    }

    /// Overnight windows (start > end) wrap past midnight. start == end is never open.
    pub fn is_open_at(&self, minutes: u32) -> bool {
        if self.start <= self.end {
            minutes >= self.start && minutes < self.end
        } else {
            minutes >= self.start || minutes < self.end
        }
    }

    /// Human readable window, e.g. "09:00-21:00 (Europe/Moscow)".
    pub fn describe(&self) -> String {
        let zone = self.tz.map_or_else(|| "local time".to_string(), |tz| tz.name().to_string());
        format!("{}-{} ({zone})", hhmm(self.start), hhmm(self.end))
    }

    fn current_minutes(&self) -> u32 {
        let (hour, minute) = match self.tz {
            Some(tz) => {
                let now = Utc::now().with_timezone(&tz);
                (now.hour(), now.minute())
            },
            None => {
                let now = chrono::Local::now();
                (now.hour(), now.minute())
            },
        };
        hour * 60 + minute
    }
}

fn hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(9 * 60, 21 * 60, 9 * 60, true)]
    #[case(9 * 60, 21 * 60, 21 * 60, false)]
    #[case(9 * 60, 21 * 60, 8 * 60 + 59, false)]
    #[case(22 * 60, 6 * 60, 23 * 60, true)]
    #[case(22 * 60, 6 * 60, 5 * 60, true)]
    #[case(22 * 60, 6 * 60, 12 * 60, false)]
    #[case(8 * 60, 1440, 23 * 60 + 59, true)]
    #[case(10 * 60, 10 * 60, 10 * 60, false)]
    fn window_membership(
        #[case] start: u32,
        #[case] end: u32,
        #[case] now: u32,
        #[case] open: bool,
    ) {
        assert_eq!(WorkingHours::new(start, end, None).is_open_at(now), open);
    }

    #[test]
    fn from_config_parses_zone() {
        let hours = WorkingHours::from_config(&WorkingHoursConfig {
            start: "09:30".into(),
            end: "24:00".into(),
            timezone: "Europe/Moscow".into(),
        })
        .unwrap();
        assert_eq!(hours.describe(), "09:30-24:00 (Europe/Moscow)");
        // must not panic whatever the wall clock says
        let _ = hours.is_open();
    }

    #[test]
    fn from_config_rejects_garbage() {
        let bad = WorkingHoursConfig {
            end: "late".into(),
            ..Default::default()
        };
        assert!(WorkingHours::from_config(&bad).is_err());
    }
}
