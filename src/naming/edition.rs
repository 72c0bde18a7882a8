use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt;

/// The two editions published by the source.
///
/// Monday to Saturday carry the Guardian Quick crossword; Sunday carries the
/// Observer Speedy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edition {
    Weekday,
    Sunday,
}

impl Edition {
    /// The only weekday that maps to [`Edition::Sunday`]
    pub const ALTERNATE_DAY: Weekday = Weekday::Sun;

    /// Edition published on `date`
    pub fn for_date(date: NaiveDate) -> Self {
        if date.weekday() == Self::ALTERNATE_DAY {
            Edition::Sunday
        } else {
            Edition::Weekday
        }
    }

    /// Filename tag used by the source for this edition
    pub fn tag(self) -> &'static str {
        match self {
            Edition::Weekday => "gdn.quick",
            Edition::Sunday => "obs.speedy",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
