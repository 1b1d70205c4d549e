use chrono::NaiveDate;

/// Local metric key paired with the remote ticker it is priced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpotSymbol {
    pub key: &'static str,
    pub symbol: &'static str,
}

impl SpotSymbol {
    pub const fn new(key: &'static str, symbol: &'static str) -> Self {
        Self { key, symbol }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}
