//! Academic period resolution.
//!
//! Pure functions mapping a timestamp and a student division to a quarter
//! label, against the singleton school-period configuration. Junior (JHS)
//! and senior (SHS) divisions carry independently configured quarter ranges.

use rollcall_store::SchoolPeriodConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Division {
    Junior,
    Senior,
}

impl Division {
    /// Grades 7-10 are junior, 11-12 senior; anything else is unresolved.
    pub fn from_grade(grade: &str) -> Option<Division> {
        match grade.trim().parse::<u32>() {
            Ok(7..=10) => Some(Division::Junior),
            Ok(11 | 12) => Some(Division::Senior),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }
}

/// The division's four (start, end) ranges in quarter order.
pub fn quarter_ranges(config: &SchoolPeriodConfig, division: Division) -> [(i64, i64); 4] {
    match division {
        Division::Junior => [
            (config.q1_start, config.q1_end),
            (config.q2_start, config.q2_end),
            (config.q3_start, config.q3_end),
            (config.q4_start, config.q4_end),
        ],
        Division::Senior => [
            (config.shs_q1_start, config.shs_q1_end),
            (config.shs_q2_start, config.shs_q2_end),
            (config.shs_q3_start, config.shs_q3_end),
            (config.shs_q4_start, config.shs_q4_end),
        ],
    }
}

/// The configured range of one quarter.
pub fn quarter_range(config: &SchoolPeriodConfig, quarter: Quarter, division: Division) -> (i64, i64) {
    let ranges = quarter_ranges(config, division);
    match quarter {
        Quarter::Q1 => ranges[0],
        Quarter::Q2 => ranges[1],
        Quarter::Q3 => ranges[2],
        Quarter::Q4 => ranges[3],
    }
}

/// The quarter whose range contains `timestamp`, bounds inclusive on both
/// ends; `None` when no configured range matches.
pub fn resolve_period(
    config: &SchoolPeriodConfig,
    timestamp: i64,
    division: Division,
) -> Option<Quarter> {
    Quarter::ALL
        .iter()
        .zip(quarter_ranges(config, division))
        .find(|(_, (start, end))| (*start..=*end).contains(&timestamp))
        .map(|(quarter, _)| *quarter)
}
