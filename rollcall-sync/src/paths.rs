//! Layout of the remote document tree.

pub const TEACHERS: &str = "teachers";
pub const STUDENTS: &str = "students";
pub const ATTENDANCE: &str = "attendance";
pub const PERIOD_CONFIG: &str = "config/schoolPeriod";
