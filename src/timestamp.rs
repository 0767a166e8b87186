//! Timestamp formats used across the tool.
//!
//! The instrument logs UTC; everything written by this crate is local time.

use chrono::NaiveDateTime;

/// Master-table timestamp format, e.g. `06-02-2022_091502`.
pub const MASTER_FORMAT: &str = "%d-%m-%Y_%H%M%S";

/// Result-table timestamp format, e.g. `2022/02/06 09:15:02`.
pub const RESULT_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Window stamp used in file names and on the command line, e.g. `06-02-2022_0900`.
pub const WINDOW_FORMAT: &str = "%m-%d-%Y_%H%M";

/// Source-log filename stamp, e.g. `2022-06-02_14-00-00`.
pub const SOURCE_FILE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Parse a window boundary. Accepts minute precision (`MM-DD-YYYY_HHMM`) and,
/// for compatibility, an optional trailing seconds field (`MM-DD-YYYY_HHMMSS`).
pub fn parse_window_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, WINDOW_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%m-%d-%Y_%H%M%S"))
        .ok()
}

/// Format a window boundary for file names.
pub fn format_window_time(time: &NaiveDateTime) -> String {
    time.format(WINDOW_FORMAT).to_string()
}

/// Parse a master-table timestamp.
pub fn parse_master_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), MASTER_FORMAT).ok()
}

/// Format a master-table timestamp.
pub fn format_master_time(time: &NaiveDateTime) -> String {
    time.format(MASTER_FORMAT).to_string()
}

/// Format a result-table timestamp.
pub fn format_result_time(time: &NaiveDateTime) -> String {
    time.format(RESULT_FORMAT).to_string()
}
