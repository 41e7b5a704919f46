use std::time::{Duration, UNIX_EPOCH};

const DATE_FORMAT_TODAY: &str = "Today %H:%M";
const DATE_FORMAT_YESTERDAY: &str = "Yesterday %H:%M";
const DATE_FORMAT_OTHER: &str = "%Y-%m-%d";

/// Local, human-sized rendering of a unix timestamp for the attempt history.
pub fn format_session_date(timestamp: u64) -> String {
    let attempt_time = UNIX_EPOCH + Duration::from_secs(timestamp);
    let datetime: chrono::DateTime<chrono::Local> = attempt_time.into();

    let today = chrono::Local::now().date_naive();
    let attempt_date = datetime.date_naive();

    if attempt_date == today {
        datetime.format(DATE_FORMAT_TODAY).to_string()
    } else if attempt_date == today - chrono::Duration::days(1) {
        datetime.format(DATE_FORMAT_YESTERDAY).to_string()
    } else {
        datetime.format(DATE_FORMAT_OTHER).to_string()
    }
}
