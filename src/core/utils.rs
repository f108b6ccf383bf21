use chrono::{DateTime, FixedOffset, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn datetime_to_string(datetime: DateTime<FixedOffset>) -> String {
    let offset = FixedOffset::east_opt(7 * 60 * 60).unwrap_or(*datetime.offset()); // +0700
    datetime
        .with_timezone(&offset)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn datetime_to_string_opt(datetime: Option<DateTime<FixedOffset>>) -> Option<String> {
    datetime.map(datetime_to_string)
}

pub fn date_to_string_opt(date: Option<NaiveDate>) -> Option<String> {
    date.map(|x| x.format(DATE_FORMAT).to_string())
}
