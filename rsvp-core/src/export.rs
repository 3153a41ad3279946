//! CSV export of an event's guest list.

use crate::guest::Guest;

pub const CSV_HEADER: [&str; 7] = [
    "Name",
    "Email",
    "Phone",
    "Status",
    "Plus Ones",
    "Last Updated",
    "Responses",
];

/// Render guests as CSV, one row per guest in the given order.
pub fn guests_to_csv(guests: &[Guest]) -> csv::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for guest in guests {
        let responses = guest
            .responses
            .iter()
            .map(|(key, value)| format!("{}: {}", key, value))
            .collect::<Vec<_>>()
            .join(", ");

        let plus_ones = guest.plus_one_count.to_string();
        let updated = guest.updated_at.format("%Y-%m-%d %H:%M").to_string();

        writer.write_record([
            guest.name.as_str(),
            guest.email.as_str(),
            guest.phone.as_deref().unwrap_or(""),
            guest.status.as_str(),
            plus_ones.as_str(),
            updated.as_str(),
            responses.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

/// Attachment file name for an event's export.
///
/// Spaces become underscores; anything outside `[A-Za-z0-9._-]` is dropped
/// so the name is safe inside a `Content-Disposition` header.
pub fn export_filename(event_title: &str) -> String {
    let stem: String = event_title
        .trim()
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect();
    if stem.is_empty() {
        "guests.csv".to_string()
    } else {
        format!("guests_{}.csv", stem)
    }
}
