//! Invitation and reminder email bodies.

use rsvp_core::{Event, Guest};

/// Subject and HTML body of one outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub html_body: String,
}

/// The link a guest follows to view and answer their invitation.
pub fn rsvp_link(public_base_url: &str, guest: &Guest) -> String {
    format!(
        "{}/rsvp/{}",
        public_base_url.trim_end_matches('/'),
        guest.access_token.as_str()
    )
}

pub fn invitation_email(event: &Event, guest: &Guest, rsvp_link: &str) -> EmailContent {
    let mut html = String::new();
    html.push_str(&format!("<p>Hi {},</p>\n", escape_html(&guest.name)));
    html.push_str(&format!(
        "<p>You're invited to <strong>{}</strong>.</p>\n",
        escape_html(&event.title)
    ));
    push_event_details(&mut html, event);
    html.push_str(&format!(
        "<p><a href=\"{}\">Let us know if you can make it</a></p>\n",
        escape_html(rsvp_link)
    ));

    EmailContent {
        subject: format!("You're Invited: {}", event.title),
        html_body: html,
    }
}

pub fn reminder_email(event: &Event, guest: &Guest, rsvp_link: &str) -> EmailContent {
    let mut html = String::new();
    html.push_str(&format!("<p>Hi {},</p>\n", escape_html(&guest.name)));
    html.push_str(&format!(
        "<p><strong>{}</strong> is coming up and we haven't heard back from you yet.</p>\n",
        escape_html(&event.title)
    ));
    push_event_details(&mut html, event);
    html.push_str(&format!(
        "<p><a href=\"{}\">Please RSVP</a></p>\n",
        escape_html(rsvp_link)
    ));

    EmailContent {
        subject: format!("Reminder: {} is coming up!", event.title),
        html_body: html,
    }
}

fn push_event_details(html: &mut String, event: &Event) {
    html.push_str("<ul>\n");
    html.push_str(&format!(
        "<li>When: {}</li>\n",
        event.date.format("%A, %B %-d, %Y at %H:%M UTC")
    ));
    if let Some(location) = &event.location {
        html.push_str(&format!("<li>Where: {}</li>\n", escape_html(location)));
    }
    if let Some(dress_code) = &event.custom_fields.dress_code {
        html.push_str(&format!("<li>Dress code: {}</li>\n", escape_html(dress_code)));
    }
    html.push_str("</ul>\n");
    if let Some(description) = &event.description {
        html.push_str(&format!("<p>{}</p>\n", escape_html(description)));
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
