use chrono::NaiveDate;

use crate::models::AppointmentNotice;

pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

pub fn appointment_confirmation(notice: &AppointmentNotice) -> RenderedEmail {
    RenderedEmail {
        subject: "Terminbestätigung".to_string(),
        html: format!(
            "<p>Hallo {},</p>\
             <p>Ihr Termin am <strong>{}</strong> um <strong>{} Uhr</strong> ist bestätigt.</p>\
             <p>Wir rufen Sie zum vereinbarten Zeitpunkt an.</p>",
            escape_html(&notice.recipient_first_name),
            format_date(notice.appointment_date),
            format_time(&notice.appointment_time),
        ),
    }
}

pub fn appointment_reminder(notice: &AppointmentNotice) -> RenderedEmail {
    RenderedEmail {
        subject: "Erinnerung: Ihr Termin beginnt in Kürze".to_string(),
        html: format!(
            "<p>Hallo {},</p>\
             <p>Ihr Termin heute um <strong>{} Uhr</strong> beginnt in etwa 30 Minuten.</p>",
            escape_html(&notice.recipient_first_name),
            format_time(&notice.appointment_time),
        ),
    }
}

pub fn missed_appointment(notice: &AppointmentNotice, booking_url: &str) -> RenderedEmail {
    RenderedEmail {
        subject: "Wir haben Sie leider nicht erreicht".to_string(),
        html: format!(
            "<p>Hallo {},</p>\
             <p>Zu Ihrem Termin am {} um {} Uhr konnten wir Sie leider nicht erreichen.</p>\
             <p>Über den folgenden Link können Sie einen neuen Termin wählen: \
             <a href=\"{}\">{}</a></p>",
            escape_html(&notice.recipient_first_name),
            format_date(notice.appointment_date),
            format_time(&notice.appointment_time),
            booking_url,
            booking_url,
        ),
    }
}

pub fn booking_invitation(first_name: &str, booking_url: &str) -> RenderedEmail {
    RenderedEmail {
        subject: "Bitte wählen Sie Ihren Termin".to_string(),
        html: format!(
            "<p>Hallo {},</p>\
             <p>vielen Dank für Ihr Interesse. Bitte wählen Sie über den folgenden Link \
             einen Termin für ein kurzes Telefonat: <a href=\"{}\">{}</a></p>",
            escape_html(first_name),
            booking_url,
            booking_url,
        ),
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// `09:00:00` and `09:00` both render as `09:00`.
pub fn format_time(time: &str) -> String {
    time.get(..5).unwrap_or(time).to_string()
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
