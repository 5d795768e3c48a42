//! Reminder email composition.
//!
//! Pure functions that turn a debtor record into a subject line and HTML body. The
//! framing (overdue notice or upcoming reminder) is decided from the due date at the
//! moment of composition, not from the stored status.

use crate::entities::debtor;
use chrono::{DateTime, Utc};

/// A composed reminder, ready to hand to a mailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEmail {
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// Whether the due date has passed, with the whole number of days either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    /// Due date is strictly before now
    Overdue { days: i64 },
    /// Due date is now or later
    Upcoming { days: i64 },
}

impl DueState {
    /// Classifies `due` relative to `now`, flooring to whole days.
    #[must_use]
    pub fn at(due: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if due < now {
            Self::Overdue {
                days: (now - due).num_days(),
            }
        } else {
            Self::Upcoming {
                days: (due - now).num_days(),
            }
        }
    }

    fn subject(self) -> String {
        match self {
            Self::Overdue { days } => format!("Payment Reminder - {days} Days Overdue"),
            Self::Upcoming { days } => format!("Payment Reminder - Due in {days} Days"),
        }
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Builds the reminder for `debtor` as of `now`.
///
/// The amount paid and outstanding balance lines are only included when a non-zero
/// payment has been recorded.
#[must_use]
pub fn compose_reminder(debtor: &debtor::Model, now: DateTime<Utc>) -> ReminderEmail {
    let state = DueState::at(debtor.payment_due_date, now);
    let (accent, background, heading, lead, closing) = match state {
        DueState::Overdue { days } => (
            "#dc2626",
            "#fee2e2",
            "Payment Overdue Notice",
            format!("This is a reminder that your payment is now <strong>{days} days overdue</strong>."),
            "Please arrange payment as soon as possible to avoid further action.",
        ),
        DueState::Upcoming { days } => (
            "#2563eb",
            "#dbeafe",
            "Payment Reminder",
            format!("This is a friendly reminder that your payment is due in <strong>{days} days</strong>."),
            "Please ensure payment is made by the due date to avoid any late fees or penalties.",
        ),
    };

    let mut details = format!(
        r#"<p style="margin: 5px 0;"><strong>Amount Due:</strong> ${:.2}</p>
<p style="margin: 5px 0;"><strong>Due Date:</strong> {}</p>
"#,
        debtor.debt_amount,
        debtor.payment_due_date.format("%-m/%-d/%Y")
    );
    if let Some(paid) = debtor.amount_paid.filter(|p| *p != 0.0) {
        details.push_str(&format!(
            r#"<p style="margin: 5px 0;"><strong>Amount Paid:</strong> ${paid:.2}</p>
<p style="margin: 5px 0;"><strong>Outstanding Balance:</strong> ${:.2}</p>
"#,
            debtor.outstanding()
        ));
    }

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<h2 style="color: {accent};">{heading}</h2>
<p>Dear {name},</p>
<p>{lead}</p>
<div style="background-color: {background}; padding: 15px; border-radius: 5px; margin: 20px 0;">
{details}</div>
<p>{closing}</p>
<p>If you have already made this payment, please disregard this notice.</p>
<p>Best regards,<br/>Debt Collection Agency</p>
</div>
"#,
        name = escape_html(&debtor.name),
    );

    ReminderEmail {
        subject: state.subject(),
        html,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::DebtorStatus;
    use chrono::{Duration, TimeZone};

    fn debtor_due(due: DateTime<Utc>, amount_paid: Option<f64>) -> debtor::Model {
        debtor::Model {
            id: 1,
            name: "Jane <Doe>".to_string(),
            email: "jane@example.com".to_string(),
            debt_amount: 1500.0,
            payment_due_date: due,
            status: DebtorStatus::Overdue,
            amount_paid,
            notes: None,
            last_email_sent: None,
            created_by: "owner".to_string(),
            created_at: due,
        }
    }

    #[test]
    fn test_overdue_reminder() {
        let due = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let now = due + Duration::days(5) + Duration::hours(23);

        let email = compose_reminder(&debtor_due(due, None), now);
        assert_eq!(email.subject, "Payment Reminder - 5 Days Overdue");
        assert!(email.html.contains("Payment Overdue Notice"));
        assert!(email.html.contains("<strong>5 days overdue</strong>"));
        assert!(email.html.contains("$1500.00"));
        assert!(email.html.contains("<strong>Due Date:</strong> 1/10/2025</p>"));
        assert!(email.html.contains("Dear Jane &lt;Doe&gt;,"));
        assert!(!email.html.contains("Amount Paid"));
    }

    #[test]
    fn test_upcoming_reminder_with_payment() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let due = now + Duration::days(10) + Duration::hours(2);

        let email = compose_reminder(&debtor_due(due, Some(500.0)), now);
        assert_eq!(email.subject, "Payment Reminder - Due in 10 Days");
        assert!(email.html.contains("#2563eb"));
        assert!(email.html.contains("<strong>Amount Paid:</strong> $500.00"));
        assert!(email.html.contains("<strong>Outstanding Balance:</strong> $1000.00"));
    }

    #[test]
    fn test_due_date_has_no_zero_padding() {
        let due = Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap();
        let email = compose_reminder(&debtor_due(due, None), due - Duration::days(2));
        assert!(email.html.contains("<strong>Due Date:</strong> 3/4/2025</p>"));

        let due = Utc.with_ymd_and_hms(2025, 11, 24, 0, 0, 0).unwrap();
        let email = compose_reminder(&debtor_due(due, None), due + Duration::days(1));
        assert!(email.html.contains("<strong>Due Date:</strong> 11/24/2025</p>"));
    }

    #[test]
    fn test_zero_payment_is_omitted() {
        let now = Utc::now();
        let email = compose_reminder(&debtor_due(now - Duration::days(1), Some(0.0)), now);
        assert!(!email.html.contains("Outstanding Balance"));
    }

    #[test]
    fn test_due_state_boundary() {
        let now = Utc::now();
        assert_eq!(DueState::at(now, now), DueState::Upcoming { days: 0 });
        assert_eq!(
            DueState::at(now - Duration::hours(3), now),
            DueState::Overdue { days: 0 }
        );
    }
}
