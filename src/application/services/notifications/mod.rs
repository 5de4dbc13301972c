use serde::Serialize;

use crate::application::dto::settings::CampSettings;
use crate::application::ports::notification_port::NotificationPort;
use crate::domain::users::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    RegistrationConfirmed,
    RegistrationPending,
    RegistrationWaitlisted,
    RegistrationModified,
    RegistrationCancelled,
    PaymentReceived,
    PaymentRefunded,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub body: String,
}

/// Values interpolated into notification text.
#[derive(Debug, Clone)]
pub struct NotificationContext<'a> {
    pub camp_name: &'a str,
    pub year: i32,
    pub user: &'a User,
    /// Free-form detail such as an admin's reason or a payment amount.
    pub detail: Option<String>,
}

pub fn compose(kind: NotificationKind, ctx: &NotificationContext<'_>) -> Notification {
    let camp = ctx.camp_name;
    let year = ctx.year;
    let (subject, mut body) = match kind {
        NotificationKind::RegistrationConfirmed => (
            format!("{camp} {year}: registration confirmed"),
            format!("Your registration for {camp} {year} is confirmed. See you out there!"),
        ),
        NotificationKind::RegistrationPending => (
            format!("{camp} {year}: registration received"),
            format!(
                "We received your registration for {camp} {year}. It will be confirmed once your dues are paid."
            ),
        ),
        NotificationKind::RegistrationWaitlisted => (
            format!("{camp} {year}: you are on the waitlist"),
            format!(
                "The camping option you chose for {camp} {year} is full, so your registration is on the waitlist. We will contact you if a spot opens up."
            ),
        ),
        NotificationKind::RegistrationModified => (
            format!("{camp} {year}: your registration was updated"),
            format!("An organizer updated your registration for {camp} {year}."),
        ),
        NotificationKind::RegistrationCancelled => (
            format!("{camp} {year}: registration cancelled"),
            format!("Your registration for {camp} {year} has been cancelled."),
        ),
        NotificationKind::PaymentReceived => (
            format!("{camp} {year}: payment received"),
            format!("Thank you, we received your payment for {camp} {year}."),
        ),
        NotificationKind::PaymentRefunded => (
            format!("{camp} {year}: payment refunded"),
            format!("A payment for {camp} {year} has been refunded."),
        ),
    };
    if let Some(detail) = ctx.detail.as_deref().filter(|d| !d.trim().is_empty()) {
        body.push_str("\n\n");
        body.push_str(detail.trim());
    }
    Notification {
        kind,
        to_email: ctx.user.email.clone(),
        to_name: ctx.user.display_name(),
        subject,
        body,
    }
}

/// Delivers a notification; failures are logged and never reach the caller.
pub async fn dispatch<N: NotificationPort + ?Sized>(port: &N, notification: Notification) {
    if let Err(err) = port.send(&notification).await {
        tracing::warn!(
            kind = ?notification.kind,
            to = %notification.to_email,
            error = ?err,
            "failed to deliver notification"
        );
    }
}

/// Composes a notification for `user` about `year` and dispatches it.
pub async fn notify_user<N: NotificationPort + ?Sized>(
    port: &N,
    settings: &CampSettings,
    user: &User,
    year: i32,
    kind: NotificationKind,
    detail: Option<String>,
) {
    let notification = compose(
        kind,
        &NotificationContext {
            camp_name: &settings.camp_name,
            year,
            user,
            detail,
        },
    );
    dispatch(port, notification).await;
}

pub fn format_cents(cents: i64, currency: &str) -> String {
    format!("{}.{:02} {}", cents / 100, (cents % 100).abs(), currency)
}
