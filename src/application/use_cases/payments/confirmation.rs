use uuid::Uuid;

use crate::application::errors::ServiceResult;
use crate::application::ports::camping_option_repository::CampingOptionRepository;
use crate::application::ports::payment_repository::PaymentRepository;
use crate::application::ports::registration_repository::RegistrationRepository;
use crate::domain::payments::payment::net_paid_cents;
use crate::domain::registrations::registration::{Registration, RegistrationStatus};
use crate::domain::users::user::User;

/// Moves a PENDING registration to CONFIRMED once completed payments cover its dues.
/// Returns the confirmed registration, or `None` when nothing changed.
pub async fn confirm_if_paid<R, P, O>(
    registrations: &R,
    payments: &P,
    options: &O,
    registration_id: Uuid,
    owner: &User,
) -> ServiceResult<Option<Registration>>
where
    R: RegistrationRepository + ?Sized,
    P: PaymentRepository + ?Sized,
    O: CampingOptionRepository + ?Sized,
{
    let Some(detail) = registrations.get(registration_id).await? else {
        return Ok(None);
    };
    if detail.registration.status != RegistrationStatus::Pending {
        return Ok(None);
    }
    let dues: i64 = options
        .get_many(&detail.camping_option_ids())
        .await?
        .iter()
        .map(|o| o.option.dues_for(owner.role.is_staff()))
        .sum();
    let paid = net_paid_cents(&payments.list_for_registration(registration_id).await?);
    if paid < dues {
        return Ok(None);
    }
    let confirmed = registrations
        .update(registration_id, Some(RegistrationStatus::Confirmed), None)
        .await?;
    if confirmed.is_some() {
        tracing::info!(registration_id = %registration_id, paid, dues, "registration_confirmed_by_payment");
    }
    Ok(confirmed)
}
