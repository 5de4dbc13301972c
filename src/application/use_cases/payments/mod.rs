pub mod confirmation;
pub mod payments;
pub mod record_payment;
pub mod refund_payment;
