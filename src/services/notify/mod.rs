pub mod webhook;

use async_trait::async_trait;

use crate::services::booking::BookingNotice;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn appointment_booked(&self, notice: &BookingNotice) -> anyhow::Result<()>;
}

/// Records bookings in the log only. Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn appointment_booked(&self, notice: &BookingNotice) -> anyhow::Result<()> {
        tracing::info!(
            appointment_id = %notice.appointment.id,
            location = %notice.location.name,
            service = %notice.appointment_type.name,
            customer = %notice.customer.email,
            local_start = %notice.local_start,
            "new booking"
        );
        Ok(())
    }
}
