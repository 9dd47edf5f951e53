use anyhow::Context;
use async_trait::async_trait;

use super::Notifier;
use crate::services::booking::BookingNotice;

/// Posts a chat-style embed (Discord-compatible) for each new booking.
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

pub fn booking_payload(notice: &BookingNotice) -> serde_json::Value {
    serde_json::json!({
        "embeds": [{
            "title": "New booking",
            "color": 0x5449d0,
            "fields": [
                { "name": "Location", "value": notice.location.name, "inline": true },
                { "name": "Service", "value": notice.appointment_type.name, "inline": true },
                { "name": "When", "value": notice.local_start, "inline": true },
                { "name": "Customer", "value": notice.customer.name, "inline": true },
                { "name": "Email", "value": notice.customer.email, "inline": true },
            ],
            "timestamp": notice.appointment.created_at.to_rfc3339(),
        }]
    })
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn appointment_booked(&self, notice: &BookingNotice) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .json(&booking_payload(notice))
            .send()
            .await
            .context("failed to post booking webhook")?
            .error_for_status()
            .context("booking webhook returned error")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Appointment, AppointmentStatus, AppointmentType, Customer, Location,
    };

    #[test]
    fn test_booking_payload_fields() {
        let starts_at = "2025-06-16T07:00:00Z".parse().unwrap();
        let notice = BookingNotice {
            appointment: Appointment {
                id: "a-1".to_string(),
                location_id: "loc-1".to_string(),
                customer_id: "c-1".to_string(),
                appointment_type_id: "cut".to_string(),
                starts_at,
                status: AppointmentStatus::Planned,
                notes: None,
                created_at: starts_at,
            },
            customer: Customer {
                id: "c-1".to_string(),
                organization_id: "org-1".to_string(),
                name: "Erin".to_string(),
                email: "erin@example.com".to_string(),
                phone: None,
            },
            location: Location {
                id: "loc-1".to_string(),
                organization_id: "org-1".to_string(),
                name: "Main salon".to_string(),
                time_zone: "Europe/Brussels".to_string(),
                is_active: true,
            },
            appointment_type: AppointmentType {
                id: "cut".to_string(),
                organization_id: "org-1".to_string(),
                name: "Haircut".to_string(),
                description: None,
                duration_minutes: 30,
                price_cents: 2500,
                currency: "EUR".to_string(),
                is_active: true,
            },
            local_start: "2025-06-16 09:00".to_string(),
        };

        let payload = booking_payload(&notice);
        let fields = payload["embeds"][0]["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0]["value"], "Main salon");
        assert_eq!(fields[2]["value"], "2025-06-16 09:00");
        assert_eq!(fields[4]["value"], "erin@example.com");
    }
}
