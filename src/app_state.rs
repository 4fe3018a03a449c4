use std::sync::Arc;

use crate::clients::{Mailer, PaymentProvider};
use crate::config::Config;
use crate::db::TicketStore;
use crate::services::{
    BookingService, CheckInService, CheckoutService, Notifier, PaymentWebhookService,
};

/// Shared, read-only after start-up.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn TicketStore>,
    pub notifier: Notifier,
    pub bookings: BookingService,
    pub checkout: CheckoutService,
    pub webhooks: PaymentWebhookService,
    pub check_ins: CheckInService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn TicketStore>,
        payments: Arc<dyn PaymentProvider>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let notifier = Notifier::new(mailer, config.public_base_url.clone());
        let bookings = BookingService::new(store.clone(), notifier.clone());
        let checkout = CheckoutService::new(
            bookings.clone(),
            store.clone(),
            payments,
            config.public_base_url.clone(),
        );
        let webhooks = PaymentWebhookService::new(
            store.clone(),
            notifier.clone(),
            config.payments.webhook_secret.clone(),
            config.payments.webhook_tolerance_secs,
        );
        let check_ins = CheckInService::new(store.clone(), config.check_in_policy);

        Self {
            config: Arc::new(config),
            store,
            notifier,
            bookings,
            checkout,
            webhooks,
            check_ins,
        }
    }
}
