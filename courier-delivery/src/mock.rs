use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use courier_core::serviceability::{DeliveryOption, ServiceabilityQuery};
use courier_core::{
    DeliveryOrder, DeliveryPartner, DeliveryResult, DeliveryStatus, PartnerApiError, ShipmentReceipt,
};
use courier_partner::PartnerStrategy;

/// In-process stand-in for a logistics partner.
///
/// Issues tracking ids `AWB-123`, `AWB-124`, ... and counts calls.
pub struct MockPartnerStrategy {
    partner: DeliveryPartner,
    next_awb: AtomicU64,
    create_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
    create_error: Option<PartnerApiError>,
    cancel_error: Option<PartnerApiError>,
    live_status: Option<DeliveryStatus>,
}

impl Default for MockPartnerStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPartnerStrategy {
    pub fn new() -> Self {
        Self {
            partner: DeliveryPartner::Shiprocket,
            next_awb: AtomicU64::new(123),
            create_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
            create_error: None,
            cancel_error: None,
            live_status: None,
        }
    }

    pub fn failing_create(mut self, err: PartnerApiError) -> Self {
        self.create_error = Some(err);
        self
    }

    pub fn failing_cancel(mut self, err: PartnerApiError) -> Self {
        self.cancel_error = Some(err);
        self
    }

    pub fn with_live_status(mut self, status: DeliveryStatus) -> Self {
        self.live_status = Some(status);
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PartnerStrategy for MockPartnerStrategy {
    fn partner(&self) -> DeliveryPartner {
        self.partner
    }

    async fn create_shipment(&self, _order: &DeliveryOrder) -> DeliveryResult<ShipmentReceipt> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.create_error {
            return Err(err.clone().into());
        }

        let n = self.next_awb.fetch_add(1, Ordering::SeqCst);
        Ok(ShipmentReceipt {
            tracking_id: format!("AWB-{}", n),
            shipment_id: Some(n as i64),
            delivery_fee: Some(79.5),
        })
    }

    async fn cancel_shipment(&self, _order: &DeliveryOrder, _reason: &str) -> DeliveryResult<()> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        match &self.cancel_error {
            Some(err) => Err(err.clone().into()),
            None => Ok(()),
        }
    }

    async fn shipment_status(&self, order: &DeliveryOrder) -> DeliveryResult<DeliveryStatus> {
        Ok(self.live_status.unwrap_or(order.status))
    }

    async fn check_serviceability(&self, _query: &ServiceabilityQuery) -> Vec<DeliveryOption> {
        vec![DeliveryOption {
            courier_id: "51".to_string(),
            carrier_name: "Xpressbees Surface".to_string(),
            service_type: "3 days delivery".to_string(),
            description: "Estimated 3 days delivery".to_string(),
            cost: 87.0,
            currency: "INR".to_string(),
            estimated_delivery_days: Some(3),
            etd_raw: Some("3".to_string()),
            min_weight: 0.5,
            max_weight: 10.0,
        }]
    }
}
