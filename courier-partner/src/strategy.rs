use async_trait::async_trait;
use courier_core::serviceability::{DeliveryOption, ServiceabilityQuery};
use courier_core::{DeliveryOrder, DeliveryPartner, DeliveryResult, DeliveryStatus, ShipmentReceipt};

/// Partner-specific delivery behavior. One implementation per [`DeliveryPartner`].
#[async_trait]
pub trait PartnerStrategy: Send + Sync {
    fn partner(&self) -> DeliveryPartner;

    /// Book the shipment with the partner. On success the receipt carries
    /// the partner's tracking id.
    async fn create_shipment(&self, order: &DeliveryOrder) -> DeliveryResult<ShipmentReceipt>;

    async fn cancel_shipment(&self, order: &DeliveryOrder, reason: &str) -> DeliveryResult<()>;

    /// Current canonical status as reported live by the partner.
    async fn shipment_status(&self, order: &DeliveryOrder) -> DeliveryResult<DeliveryStatus>;

    async fn check_serviceability(&self, query: &ServiceabilityQuery) -> Vec<DeliveryOption>;
}
