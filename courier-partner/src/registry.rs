use std::collections::HashMap;
use std::sync::Arc;

use courier_core::{DeliveryError, DeliveryPartner, DeliveryResult};
use tracing::{info, warn};

use crate::strategy::PartnerStrategy;

/// Partner -> strategy lookup. Built once at startup and read-only afterwards.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<DeliveryPartner, Arc<dyn PartnerStrategy>>,
}

impl StrategyRegistry {
    pub fn new(strategies: Vec<Arc<dyn PartnerStrategy>>) -> Self {
        let mut registry = Self::default();
        for strategy in strategies {
            registry = registry.with(strategy);
        }
        registry
    }

    /// Register a strategy. A later registration for the same partner replaces the earlier one.
    pub fn with(mut self, strategy: Arc<dyn PartnerStrategy>) -> Self {
        let partner = strategy.partner();
        if self.strategies.insert(partner, strategy).is_some() {
            warn!(partner = %partner, "Replacing previously registered delivery strategy");
        } else {
            info!(partner = %partner, "Registered delivery strategy");
        }
        self
    }

    pub fn resolve(&self, partner: DeliveryPartner) -> DeliveryResult<Arc<dyn PartnerStrategy>> {
        self.strategies
            .get(&partner)
            .cloned()
            .ok_or_else(|| DeliveryError::Configuration(format!("No delivery strategy found for partner: {}", partner)))
    }

    /// Resolve by partner name, case-insensitively.
    pub fn resolve_name(&self, name: &str) -> DeliveryResult<Arc<dyn PartnerStrategy>> {
        let partner: DeliveryPartner = name.parse()?;
        self.resolve(partner)
    }

    pub fn partners(&self) -> Vec<DeliveryPartner> {
        let mut partners: Vec<_> = self.strategies.keys().copied().collect();
        partners.sort_by_key(|p| p.as_str());
        partners
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_core::serviceability::{DeliveryOption, ServiceabilityQuery};
    use courier_core::{DeliveryOrder, DeliveryStatus, ShipmentReceipt};

    struct NamedStrategy(&'static str);

    #[async_trait]
    impl PartnerStrategy for NamedStrategy {
        fn partner(&self) -> DeliveryPartner {
            DeliveryPartner::Shiprocket
        }

        async fn create_shipment(&self, _order: &DeliveryOrder) -> DeliveryResult<ShipmentReceipt> {
            Ok(ShipmentReceipt {
                tracking_id: self.0.to_string(),
                shipment_id: None,
                delivery_fee: None,
            })
        }

        async fn cancel_shipment(&self, _order: &DeliveryOrder, _reason: &str) -> DeliveryResult<()> {
            Ok(())
        }

        async fn shipment_status(&self, order: &DeliveryOrder) -> DeliveryResult<DeliveryStatus> {
            Ok(order.status)
        }

        async fn check_serviceability(&self, _query: &ServiceabilityQuery) -> Vec<DeliveryOption> {
            Vec::new()
        }
    }

    #[test]
    fn test_resolve_by_enum_and_name() {
        let registry = StrategyRegistry::new(vec![Arc::new(NamedStrategy("first")) as Arc<dyn PartnerStrategy>]);

        assert_eq!(registry.resolve(DeliveryPartner::Shiprocket).unwrap().partner(), DeliveryPartner::Shiprocket);
        assert!(registry.resolve_name("shiprocket").is_ok());
        assert!(matches!(
            registry.resolve_name("DUNZO"),
            Err(DeliveryError::Configuration(msg)) if msg.contains("DUNZO")
        ));
    }

    #[test]
    fn test_empty_registry_is_configuration_error() {
        let registry = StrategyRegistry::default();
        assert!(matches!(
            registry.resolve(DeliveryPartner::Shiprocket),
            Err(DeliveryError::Configuration(_))
        ));
        assert!(registry.partners().is_empty());
    }

    #[tokio::test]
    async fn test_later_registration_wins() {
        let registry = StrategyRegistry::default()
            .with(Arc::new(NamedStrategy("first")))
            .with(Arc::new(NamedStrategy("second")));
        let order = DeliveryOrder::new(
            &courier_core::TenantScope::new("org", "br"),
            DeliveryPartner::Shiprocket,
            &courier_core::CreateDeliveryRequest {
                order_id: "O-1".to_string(),
                ..Default::default()
            },
        );

        let receipt = registry
            .resolve(DeliveryPartner::Shiprocket)
            .unwrap()
            .create_shipment(&order)
            .await
            .unwrap();
        assert_eq!(receipt.tracking_id, "second");
        assert_eq!(registry.partners(), vec![DeliveryPartner::Shiprocket]);
    }
}
