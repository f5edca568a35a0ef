pub mod error;
pub mod lookup;
pub mod models;
pub mod repository;
pub mod serviceability;

pub use error::{DeliveryError, DeliveryResult, LookupError, PartnerApiError, StoreError};
pub use models::{
    CreateDeliveryRequest, DeliveryOrder, DeliveryPartner, DeliveryStatus, ShipmentReceipt,
    StatusChange, TenantScope,
};
pub use repository::DeliveryStore;
