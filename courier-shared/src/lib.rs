pub mod ids;
pub mod pii;

pub use ids::new_delivery_id;
pub use pii::Masked;
