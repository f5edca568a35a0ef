use uuid::Uuid;

/// Time-ordered identifier for a new delivery. UUID v7 strings sort
/// lexically in creation order.
pub fn new_delivery_id() -> Uuid {
    Uuid::now_v7()
}
