pub mod analysis;
pub mod payment_event;
pub mod plan;
