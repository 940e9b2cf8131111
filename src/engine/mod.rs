pub mod assignment;
pub mod bids;
pub mod deliveries;
pub mod disclosure;
pub mod lifecycle;
pub mod status;
