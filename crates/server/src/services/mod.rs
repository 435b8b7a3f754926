//! Business logic between routes and repositories.

pub mod catalog;
pub mod orders;
pub mod tracking;

pub use catalog::ServiceCatalog;
pub use orders::{OrderService, PlaceOrder, Quote};
pub use tracking::{LocationService, LocationUpdate, OrderEta};
