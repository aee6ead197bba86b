pub mod batch;
pub mod payload;
pub mod retry;
pub mod shipping;
pub mod transport;

pub use batch::Batch;
pub use retry::{retry, Backoff, RetryPolicy};
pub use shipping::{FlushError, SendError, ShippingClient, ShippingClientBuilder};
pub use transport::{DeliveryError, HttpTransport, Transport};
