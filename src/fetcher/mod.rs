pub mod backoff;
pub mod resilient;
pub mod transport;

pub use backoff::BackoffPolicy;
pub use resilient::{FetchPolicy, ResilientFetcher};
pub use transport::{
    transport_order, DirectTransport, ProxiedTransport, Transport, TransportResponse,
};
