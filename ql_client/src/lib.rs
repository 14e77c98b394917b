pub mod cancel;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod handshake;
pub mod headers;
pub mod query;
pub mod transport;

pub use cancel::CancelToken;
pub use config::ClientConfig;
pub use descriptor::AuthLevel;
pub use descriptor::HttpMethod;
pub use descriptor::RequestDescriptor;
pub use errors::ClientError;
pub use errors::Result;
pub use headers::HeaderLimitMaps;
pub use query::DeferredQuery;
pub use query::DeferredQueryBuilder;
pub use transport::HttpTransport;
pub use transport::Transport;
pub use transport::TransportConfig;
pub use transport::TransportReply;
