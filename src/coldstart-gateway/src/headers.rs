//! The header names the upstream router and this gateway's proxy layer
//! use to communicate workload identity and retry bookkeeping.

pub const SERVICE_NAME_HEADER: &str = "X-Rio-ServiceName";
pub const NAMESPACE_HEADER: &str = "X-Rio-Namespace";
pub const SERVICE_PORT_HEADER: &str = "X-Rio-ServicePort";
pub const RETRY_COUNT_HEADER: &str = "Request-Retry-Count";
