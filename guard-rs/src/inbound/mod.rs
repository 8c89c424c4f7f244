//! Inbound resolution engine
//!
//! Decides which Xray inbound tags each user's proxies may use:
//!
//! - [`parser`]: Xray configuration -> [`ProtocolIndex`]
//! - [`exclusion`]: exclusion rows -> [`ExclusionIndex`]
//! - [`resolver`]: index + exclusions + proxies -> [`ResolvedInbounds`]
//! - [`service`]: loads the live inputs and runs the resolver per request

pub mod exclusion;
pub mod parser;
pub mod resolver;
pub mod service;
pub mod types;

pub use exclusion::ExclusionIndex;
pub use parser::{load_protocol_index, ProtocolIndex};
pub use resolver::resolve;
pub use service::InboundService;
pub use types::{
    normalize_protocol, Exclusion, InboundDescriptor, Proxy, ResolvedInbounds, UserInbounds,
};
