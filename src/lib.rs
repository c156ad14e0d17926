pub mod addressing;
pub mod binding;
pub mod endpoint;
pub mod message;
pub mod model;
pub mod qname;
pub mod soap;

// Réexports du chemin d'appel courant
pub use crate::endpoint::{EndpointError, InboundValidation, SoapEndpoint, SoapEndpointBuilder};
pub use crate::message::WireMessage;
pub use crate::model::{FaultModel, PortModel, PortModelBuilder};
pub use crate::qname::QName;
pub use crate::soap::SoapVersion;
