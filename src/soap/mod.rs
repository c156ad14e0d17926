//! # Module SOAP
//!
//! Constantes des deux versions du protocole et représentation des faults.
//!
//! ## Fonctionnalités
//!
//! - ✅ Constantes d'enveloppe SOAP 1.1 et 1.2
//! - ✅ Codes de fault par défaut (Server/Receiver, Client/Sender)
//! - ✅ Construction et parsing de payloads `Fault`
//! - ✅ Conversion exceptions typées <-> faults (module [`fault`])
//!
//! Les différences structurelles entre les deux versions (code plat en 1.1,
//! imbrication Code/Subcode en 1.2, rôle implicite) sont centralisées ici.

mod fault;

pub use fault::{
    FaultError, FaultParseError, ParsedFault, ProtocolFault, SoapFault, build_fault_message,
    build_simple_fault_message, parse_fault,
};

use crate::qname::QName;

/// Version du protocole SOAP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapVersion {
    Soap11,
    Soap12,
}

impl SoapVersion {
    /// Namespace de l'enveloppe
    pub fn envelope_ns(&self) -> &'static str {
        match self {
            SoapVersion::Soap11 => "http://schemas.xmlsoap.org/soap/envelope/",
            SoapVersion::Soap12 => "http://www.w3.org/2003/05/soap-envelope",
        }
    }

    /// Code de fault serveur par défaut (Server en 1.1, Receiver en 1.2)
    pub fn default_server_fault_code(&self) -> QName {
        match self {
            SoapVersion::Soap11 => QName::new(self.envelope_ns(), "Server"),
            SoapVersion::Soap12 => QName::new(self.envelope_ns(), "Receiver"),
        }
    }

    /// Code de fault émetteur (Client en 1.1, Sender en 1.2)
    pub fn sender_fault_code(&self) -> QName {
        match self {
            SoapVersion::Soap11 => QName::new(self.envelope_ns(), "Client"),
            SoapVersion::Soap12 => QName::new(self.envelope_ns(), "Sender"),
        }
    }

    /// Rôle implicite du destinataire final.
    ///
    /// Seul SOAP 1.2 attache explicitement un rôle aux en-têtes; la
    /// validation de portée n'utilise cette valeur qu'en 1.2.
    pub fn implicit_role(&self) -> &'static str {
        match self {
            SoapVersion::Soap11 => "http://schemas.xmlsoap.org/soap/actor/next",
            SoapVersion::Soap12 => "http://www.w3.org/2003/05/soap-envelope/role/ultimateReceiver",
        }
    }
}
