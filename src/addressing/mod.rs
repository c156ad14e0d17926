//! # Module WS-Addressing
//!
//! Vocabulaires d'adressage, validation des en-têtes entrants et
//! dispatch par action.
//!
//! ## Fonctionnalités
//!
//! - ✅ Les deux vocabulaires : recommandation W3C et soumission 2004/08
//! - ✅ Validation de cardinalité des en-têtes (module [`validator`])
//! - ✅ Validation d'action et résolution d'opération (module [`action`])
//! - ✅ Construction des faults d'adressage (module [`fault`])
//!
//! Les deux vocabulaires sont des singletons en lecture seule construits
//! au premier accès et partagés par tout le trafic.

mod action;
mod fault;
mod validator;

pub use action::{check_action, resolve_operation};
pub use fault::{addressing_fault, fault_detail_header};
pub use validator::{AnonymousPolicy, DefaultAnonymousPolicy, ScannedReferences, check_cardinality};

use once_cell::sync::Lazy;

use crate::qname::QName;

/// Version du vocabulaire WS-Addressing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingVersion {
    /// Recommandation W3C (2005/08)
    W3c,

    /// Soumission membre antérieure (2004/08)
    MemberSubmission,
}

/// Vocabulaire d'une version d'adressage.
///
/// Immuable, construit une fois au démarrage, partagé en lecture seule.
#[derive(Debug)]
pub struct AddressingVocabulary {
    /// Namespace du vocabulaire
    pub ns_uri: &'static str,

    pub from_tag: QName,
    pub to_tag: QName,
    pub reply_to_tag: QName,
    pub fault_to_tag: QName,
    pub action_tag: QName,
    pub message_id_tag: QName,
    /// Peut se répéter, exempt de la règle d'unicité
    pub relates_to_tag: QName,
    /// Détail de fault (SOAP 1.1 uniquement), exempt lui aussi
    pub fault_detail_tag: QName,

    /// Subcode : en-tête d'adressage invalide
    pub invalid_map_tag: QName,
    /// Subsubcode : cardinalité invalide
    pub invalid_cardinality_tag: QName,
    /// Subcode : en-tête d'adressage obligatoire absent
    pub map_required_tag: QName,
    /// Subcode : action non supportée
    pub action_not_supported_tag: QName,
    /// Élément de détail nommant l'en-tête fautif
    pub problem_header_qname_tag: QName,
    /// Élément de détail nommant l'action fautive
    pub problem_action_tag: QName,

    /// URI de l'endpoint anonyme
    pub anonymous_uri: &'static str,

    /// Action par défaut des messages de fault
    pub default_fault_action: &'static str,

    /// Gabarits de fault-string, propres à chaque version
    pub invalid_map_text: &'static str,
    pub map_required_text: &'static str,
    /// Formaté avec l'action reçue
    pub action_not_supported_text: &'static str,
}

const W3C_NS: &str = "http://www.w3.org/2005/08/addressing";
const MEMBER_NS: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing";

static W3C_VOCABULARY: Lazy<AddressingVocabulary> = Lazy::new(|| AddressingVocabulary {
    ns_uri: W3C_NS,
    from_tag: QName::new(W3C_NS, "From"),
    to_tag: QName::new(W3C_NS, "To"),
    reply_to_tag: QName::new(W3C_NS, "ReplyTo"),
    fault_to_tag: QName::new(W3C_NS, "FaultTo"),
    action_tag: QName::new(W3C_NS, "Action"),
    message_id_tag: QName::new(W3C_NS, "MessageID"),
    relates_to_tag: QName::new(W3C_NS, "RelatesTo"),
    fault_detail_tag: QName::new(W3C_NS, "FaultDetail"),
    invalid_map_tag: QName::new(W3C_NS, "InvalidAddressingHeader"),
    invalid_cardinality_tag: QName::new(W3C_NS, "InvalidCardinality"),
    map_required_tag: QName::new(W3C_NS, "MessageAddressingHeaderRequired"),
    action_not_supported_tag: QName::new(W3C_NS, "ActionNotSupported"),
    problem_header_qname_tag: QName::new(W3C_NS, "ProblemHeaderQName"),
    problem_action_tag: QName::new(W3C_NS, "ProblemAction"),
    anonymous_uri: "http://www.w3.org/2005/08/addressing/anonymous",
    default_fault_action: "http://www.w3.org/2005/08/addressing/fault",
    invalid_map_text: "A header representing a Message Addressing Property is not valid \
                       and the message cannot be processed",
    map_required_text: "A required header representing a Message Addressing Property \
                        is not present",
    action_not_supported_text: "The \"{}\" cannot be processed at the receiver",
});

static MEMBER_VOCABULARY: Lazy<AddressingVocabulary> = Lazy::new(|| AddressingVocabulary {
    ns_uri: MEMBER_NS,
    from_tag: QName::new(MEMBER_NS, "From"),
    to_tag: QName::new(MEMBER_NS, "To"),
    reply_to_tag: QName::new(MEMBER_NS, "ReplyTo"),
    fault_to_tag: QName::new(MEMBER_NS, "FaultTo"),
    action_tag: QName::new(MEMBER_NS, "Action"),
    message_id_tag: QName::new(MEMBER_NS, "MessageID"),
    relates_to_tag: QName::new(MEMBER_NS, "RelatesTo"),
    fault_detail_tag: QName::new(MEMBER_NS, "FaultDetail"),
    invalid_map_tag: QName::new(MEMBER_NS, "InvalidMessageInformationHeader"),
    invalid_cardinality_tag: QName::new(MEMBER_NS, "InvalidMessageInformationHeader"),
    map_required_tag: QName::new(MEMBER_NS, "MessageInformationHeaderRequired"),
    action_not_supported_tag: QName::new(MEMBER_NS, "ActionNotSupported"),
    problem_header_qname_tag: QName::new(MEMBER_NS, "ProblemHeaderQName"),
    problem_action_tag: QName::new(MEMBER_NS, "ProblemAction"),
    anonymous_uri: "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous",
    default_fault_action: "http://schemas.xmlsoap.org/ws/2004/08/addressing/fault",
    invalid_map_text: "A message information header is not valid and the message \
                       cannot be processed",
    map_required_text: "A required message information header, To, MessageID, or \
                        Action, is not present",
    action_not_supported_text: "The \"{}\" cannot be processed at the receiver",
});

impl AddressingVersion {
    /// Vocabulaire de cette version, singleton partagé
    pub fn vocabulary(&self) -> &'static AddressingVocabulary {
        match self {
            AddressingVersion::W3c => &W3C_VOCABULARY,
            AddressingVersion::MemberSubmission => &MEMBER_VOCABULARY,
        }
    }
}

/// Erreurs de validation d'adressage.
///
/// Les trois premières variantes sont traduites en fault protocolaire à
/// la frontière de validation; `UnknownHeader` est un défaut de
/// configuration irrécupérable et se propage telle quelle.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AddressingError {
    #[error("invalid cardinality of addressing header {tag}")]
    InvalidCardinality { tag: QName },

    #[error("required addressing header {tag} is absent")]
    MapRequired { tag: QName },

    #[error("action {} is not supported", .action.as_deref().unwrap_or("(required but absent)"))]
    ActionNotSupported { action: Option<String> },

    #[error("unknown header {0} in the addressing namespace")]
    UnknownHeader(QName),
}
