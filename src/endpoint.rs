//! # Endpoint SOAP
//!
//! Façade côté serveur : enchaîne la validation d'adressage, la
//! résolution d'opération, la liaison des arguments et la conversion des
//! faults, dans l'ordre contractuel.
//!
//! ## Architecture
//!
//! - [`SoapEndpointBuilder`] : assemblage, compilation des lecteurs au gel
//! - [`SoapEndpoint`] : partagé en lecture seule par tout le trafic
//! - [`InboundValidation`] : accepté, ou rejeté avec le message de fault
//!   prêt à renvoyer
//!
//! Une validation qui échoue produit un message de fault, jamais une
//! erreur Rust; seuls les défauts de configuration (en-tête d'adressage
//! inconnu, modèle incohérent) se propagent en [`EndpointError`].

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::binding::ArgumentsReader;
use xmltree::{Element, XMLNode};

use crate::addressing::{
    AddressingError, AddressingVersion, AnonymousPolicy, DefaultAnonymousPolicy, addressing_fault,
    check_action, check_cardinality, fault_detail_header, resolve_operation,
};
use crate::binding::{Args, BindError, Composite, compile_reader};
use crate::message::{MessageHeader, WireMessage};
use crate::model::{
    BoundOperation, FaultModel, ModelError, OperationBinding, PortModel, ServiceFault,
};
use crate::soap::{FaultError, ParsedFault, SoapVersion, build_fault_message, parse_fault};

/// Erreur irrécupérable de l'endpoint.
///
/// Défauts de configuration ou de liaison; jamais produite par un
/// message simplement invalide, qui donne un fault.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error(transparent)]
    Addressing(#[from] AddressingError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Fault(#[from] FaultError),
}

/// Verdict de la validation d'un message entrant
#[derive(Debug)]
pub enum InboundValidation {
    /// Message accepté, opération résolue si le contrat la connaît
    Accepted(Option<Arc<OperationBinding>>),

    /// Message rejeté, fault protocolaire prêt à renvoyer
    Rejected(WireMessage),
}

/// Endpoint SOAP gelé, partagé par tout le trafic
pub struct SoapEndpoint {
    soap: SoapVersion,
    port: Option<Arc<PortModel>>,
    faults: Arc<FaultModel>,
    policy: Arc<dyn AnonymousPolicy>,
    readers: HashMap<String, Composite>,
}

impl SoapEndpoint {
    pub fn soap_version(&self) -> SoapVersion {
        self.soap
    }

    /// Valide les en-têtes d'adressage d'un message entrant.
    ///
    /// Cardinalité d'abord, puis résolution d'opération, politique
    /// anonyme et validation d'action. Chaque étape en échec rend le
    /// message de fault correspondant.
    pub fn validate_inbound_headers(
        &self,
        msg: &WireMessage,
    ) -> Result<InboundValidation, EndpointError> {
        let Some(port) = &self.port else {
            return Ok(InboundValidation::Accepted(None));
        };
        let Some(version) = port.addressing_version() else {
            return Ok(InboundValidation::Accepted(
                resolve_operation(msg, port).cloned(),
            ));
        };

        let refs = match check_cardinality(msg, Some(port), self.soap, version) {
            Ok(refs) => refs,
            Err(err @ AddressingError::UnknownHeader(_)) => return Err(err.into()),
            Err(err) => return Ok(self.reject(err, version)),
        };

        let binding = resolve_operation(msg, port).cloned();
        let operation = binding.as_ref().map(|b| b.operation.as_ref());

        if let Err(err) = self.policy.check(operation, &refs) {
            return Ok(self.reject(err, version));
        }
        if let Err(err) = check_action(msg, binding.as_deref(), version) {
            return Ok(self.reject(err, version));
        }

        debug!(
            operation = binding.as_ref().map(|b| b.operation.name.as_str()),
            "inbound headers accepted"
        );
        Ok(InboundValidation::Accepted(binding))
    }

    /// Opération visée par un message, sans validation
    pub fn resolve(&self, msg: &WireMessage) -> Option<Arc<OperationBinding>> {
        self.port
            .as_ref()
            .and_then(|port| resolve_operation(msg, port).cloned())
    }

    /// Lie les arguments d'une requête entrante
    pub fn bind_request_arguments(
        &self,
        msg: &WireMessage,
        binding: &OperationBinding,
    ) -> Result<Args, EndpointError> {
        let mut args = Args::new(binding.arg_count);
        match self.readers.get(&binding.operation.name) {
            Some(reader) => reader.read_request(msg, &mut args)?,
            // liaison hors modèle : compilation à la volée
            None => compile_reader(binding)?.read_request(msg, &mut args)?,
        }
        Ok(args)
    }

    /// Message de fault d'une erreur sortante, liaison tirée du modèle.
    ///
    /// Quand l'adressage est actif, le message part avec l'action de
    /// fault de l'opération pour ce détail, à défaut l'action de fault
    /// par défaut de la version.
    pub fn build_fault(
        &self,
        err: &dyn ServiceFault,
        operation: Option<&BoundOperation>,
    ) -> WireMessage {
        let binding = self.faults.for_fault(err).map(Arc::as_ref);
        let mut msg = build_fault_message(self.soap, binding, err);

        if let Some(version) = self.port.as_ref().and_then(|p| p.addressing_version()) {
            let action = match (operation, binding) {
                (Some(op), Some(binding)) => op.fault_action(binding.detail_name(), version),
                _ => version.vocabulary().default_fault_action.to_string(),
            };
            msg.headers.add(action_header(version, &action));
        }
        msg
    }

    /// Interprète un message de fault entrant contre le modèle
    pub fn parse_fault(&self, msg: &WireMessage) -> Result<ParsedFault, FaultError> {
        parse_fault(msg, &self.faults, self.soap)
    }

    /// Message de fault d'une erreur d'adressage, détail et action selon
    /// la version SOAP
    fn reject(&self, err: AddressingError, version: AddressingVersion) -> InboundValidation {
        warn!(error = %err, "inbound message rejected");

        let fault = addressing_fault(&err, version, self.soap);
        let mut msg = WireMessage::new(Some(fault.to_element(self.soap)));

        // le fault voyage avec l'action de fault de la version
        msg.headers
            .add(action_header(version, version.vocabulary().default_fault_action));

        if self.soap == SoapVersion::Soap11 {
            // la structure plate de 1.1 loge le détail dans un en-tête
            msg.headers.add(fault_detail_header(&err, version));
        }

        InboundValidation::Rejected(msg)
    }
}

/// En-tête Action d'un message de fault sortant
fn action_header(version: AddressingVersion, action: &str) -> MessageHeader {
    let vocab = version.vocabulary();
    let mut elem = Element::new(&vocab.action_tag.local);
    elem.attributes
        .insert("xmlns".to_string(), vocab.ns_uri.to_string());
    elem.children.push(XMLNode::Text(action.to_string()));
    MessageHeader::with_name(vocab.action_tag.clone(), elem)
}

/// Assemble un [`SoapEndpoint`]
pub struct SoapEndpointBuilder {
    soap: SoapVersion,
    port: Option<Arc<PortModel>>,
    faults: FaultModel,
    policy: Arc<dyn AnonymousPolicy>,
}

impl SoapEndpointBuilder {
    pub fn new(soap: SoapVersion) -> Self {
        Self {
            soap,
            port: None,
            faults: FaultModel::new(),
            policy: Arc::new(DefaultAnonymousPolicy),
        }
    }

    pub fn port(mut self, port: Arc<PortModel>) -> Self {
        self.port = Some(port);
        self
    }

    pub fn faults(mut self, faults: FaultModel) -> Self {
        self.faults = faults;
        self
    }

    pub fn policy(mut self, policy: Arc<dyn AnonymousPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Gèle l'endpoint : compile les lecteurs de toutes les opérations
    pub fn build(self) -> Result<SoapEndpoint, ModelError> {
        let mut readers = HashMap::new();
        if let Some(port) = &self.port {
            for binding in port.operations() {
                readers.insert(binding.operation.name.clone(), compile_reader(binding)?);
            }
        }
        Ok(SoapEndpoint {
            soap: self.soap,
            port: self.port,
            faults: Arc::new(self.faults),
            policy: self.policy,
            readers,
        })
    }
}
