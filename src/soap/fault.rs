//! Conversion bidirectionnelle faults wire <-> erreurs typées.
//!
//! À la réception, le détail du fault décide de la forme restituée :
//! exactement un élément de détail enregistré dans le modèle donne une
//! erreur typée reconstruite, tout le reste (zéro détail, plusieurs,
//! QName inconnu) retombe sur un [`ProtocolFault`] portant le fault brut.
//!
//! À l'émission, un [`ProtocolFault`] (direct ou en cause d'une autre
//! erreur) ressort avec son code, sa raison et son rôle d'origine; toute
//! autre erreur part avec le code serveur par défaut de la version. Un
//! échec de sérialisation du détail dégrade en fault sans détail plutôt
//! que d'échouer l'émission.

use std::any::Any;

use tracing::{debug, warn};
use xmltree::{Element, XMLNode};

use super::SoapVersion;
use crate::message::WireMessage;
use crate::model::{FaultBinding, FaultModel, ServiceFault};
use crate::qname::{QName, local_name};

/// Erreur de conversion d'un fault
#[derive(Debug, thiserror::Error)]
pub enum FaultError {
    #[error("fault detail marshalling failed: {0}")]
    Marshal(String),

    #[error("malformed fault: {0}")]
    Parse(#[from] FaultParseError),
}

/// Erreur de parsing d'un élément Fault
#[derive(Debug, Clone, thiserror::Error)]
pub enum FaultParseError {
    #[error("payload is not a Fault element")]
    NotAFault,

    #[error("Fault has no {0} child")]
    MissingChild(&'static str),
}

/// Fault SOAP sous forme structurée, indépendante de la version.
///
/// `detail` porte les enfants du conteneur de détail, pas le conteneur
/// lui-même (son nom diffère entre les deux versions).
#[derive(Debug, Clone, PartialEq)]
pub struct SoapFault {
    pub code: QName,

    /// Chaîne de subcodes, SOAP 1.2 uniquement
    pub subcodes: Vec<QName>,

    pub reason: String,
    pub role: Option<String>,
    pub detail: Vec<Element>,
}

impl SoapFault {
    pub fn new(code: QName, reason: impl Into<String>) -> Self {
        Self {
            code,
            subcodes: Vec::new(),
            reason: reason.into(),
            role: None,
            detail: Vec::new(),
        }
    }

    pub fn with_subcode(mut self, subcode: QName) -> Self {
        self.subcodes.push(subcode);
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_detail(mut self, elem: Element) -> Self {
        self.detail.push(elem);
        self
    }

    /// Sérialise le fault dans la structure de la version donnée
    pub fn to_element(&self, version: SoapVersion) -> Element {
        let mut fault = Element::new("s:Fault");
        fault
            .attributes
            .insert("xmlns:s".to_string(), version.envelope_ns().to_string());

        match version {
            SoapVersion::Soap11 => self.fill_11(&mut fault, version),
            SoapVersion::Soap12 => self.fill_12(&mut fault, version),
        }
        fault
    }

    // faultcode/faultstring/faultactor/detail plats, enfants non qualifiés
    fn fill_11(&self, fault: &mut Element, version: SoapVersion) {
        let mut code = Element::new("faultcode");
        let text = qualified_value(&mut code, &self.code, version);
        code.children.push(XMLNode::Text(text));
        fault.children.push(XMLNode::Element(code));

        let mut string = Element::new("faultstring");
        string.children.push(XMLNode::Text(self.reason.clone()));
        fault.children.push(XMLNode::Element(string));

        if let Some(role) = &self.role {
            let mut actor = Element::new("faultactor");
            actor.children.push(XMLNode::Text(role.clone()));
            fault.children.push(XMLNode::Element(actor));
        }

        if !self.detail.is_empty() {
            let mut detail = Element::new("detail");
            for elem in &self.detail {
                detail.children.push(XMLNode::Element(elem.clone()));
            }
            fault.children.push(XMLNode::Element(detail));
        }
    }

    // Code/Value avec chaîne Subcode imbriquée, Reason/Text, Role, Detail
    fn fill_12(&self, fault: &mut Element, version: SoapVersion) {
        let mut code = Element::new("s:Code");
        let mut value = Element::new("s:Value");
        let text = qualified_value(&mut value, &self.code, version);
        value.children.push(XMLNode::Text(text));
        code.children.push(XMLNode::Element(value));

        // imbrication de l'intérieur vers l'extérieur
        let mut chain: Option<Element> = None;
        for sub in self.subcodes.iter().rev() {
            let mut value = Element::new("s:Value");
            let text = qualified_value(&mut value, sub, version);
            value.children.push(XMLNode::Text(text));

            let mut subcode = Element::new("s:Subcode");
            subcode.children.push(XMLNode::Element(value));
            if let Some(inner) = chain.take() {
                subcode.children.push(XMLNode::Element(inner));
            }
            chain = Some(subcode);
        }
        if let Some(subcode) = chain {
            code.children.push(XMLNode::Element(subcode));
        }
        fault.children.push(XMLNode::Element(code));

        let mut text = Element::new("s:Text");
        text.attributes
            .insert("xml:lang".to_string(), "en".to_string());
        text.children.push(XMLNode::Text(self.reason.clone()));
        let mut reason = Element::new("s:Reason");
        reason.children.push(XMLNode::Element(text));
        fault.children.push(XMLNode::Element(reason));

        if let Some(role) = &self.role {
            let mut elem = Element::new("s:Role");
            elem.children.push(XMLNode::Text(role.clone()));
            fault.children.push(XMLNode::Element(elem));
        }

        if !self.detail.is_empty() {
            let mut detail = Element::new("s:Detail");
            for elem in &self.detail {
                detail.children.push(XMLNode::Element(elem.clone()));
            }
            fault.children.push(XMLNode::Element(detail));
        }
    }

    /// Parse un élément Fault de la version donnée
    pub fn parse(elem: &Element, version: SoapVersion) -> Result<Self, FaultParseError> {
        if local_name(&elem.name) != "Fault" {
            return Err(FaultParseError::NotAFault);
        }
        match version {
            SoapVersion::Soap11 => Self::parse_11(elem),
            SoapVersion::Soap12 => Self::parse_12(elem),
        }
    }

    fn parse_11(elem: &Element) -> Result<Self, FaultParseError> {
        let code_elem = child(elem, "faultcode")
            .ok_or(FaultParseError::MissingChild("faultcode"))?;
        let code = resolve_prefixed(code_elem, text_of(code_elem).trim());

        Ok(Self {
            code,
            subcodes: Vec::new(),
            reason: child(elem, "faultstring").map(text_of).unwrap_or_default(),
            role: child(elem, "faultactor").map(text_of),
            detail: child(elem, "detail")
                .map(element_children)
                .unwrap_or_default(),
        })
    }

    fn parse_12(elem: &Element) -> Result<Self, FaultParseError> {
        let code_elem = child(elem, "Code").ok_or(FaultParseError::MissingChild("Code"))?;
        let value = child(code_elem, "Value").ok_or(FaultParseError::MissingChild("Value"))?;
        let code = resolve_prefixed(value, text_of(value).trim());

        let mut subcodes = Vec::new();
        let mut current = code_elem;
        while let Some(subcode) = child(current, "Subcode") {
            if let Some(value) = child(subcode, "Value") {
                subcodes.push(resolve_prefixed(value, text_of(value).trim()));
            }
            current = subcode;
        }

        let reason = child(elem, "Reason")
            .and_then(|r| child(r, "Text"))
            .map(text_of)
            .unwrap_or_default();

        Ok(Self {
            code,
            subcodes,
            reason,
            role: child(elem, "Role").map(text_of),
            detail: child(elem, "Detail")
                .map(element_children)
                .unwrap_or_default(),
        })
    }
}

/// Fault protocolaire : reçu du réseau sans liaison typée, ou construit
/// localement avec un code précis à faire passer tel quel
#[derive(Debug, Clone, thiserror::Error)]
#[error("SOAP fault: {}", .fault.reason)]
pub struct ProtocolFault {
    pub fault: SoapFault,
}

impl ProtocolFault {
    pub fn new(fault: SoapFault) -> Self {
        Self { fault }
    }
}

/// Forme restituée d'un fault entrant
#[derive(Debug)]
pub enum ParsedFault {
    /// Détail reconnu par le modèle, erreur reconstruite
    Typed(Box<dyn ServiceFault>),

    /// Fault brut, aucune liaison applicable
    Protocol(ProtocolFault),
}

/// Interprète un message de fault entrant contre le modèle.
///
/// La restitution typée exige exactement un élément de détail, dont le
/// QName est enregistré; toute autre combinaison rend le fault brut.
pub fn parse_fault(
    msg: &WireMessage,
    model: &FaultModel,
    version: SoapVersion,
) -> Result<ParsedFault, FaultError> {
    let payload = msg.payload.as_ref().ok_or(FaultParseError::NotAFault)?;
    let fault = SoapFault::parse(payload, version)?;

    if let [detail] = fault.detail.as_slice() {
        if let Some(binding) = model.by_detail(&QName::of_element(detail)) {
            let typed = binding.construct(fault.reason.clone(), detail)?;
            return Ok(ParsedFault::Typed(typed));
        }
        debug!(detail = %QName::of_element(detail), "unregistered fault detail");
    }

    Ok(ParsedFault::Protocol(ProtocolFault { fault }))
}

/// Construit le message de fault d'une erreur sortante.
///
/// Un [`ProtocolFault`], porté directement ou en cause, passe avec son
/// code, sa raison et son rôle d'origine. Sinon code serveur par défaut
/// de la version et raison tirée de l'erreur. Le détail n'est émis que
/// si une liaison est fournie et que la sérialisation réussit.
pub fn build_fault_message(
    version: SoapVersion,
    binding: Option<&FaultBinding>,
    err: &dyn ServiceFault,
) -> WireMessage {
    let mut fault = match find_protocol(err) {
        Some(protocol) => protocol.fault.clone(),
        None => SoapFault::new(version.default_server_fault_code(), err.to_string()),
    };
    if fault.reason.is_empty() {
        fault.reason = err.to_string();
    }

    if let Some(binding) = binding {
        match binding.extract(err) {
            Ok(detail) => fault.detail = vec![detail],
            Err(e) => {
                warn!(error = %e, "fault detail marshalling failed, sending default fault");
                fault = SoapFault::new(version.default_server_fault_code(), err.to_string());
            }
        }
    }

    WireMessage::new(Some(fault.to_element(version)))
}

/// Message de fault minimal : fault-string et code optionnel
pub fn build_simple_fault_message(
    version: SoapVersion,
    fault_string: &str,
    code: Option<QName>,
) -> WireMessage {
    let code = code.unwrap_or_else(|| version.default_server_fault_code());
    let fault = SoapFault::new(code, fault_string);
    WireMessage::new(Some(fault.to_element(version)))
}

fn find_protocol(err: &dyn ServiceFault) -> Option<&ProtocolFault> {
    let any: &dyn Any = err;
    if let Some(protocol) = any.downcast_ref::<ProtocolFault>() {
        return Some(protocol);
    }
    let err: &dyn std::error::Error = err;
    err.source()
        .and_then(|source| source.downcast_ref::<ProtocolFault>())
}

/// Texte qualifié d'un QName, préfixe déclaré sur l'élément porteur
fn qualified_value(elem: &mut Element, name: &QName, version: SoapVersion) -> String {
    if name.namespace.is_empty() {
        name.local.clone()
    } else if name.namespace == version.envelope_ns() {
        format!("s:{}", name.local)
    } else {
        elem.attributes
            .insert("xmlns:c".to_string(), name.namespace.clone());
        format!("c:{}", name.local)
    }
}

/// Résout un texte préfixé ("s:Client") contre les namespaces en portée
fn resolve_prefixed(elem: &Element, text: &str) -> QName {
    match text.split_once(':') {
        Some((prefix, local)) => {
            let ns = elem
                .namespaces
                .as_ref()
                .and_then(|n| n.get(prefix))
                .unwrap_or("");
            QName::new(ns, local)
        }
        None => QName::local(text),
    }
}

fn child<'a>(elem: &'a Element, local: &str) -> Option<&'a Element> {
    elem.children
        .iter()
        .filter_map(XMLNode::as_element)
        .find(|c| local_name(&c.name) == local)
}

fn text_of(elem: &Element) -> String {
    elem.get_text().unwrap_or_default().to_string()
}

fn element_children(elem: &Element) -> Vec<Element> {
    elem.children
        .iter()
        .filter_map(XMLNode::as_element)
        .cloned()
        .collect()
}
