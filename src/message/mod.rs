//! # Message en transit
//!
//! Abstraction d'une enveloppe SOAP partiellement parsée : collection
//! d'en-têtes, payload du corps, pièces jointes et indices transport.
//!
//! ## Architecture
//!
//! - [`WireMessage`] : le message, un exemplaire par appel, jamais partagé
//! - [`MessageHeader`] / [`HeaderList`] : en-têtes et recherche par QName
//! - [`Attachment`] : pièces jointes adressées par content-id
//! - [`PayloadCursor`] : lecture avant-seulement des enfants du payload
//!
//! Le parsing de l'enveloppe suit la tolérance habituelle : on repère
//! `Envelope`, `Header` et `Body` par nom local, quel que soit le préfixe.

mod attachment;
mod header;

pub use attachment::{Attachment, encode_content_id};
pub use header::{EndpointReference, HeaderList, MessageHeader};

use std::io::BufReader;

use xmltree::{Element, XMLNode};

use crate::qname::{QName, local_name};
use crate::soap::SoapVersion;

/// Erreur de parsing d'enveloppe
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("XML parse error: {0}")]
    XmlError(#[from] xmltree::ParseError),

    #[error("XML write error: {0}")]
    WriteError(#[from] xmltree::Error),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,
}

/// Message SOAP en transit.
///
/// Transitoire, un par appel; consommé et muté en place par les couches
/// de validation et de liaison. Le modèle partagé en lecture seule vit
/// ailleurs ([`crate::model`]).
#[derive(Debug, Clone, Default)]
pub struct WireMessage {
    /// En-têtes du message
    pub headers: HeaderList,

    /// Premier élément enfant du Body, `None` pour un corps vide
    pub payload: Option<Element>,

    /// Pièces jointes MIME
    pub attachments: Vec<Attachment>,

    /// Valeur de l'en-tête transport SOAPAction, si le transport l'a vue
    pub transport_action: Option<String>,

    /// Invocation locale (in-process), jamais reçue du réseau
    pub local_invocation: bool,
}

impl WireMessage {
    pub fn new(payload: Option<Element>) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    /// Parse une enveloppe SOAP complète
    pub fn parse(xml: &[u8]) -> Result<Self, MessageError> {
        let reader = BufReader::new(xml);
        let root = Element::parse(reader)?;

        if local_name(&root.name) != "Envelope" {
            return Err(MessageError::MissingEnvelope);
        }

        let mut headers = HeaderList::new();
        let mut payload = None;
        let mut body_seen = false;

        for node in &root.children {
            let Some(child) = node.as_element() else {
                continue;
            };
            match local_name(&child.name) {
                "Header" => {
                    for h in child.children.iter().filter_map(XMLNode::as_element) {
                        headers.add(MessageHeader::new(h.clone()));
                    }
                }
                "Body" => {
                    body_seen = true;
                    payload = child
                        .children
                        .iter()
                        .find_map(XMLNode::as_element)
                        .cloned();
                }
                _ => {}
            }
        }

        if !body_seen {
            return Err(MessageError::MissingBody);
        }

        Ok(Self {
            headers,
            payload,
            ..Self::default()
        })
    }

    /// QName du payload, `None` pour un corps vide
    pub fn payload_qname(&self) -> Option<QName> {
        self.payload.as_ref().map(QName::of_element)
    }

    /// Valeur de l'en-tête Action de la version d'adressage donnée
    pub fn action(&self, action_tag: &QName) -> Option<String> {
        self.headers.get(action_tag).map(MessageHeader::text)
    }

    /// Curseur avant-seulement sur les enfants du payload
    pub fn payload_cursor(&self) -> Option<PayloadCursor<'_>> {
        self.payload.as_ref().map(PayloadCursor::new)
    }

    /// Reconstruit l'enveloppe XML complète du message
    pub fn to_envelope(&self, version: SoapVersion) -> Element {
        let mut envelope = Element::new("s:Envelope");
        envelope
            .attributes
            .insert("xmlns:s".to_string(), version.envelope_ns().to_string());

        if !self.headers.is_empty() {
            let mut header = Element::new("s:Header");
            for h in self.headers.iter() {
                header.children.push(XMLNode::Element(h.element.clone()));
            }
            envelope.children.push(XMLNode::Element(header));
        }

        let mut body = Element::new("s:Body");
        if let Some(payload) = &self.payload {
            body.children.push(XMLNode::Element(payload.clone()));
        }
        envelope.children.push(XMLNode::Element(body));

        envelope
    }

    /// Sérialise l'enveloppe en chaîne XML
    pub fn to_xml(&self, version: SoapVersion) -> Result<String, MessageError> {
        let envelope = self.to_envelope(version);
        let mut buf = Vec::new();
        let config = xmltree::EmitterConfig::new()
            .write_document_declaration(true)
            .perform_indent(true)
            .indent_string("  ");
        envelope.write_with_config(&mut buf, config)?;
        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

/// Curseur avant-seulement sur les enfants élément d'un wrapper.
///
/// L'épuisement du flux n'est pas une suspension : `next_element` rend
/// simplement `None` une fois le dernier enfant consommé. Sauter un
/// enfant non reconnu revient à ne pas s'y arrêter, la lecture reprend
/// au frère suivant.
pub struct PayloadCursor<'a> {
    wrapper: &'a Element,
    pos: usize,
}

impl<'a> PayloadCursor<'a> {
    pub fn new(wrapper: &'a Element) -> Self {
        Self { wrapper, pos: 0 }
    }

    /// QName de l'élément wrapper lui-même
    pub fn wrapper_qname(&self) -> QName {
        QName::of_element(self.wrapper)
    }

    /// Élément wrapper complet
    pub fn wrapper(&self) -> &'a Element {
        self.wrapper
    }

    /// Enfant élément suivant, `None` en fin de wrapper
    pub fn next_element(&mut self) -> Option<&'a Element> {
        while self.pos < self.wrapper.children.len() {
            let node = &self.wrapper.children[self.pos];
            self.pos += 1;
            if let Some(elem) = node.as_element() {
                return Some(elem);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENVELOPE: &str = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"
            xmlns:wsa="http://www.w3.org/2005/08/addressing">
  <s:Header>
    <wsa:Action>urn:example:op</wsa:Action>
    <wsa:To>http://example.com/svc</wsa:To>
  </s:Header>
  <s:Body>
    <u:Play xmlns:u="urn:schemas-example:service:1">
      <InstanceID>0</InstanceID>
      <Speed>1</Speed>
    </u:Play>
  </s:Body>
</s:Envelope>"#;

    #[test]
    fn test_parse_envelope() {
        let msg = WireMessage::parse(ENVELOPE.as_bytes()).unwrap();
        assert_eq!(msg.headers.len(), 2);
        assert_eq!(
            msg.payload_qname().unwrap(),
            QName::new("urn:schemas-example:service:1", "Play")
        );
    }

    #[test]
    fn test_parse_missing_body() {
        let xml = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"/>"#;
        assert!(matches!(
            WireMessage::parse(xml.as_bytes()),
            Err(MessageError::MissingBody)
        ));
    }

    #[test]
    fn test_parse_not_an_envelope() {
        let xml = r#"<Other/>"#;
        assert!(matches!(
            WireMessage::parse(xml.as_bytes()),
            Err(MessageError::MissingEnvelope)
        ));
    }

    #[test]
    fn test_cursor_iterates_element_children_only() {
        let msg = WireMessage::parse(ENVELOPE.as_bytes()).unwrap();
        let mut cursor = msg.payload_cursor().unwrap();
        assert_eq!(cursor.next_element().unwrap().name, "InstanceID");
        assert_eq!(cursor.next_element().unwrap().name, "Speed");
        assert!(cursor.next_element().is_none());
    }

    #[test]
    fn test_envelope_round_trip() {
        let msg = WireMessage::parse(ENVELOPE.as_bytes()).unwrap();
        let xml = msg.to_xml(SoapVersion::Soap11).unwrap();
        let back = WireMessage::parse(xml.as_bytes()).unwrap();
        assert_eq!(back.headers.len(), 2);
        assert_eq!(back.payload_qname(), msg.payload_qname());
    }
}
