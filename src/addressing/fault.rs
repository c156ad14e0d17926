//! Construction des faults d'adressage.
//!
//! La traduction dépend de la version SOAP : en 1.2 le code est le code
//! émetteur et la cause précise descend dans la chaîne de subcodes, avec
//! un élément de détail nommant l'en-tête ou l'action fautive; en 1.1,
//! sans subcodes, le tag précis devient directement le faultcode et le
//! détail part dans un en-tête `FaultDetail` séparé.

use xmltree::{Element, XMLNode};

use super::{AddressingError, AddressingVersion, AddressingVocabulary};
use crate::message::MessageHeader;
use crate::qname::QName;
use crate::soap::{SoapFault, SoapVersion};

/// Traduit une erreur de validation en fault protocolaire
pub fn addressing_fault(
    err: &AddressingError,
    version: AddressingVersion,
    soap: SoapVersion,
) -> SoapFault {
    let vocab = version.vocabulary();

    match err {
        AddressingError::InvalidCardinality { tag } => build(
            soap,
            vocab.invalid_map_text,
            &vocab.invalid_cardinality_tag,
            &[&vocab.invalid_map_tag, &vocab.invalid_cardinality_tag],
            problem_header(vocab, tag),
        ),
        AddressingError::UnknownHeader(tag) => build(
            soap,
            vocab.invalid_map_text,
            &vocab.invalid_map_tag,
            &[&vocab.invalid_map_tag],
            problem_header(vocab, tag),
        ),
        AddressingError::MapRequired { tag } => build(
            soap,
            vocab.map_required_text,
            &vocab.map_required_tag,
            &[&vocab.map_required_tag],
            problem_header(vocab, tag),
        ),
        AddressingError::ActionNotSupported { action } => {
            let action = action.as_deref().unwrap_or("");
            let reason = vocab.action_not_supported_text.replacen("{}", action, 1);
            build(
                soap,
                &reason,
                &vocab.action_not_supported_tag,
                &[&vocab.action_not_supported_tag],
                problem_action(vocab, action),
            )
        }
    }
}

fn build(
    soap: SoapVersion,
    reason: &str,
    flat_code: &QName,
    subcodes: &[&QName],
    detail: Element,
) -> SoapFault {
    match soap {
        // pas de subcodes en 1.1 : le tag précis devient le code, le
        // détail voyage dans l'en-tête FaultDetail
        SoapVersion::Soap11 => SoapFault::new(flat_code.clone(), reason),
        SoapVersion::Soap12 => {
            let mut fault = SoapFault::new(soap.sender_fault_code(), reason).with_detail(detail);
            for sub in subcodes {
                fault = fault.with_subcode((*sub).clone());
            }
            fault
        }
    }
}

/// En-tête `FaultDetail` d'un fault SOAP 1.1, porteur du détail que la
/// structure plate du fault ne peut pas loger
pub fn fault_detail_header(err: &AddressingError, version: AddressingVersion) -> MessageHeader {
    let vocab = version.vocabulary();
    let problem = match err {
        AddressingError::InvalidCardinality { tag }
        | AddressingError::MapRequired { tag }
        | AddressingError::UnknownHeader(tag) => problem_header(vocab, tag),
        AddressingError::ActionNotSupported { action } => {
            problem_action(vocab, action.as_deref().unwrap_or(""))
        }
    };

    let mut elem = Element::new(&vocab.fault_detail_tag.local);
    elem.attributes
        .insert("xmlns".to_string(), vocab.ns_uri.to_string());
    elem.children.push(XMLNode::Element(problem));
    MessageHeader::with_name(vocab.fault_detail_tag.clone(), elem)
}

// <ProblemHeaderQName>wsa:To</ProblemHeaderQName>
fn problem_header(vocab: &AddressingVocabulary, tag: &QName) -> Element {
    let mut elem = Element::new(&vocab.problem_header_qname_tag.local);
    elem.attributes
        .insert("xmlns".to_string(), vocab.ns_uri.to_string());
    elem.attributes
        .insert("xmlns:wsa".to_string(), tag.namespace.clone());
    elem.children.push(XMLNode::Text(format!("wsa:{}", tag.local)));
    elem
}

// <ProblemAction><Action>urn:...</Action></ProblemAction>
fn problem_action(vocab: &AddressingVocabulary, action: &str) -> Element {
    let mut inner = Element::new("Action");
    inner.children.push(XMLNode::Text(action.to_string()));

    let mut elem = Element::new(&vocab.problem_action_tag.local);
    elem.attributes
        .insert("xmlns".to_string(), vocab.ns_uri.to_string());
    elem.children.push(XMLNode::Element(inner));
    elem
}
