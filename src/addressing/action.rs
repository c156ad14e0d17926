//! Validation d'action et résolution d'opération.
//!
//! La validation est consultative : sans opération résolue (pas de
//! contrat, ou message de contrôle hors modèle) elle laisse passer.
//! Une opération one-way valide même une action absente; une opération
//! requête-réponse tolère l'absence (les vieux clients l'omettent).

use tracing::debug;

use super::{AddressingError, AddressingVersion};
use crate::message::WireMessage;
use crate::model::{OperationBinding, PortModel};
use std::sync::Arc;

/// Résout l'opération visée par un message entrant.
///
/// Essaie d'abord l'action d'adressage quand le port l'active, puis
/// retombe sur le QName du payload.
pub fn resolve_operation<'a>(
    msg: &WireMessage,
    port: &'a PortModel,
) -> Option<&'a Arc<OperationBinding>> {
    if let Some(version) = port.addressing_version() {
        let tag = &version.vocabulary().action_tag;
        if let Some(action) = msg.action(tag).filter(|a| !a.is_empty())
            && let Some(op) = port.operation_by_action(&action)
        {
            debug!(action, operation = %op.operation.name, "operation resolved by action");
            return Some(op);
        }
    }

    msg.payload_qname()
        .and_then(|name| port.operation_by_payload(&name))
}

/// Valide l'en-tête Action du message contre l'opération résolue
pub fn check_action(
    msg: &WireMessage,
    binding: Option<&OperationBinding>,
    version: AddressingVersion,
) -> Result<(), AddressingError> {
    // pas d'opération résolue : pas de contrat, rien à valider
    let Some(binding) = binding else {
        return Ok(());
    };

    let action = msg.action(&version.vocabulary().action_tag);

    if binding.operation.mep.is_one_way() {
        // one-way : l'absence d'action passe quand même par la validation
        return validate_action(msg, binding, action);
    }

    match action {
        Some(got) => validate_action(msg, binding, Some(got)),
        None => Ok(()),
    }
}

fn validate_action(
    msg: &WireMessage,
    binding: &OperationBinding,
    action: Option<String>,
) -> Result<(), AddressingError> {
    // la validation ne s'applique qu'aux messages reçus du réseau
    if msg.local_invocation {
        return Ok(());
    }

    let Some(got) = action else {
        return Err(AddressingError::ActionNotSupported { action: None });
    };

    let op = &binding.operation;
    let mut expected = op.input_action.as_str();

    // une action d'entrée par défaut s'efface devant l'indice transport
    if op.input_action_default
        && let Some(hint) = msg
            .transport_action
            .as_deref()
            .or(op.soap_action.as_deref())
            .filter(|a| !a.is_empty())
    {
        expected = hint;
    }

    if got != expected {
        return Err(AddressingError::ActionNotSupported { action: Some(got) });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundOperation, Mep, PayloadStyle, PortModelBuilder};
    use crate::qname::QName;

    const WSA: &str = "http://www.w3.org/2005/08/addressing";

    fn message(action: Option<&str>) -> WireMessage {
        let header = action
            .map(|a| format!(r#"<wsa:Action xmlns:wsa="{WSA}">{a}</wsa:Action>"#))
            .unwrap_or_default();
        let xml = format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
                 <s:Header>{header}</s:Header>
                 <s:Body><Op xmlns="urn:test"/></s:Body>
               </s:Envelope>"#
        );
        WireMessage::parse(xml.as_bytes()).unwrap()
    }

    fn binding(op: BoundOperation) -> OperationBinding {
        OperationBinding::new(op, PayloadStyle::Empty, 0)
    }

    #[test]
    fn test_no_resolved_operation_skips_validation() {
        let msg = message(None);
        check_action(&msg, None, AddressingVersion::W3c).unwrap();
    }

    #[test]
    fn test_request_response_tolerates_absent_action() {
        let msg = message(None);
        let b = binding(
            BoundOperation::new("op", Mep::RequestResponse).with_input_action("urn:op:in"),
        );
        check_action(&msg, Some(&b), AddressingVersion::W3c).unwrap();
    }

    #[test]
    fn test_one_way_validates_even_absent_action() {
        let msg = message(None);
        let b = binding(BoundOperation::new("op", Mep::OneWay).with_input_action("urn:op:in"));
        let err = check_action(&msg, Some(&b), AddressingVersion::W3c).unwrap_err();
        assert!(matches!(
            err,
            AddressingError::ActionNotSupported { action: None }
        ));
    }

    #[test]
    fn test_mismatch_carries_offending_action() {
        let msg = message(Some("urn:wrong"));
        let b = binding(
            BoundOperation::new("op", Mep::RequestResponse).with_input_action("urn:op:in"),
        );
        let err = check_action(&msg, Some(&b), AddressingVersion::W3c).unwrap_err();
        assert!(matches!(
            err,
            AddressingError::ActionNotSupported { action: Some(a) } if a == "urn:wrong"
        ));
    }

    #[test]
    fn test_transport_hint_overrides_defaulted_action() {
        let mut msg = message(Some("urn:soap-action"));
        msg.transport_action = Some("urn:soap-action".to_string());
        // action d'entrée restée à la valeur par défaut
        let b = binding(BoundOperation::new("op", Mep::RequestResponse));
        check_action(&msg, Some(&b), AddressingVersion::W3c).unwrap();
    }

    #[test]
    fn test_hint_ignored_when_action_declared() {
        let mut msg = message(Some("urn:soap-action"));
        msg.transport_action = Some("urn:soap-action".to_string());
        let b = binding(
            BoundOperation::new("op", Mep::RequestResponse).with_input_action("urn:op:in"),
        );
        assert!(check_action(&msg, Some(&b), AddressingVersion::W3c).is_err());
    }

    #[test]
    fn test_local_invocation_skips_validation() {
        let mut msg = message(Some("urn:wrong"));
        msg.local_invocation = true;
        let b = binding(BoundOperation::new("op", Mep::OneWay).with_input_action("urn:op:in"));
        check_action(&msg, Some(&b), AddressingVersion::W3c).unwrap();
    }

    #[test]
    fn test_resolution_prefers_action_then_payload() {
        let by_action = binding(
            BoundOperation::new("byAction", Mep::RequestResponse).with_input_action("urn:op:in"),
        );
        let by_payload = OperationBinding::new(
            BoundOperation::new("byPayload", Mep::RequestResponse),
            PayloadStyle::Bare(crate::model::Parameter::new(
                QName::new("urn:test", "Op"),
                0,
                crate::model::Direction::In,
                crate::binding::PartCodec::Xml,
            )),
            1,
        );
        let port = PortModelBuilder::new()
            .addressing(AddressingVersion::W3c, false)
            .operation(by_action)
            .operation(by_payload)
            .build()
            .unwrap();

        let msg = message(Some("urn:op:in"));
        assert_eq!(
            resolve_operation(&msg, &port).unwrap().operation.name,
            "byAction"
        );

        let msg = message(None);
        assert_eq!(
            resolve_operation(&msg, &port).unwrap().operation.name,
            "byPayload"
        );
    }
}
