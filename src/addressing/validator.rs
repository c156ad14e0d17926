//! Validation de cardinalité des en-têtes d'adressage.
//!
//! Règles appliquées, dans cet ordre (l'ordre est contractuel) :
//!
//! 1. chemin rapide : adressage optionnel et aucun en-tête d'adressage
//! 2. unicité de To/From/ReplyTo/FaultTo/Action/MessageID (RelatesTo et
//!    le détail de fault peuvent se répéter)
//! 3. en-tête inconnu dans le namespace d'adressage : défaut fatal
//! 4. cardinalité invalide avant en-têtes obligatoires
//! 5. en-têtes obligatoires : Action d'abord, To ensuite
//! 6. contrôle structurel secondaire des références ReplyTo/FaultTo

use tracing::debug;

use super::{AddressingError, AddressingVersion};
use crate::message::{EndpointReference, WireMessage};
use crate::model::{BoundOperation, PortModel};
use crate::qname::QName;
use crate::soap::SoapVersion;

/// Références d'endpoint relevées pendant le balayage des en-têtes
#[derive(Debug, Default)]
pub struct ScannedReferences {
    pub reply_to: Option<EndpointReference>,
    pub fault_to: Option<EndpointReference>,
}

/// Point de politique pour la sémantique d'adressage anonyme.
///
/// Appelé après une validation de cardinalité réussie, avec l'opération
/// résolue si elle l'est. L'implémentation par défaut ne fait rien.
pub trait AnonymousPolicy: Send + Sync {
    fn check(
        &self,
        _operation: Option<&BoundOperation>,
        _references: &ScannedReferences,
    ) -> Result<(), AddressingError> {
        Ok(())
    }
}

/// Politique anonyme sans contrainte
#[derive(Debug, Default)]
pub struct DefaultAnonymousPolicy;

impl AnonymousPolicy for DefaultAnonymousPolicy {}

/// Valide la cardinalité des en-têtes d'adressage d'un message entrant.
///
/// Rend les références ReplyTo/FaultTo décodées en chemin, pour le
/// contrôle anonyme effectué par l'appelant.
pub fn check_cardinality(
    msg: &WireMessage,
    port: Option<&PortModel>,
    soap: SoapVersion,
    version: AddressingVersion,
) -> Result<ScannedReferences, AddressingError> {
    let vocab = version.vocabulary();

    // chemin rapide : adressage optionnel, aucun en-tête d'adressage
    if let Some(port) = port
        && !port.addressing_required()
        && msg.headers.in_namespace(vocab.ns_uri).next().is_none()
    {
        debug!("addressing optional and no addressing headers, skipping validation");
        return Ok(ScannedReferences::default());
    }

    let mut found_from = false;
    let mut found_to = false;
    let mut found_reply_to = false;
    let mut found_fault_to = false;
    let mut found_action = false;
    let mut found_message_id = false;

    let mut faulty_header: Option<QName> = None;
    let mut refs = ScannedReferences::default();

    for header in msg.headers.in_namespace(vocab.ns_uri) {
        if !is_in_current_role(header, soap) {
            continue;
        }

        let local = header.name.local.as_str();
        if local == vocab.from_tag.local {
            if found_from {
                faulty_header = Some(vocab.from_tag.clone());
                break;
            }
            found_from = true;
        } else if local == vocab.to_tag.local {
            if found_to {
                faulty_header = Some(vocab.to_tag.clone());
                break;
            }
            found_to = true;
        } else if local == vocab.reply_to_tag.local {
            if found_reply_to {
                faulty_header = Some(vocab.reply_to_tag.clone());
                break;
            }
            found_reply_to = true;
            refs.reply_to = Some(header.read_as_epr(version));
        } else if local == vocab.fault_to_tag.local {
            if found_fault_to {
                faulty_header = Some(vocab.fault_to_tag.clone());
                break;
            }
            found_fault_to = true;
            refs.fault_to = Some(header.read_as_epr(version));
        } else if local == vocab.action_tag.local {
            if found_action {
                faulty_header = Some(vocab.action_tag.clone());
                break;
            }
            found_action = true;
        } else if local == vocab.message_id_tag.local {
            if found_message_id {
                faulty_header = Some(vocab.message_id_tag.clone());
                break;
            }
            found_message_id = true;
        } else if local == vocab.relates_to_tag.local {
            // pas de validation : RelatesTo peut se répéter
        } else if local == vocab.fault_detail_tag.local {
            // détail de fault SOAP 1.1, hors règle d'unicité
        } else {
            return Err(AddressingError::UnknownHeader(header.name.clone()));
        }
    }

    // la cardinalité invalide prime sur les en-têtes obligatoires
    if let Some(tag) = faulty_header {
        return Err(AddressingError::InvalidCardinality { tag });
    }

    if port.is_some_and(PortModel::addressing_required) {
        // Action d'abord, To ensuite : ordre contractuel
        if !found_action {
            return Err(AddressingError::MapRequired {
                tag: vocab.action_tag.clone(),
            });
        }
        if !found_to {
            return Err(AddressingError::MapRequired {
                tag: vocab.to_tag.clone(),
            });
        }
    }

    Ok(refs)
}

/// Portée de rôle d'un en-tête.
///
/// En SOAP 1.1 tous les en-têtes sont dans la portée; en SOAP 1.2 seuls
/// ceux dont le rôle explicite vaut le rôle implicite du destinataire
/// final le sont.
fn is_in_current_role(header: &crate::message::MessageHeader, soap: SoapVersion) -> bool {
    match soap {
        SoapVersion::Soap11 => true,
        SoapVersion::Soap12 => header.role(soap) == Some(soap.implicit_role()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PortModelBuilder;

    const WSA: &str = "http://www.w3.org/2005/08/addressing";

    fn message(headers: &str) -> WireMessage {
        let xml = format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"
                           xmlns:wsa="{WSA}">
                 <s:Header>{headers}</s:Header>
                 <s:Body><Op xmlns="urn:test"/></s:Body>
               </s:Envelope>"#
        );
        WireMessage::parse(xml.as_bytes()).unwrap()
    }

    fn port(required: bool) -> PortModel {
        PortModelBuilder::new()
            .addressing(AddressingVersion::W3c, required)
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_to_is_invalid_cardinality() {
        let msg = message(
            r#"<wsa:Action>urn:a</wsa:Action>
               <wsa:To>urn:x</wsa:To>
               <wsa:To>urn:y</wsa:To>"#,
        );
        let err = check_cardinality(
            &msg,
            Some(&port(true)),
            SoapVersion::Soap11,
            AddressingVersion::W3c,
        )
        .unwrap_err();
        match err {
            AddressingError::InvalidCardinality { tag } => assert_eq!(tag.local, "To"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cardinality_takes_priority_over_required() {
        // Action dupliquée ET To absent : la cardinalité doit gagner
        let msg = message(
            r#"<wsa:Action>urn:a</wsa:Action>
               <wsa:Action>urn:b</wsa:Action>"#,
        );
        let err = check_cardinality(
            &msg,
            Some(&port(true)),
            SoapVersion::Soap11,
            AddressingVersion::W3c,
        )
        .unwrap_err();
        assert!(matches!(err, AddressingError::InvalidCardinality { tag } if tag.local == "Action"));
    }

    #[test]
    fn test_missing_action_reported_before_missing_to() {
        let msg = message("");
        let err = check_cardinality(
            &msg,
            Some(&port(true)),
            SoapVersion::Soap11,
            AddressingVersion::W3c,
        )
        .unwrap_err();
        assert!(matches!(err, AddressingError::MapRequired { tag } if tag.local == "Action"));
    }

    #[test]
    fn test_missing_to_reported_when_action_present() {
        let msg = message(r#"<wsa:Action>urn:a</wsa:Action>"#);
        let err = check_cardinality(
            &msg,
            Some(&port(true)),
            SoapVersion::Soap11,
            AddressingVersion::W3c,
        )
        .unwrap_err();
        assert!(matches!(err, AddressingError::MapRequired { tag } if tag.local == "To"));
    }

    #[test]
    fn test_optional_addressing_without_headers_skips_validation() {
        let msg = message("");
        let refs = check_cardinality(
            &msg,
            Some(&port(false)),
            SoapVersion::Soap11,
            AddressingVersion::W3c,
        )
        .unwrap();
        assert!(refs.reply_to.is_none());
    }

    #[test]
    fn test_relates_to_may_repeat() {
        let msg = message(
            r#"<wsa:Action>urn:a</wsa:Action>
               <wsa:To>urn:x</wsa:To>
               <wsa:RelatesTo>urn:m1</wsa:RelatesTo>
               <wsa:RelatesTo>urn:m2</wsa:RelatesTo>"#,
        );
        check_cardinality(
            &msg,
            Some(&port(true)),
            SoapVersion::Soap11,
            AddressingVersion::W3c,
        )
        .unwrap();
    }

    #[test]
    fn test_unknown_addressing_header_is_fatal() {
        let msg = message(r#"<wsa:Bogus>x</wsa:Bogus>"#);
        let err = check_cardinality(
            &msg,
            Some(&port(true)),
            SoapVersion::Soap11,
            AddressingVersion::W3c,
        )
        .unwrap_err();
        assert!(matches!(err, AddressingError::UnknownHeader(tag) if tag.local == "Bogus"));
    }

    #[test]
    fn test_soap12_out_of_role_headers_ignored() {
        // To dupliqué mais aucun rôle : hors portée en SOAP 1.2,
        // seuls Action et To manquants sont donc détectés
        let msg = message(
            r#"<wsa:To>urn:x</wsa:To>
               <wsa:To>urn:y</wsa:To>"#,
        );
        let err = check_cardinality(
            &msg,
            Some(&port(true)),
            SoapVersion::Soap12,
            AddressingVersion::W3c,
        )
        .unwrap_err();
        assert!(matches!(err, AddressingError::MapRequired { tag } if tag.local == "Action"));
    }

    #[test]
    fn test_soap12_ultimate_receiver_role_in_scope() {
        let msg = message(
            r#"<wsa:Action s:role="http://www.w3.org/2003/05/soap-envelope/role/ultimateReceiver">urn:a</wsa:Action>
               <wsa:To s:role="http://www.w3.org/2003/05/soap-envelope/role/ultimateReceiver">urn:x</wsa:To>"#,
        );
        check_cardinality(
            &msg,
            Some(&port(true)),
            SoapVersion::Soap12,
            AddressingVersion::W3c,
        )
        .unwrap();
    }

    #[test]
    fn test_reply_to_reference_is_decoded() {
        let msg = message(
            r#"<wsa:Action>urn:a</wsa:Action>
               <wsa:To>urn:x</wsa:To>
               <wsa:ReplyTo><wsa:Address>http://www.w3.org/2005/08/addressing/anonymous</wsa:Address></wsa:ReplyTo>"#,
        );
        let refs = check_cardinality(
            &msg,
            Some(&port(true)),
            SoapVersion::Soap11,
            AddressingVersion::W3c,
        )
        .unwrap();
        assert!(
            refs.reply_to
                .unwrap()
                .is_anonymous(AddressingVersion::W3c)
        );
    }
}
