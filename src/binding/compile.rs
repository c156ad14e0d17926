//! Assemblage des stratégies de liaison depuis le modèle gelé.
//!
//! Sélectionne la stratégie de chaque portion du message (payload,
//! en-têtes, pièces jointes, paramètres non liés) et les compose. Les
//! objets produits sont sans état et partagés entre appels.

use super::reader::{
    ArgumentsReader, AttachmentReader, BareReader, Composite, DocLitReader, HeaderReader,
    NullSetter, RpcLitReader,
};
use super::{BareBody, EmptyBody, PayloadBuilder, ValueSetter, WrappedBody};
use crate::model::{AttachmentMedia, BindingKind, ModelError, OperationBinding, PayloadStyle};

/// Compose le lecteur d'arguments d'une opération côté serveur
pub fn compile_reader(binding: &OperationBinding) -> Result<Composite, ModelError> {
    let mut members: Vec<Box<dyn ArgumentsReader>> = Vec::new();

    match &binding.style {
        PayloadStyle::Empty => {}
        PayloadStyle::Bare(param) => members.push(Box::new(BareReader::new(param))),
        PayloadStyle::DocLitWrapped(wrapper) => {
            members.push(Box::new(DocLitReader::new(wrapper)?));
        }
        PayloadStyle::RpcLit(wrapper) => members.push(Box::new(RpcLitReader::new(wrapper))),
    }

    for param in &binding.headers {
        members.push(Box::new(HeaderReader::new(param)));
    }

    for param in &binding.attachments {
        let media = match &param.binding {
            BindingKind::Attachment(media) => *media,
            _ => AttachmentMedia::Bytes,
        };
        if matches!(media, AttachmentMedia::Image | AttachmentMedia::Stream) {
            // limite opérationnelle fixe, jamais une erreur par appel
            return Err(ModelError::AttachmentNotMapped {
                part: param.part_name.clone(),
            });
        }
        members.push(Box::new(AttachmentReader::new(param, media)));
    }

    for param in &binding.unbound {
        members.push(Box::new(NullSetter::new(ValueSetter::for_parameter(param))));
    }

    Ok(Composite::new(members))
}

/// Compose le constructeur de requête d'une opération côté client
pub fn compile_request_builder(
    binding: &OperationBinding,
) -> Result<Box<dyn PayloadBuilder>, ModelError> {
    Ok(match &binding.style {
        PayloadStyle::Empty => Box::new(EmptyBody),
        PayloadStyle::Bare(param) => Box::new(BareBody::new(param)),
        PayloadStyle::DocLitWrapped(wrapper) | PayloadStyle::RpcLit(wrapper) => {
            Box::new(WrappedBody::new(wrapper)?)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Args, PartCodec, Slot, Value};
    use crate::message::WireMessage;
    use crate::model::{BoundOperation, Direction, Mep, Parameter, WrapperParameter};
    use crate::qname::QName;

    fn wrapped_binding() -> OperationBinding {
        let wrapper = WrapperParameter::new(
            QName::new("urn:test", "Add"),
            vec![
                Parameter::new(QName::local("x"), 0, Direction::In, PartCodec::Text),
                Parameter::new(QName::local("y"), 1, Direction::In, PartCodec::Text),
            ],
        );
        OperationBinding::new(
            BoundOperation::new("add", Mep::RequestResponse),
            PayloadStyle::DocLitWrapped(wrapper),
            2,
        )
    }

    #[test]
    fn test_request_round_trip_through_both_sides() {
        // construit côté client puis relit côté serveur : les valeurs
        // d'origine doivent ressortir identiques
        let binding = wrapped_binding();
        let builder = compile_request_builder(&binding).unwrap();
        let reader = compile_reader(&binding).unwrap();

        let mut out = Args::new(2);
        out.put_plain(0, Value::Text("3".to_string()));
        out.put_plain(1, Value::Text("4".to_string()));
        let msg = builder.build_request(&out).unwrap();

        // re-parse pour résoudre les namespaces comme sur le réseau
        let xml = msg.to_xml(crate::soap::SoapVersion::Soap11).unwrap();
        let received = WireMessage::parse(xml.as_bytes()).unwrap();

        let mut args = Args::new(2);
        reader.read_request(&received, &mut args).unwrap();
        assert!(matches!(
            args.slot(0).unwrap(),
            Slot::Plain(Value::Text(s)) if s == "3"
        ));
        assert!(matches!(
            args.slot(1).unwrap(),
            Slot::Plain(Value::Text(s)) if s == "4"
        ));
    }

    #[test]
    fn test_compile_rejects_unmapped_attachment() {
        let att = Parameter::new(QName::local("img"), 0, Direction::In, PartCodec::Text)
            .bound_to(BindingKind::Attachment(AttachmentMedia::Image));
        let binding = OperationBinding::new(
            BoundOperation::new("op", Mep::OneWay),
            PayloadStyle::Empty,
            1,
        )
        .with_attachment(att);
        assert!(matches!(
            compile_reader(&binding),
            Err(ModelError::AttachmentNotMapped { .. })
        ));
    }
}
