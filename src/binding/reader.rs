//! Stratégies de liaison côté serveur.
//!
//! Chaque stratégie lit une portion du message (payload, en-tête, pièce
//! jointe) et dépose les valeurs obtenues aux emplacements attendus du
//! tableau d'arguments. Le [`Composite`] enchaîne les membres dans
//! l'ordre; au plus un membre alimente le slot de retour direct, garanti
//! par le gel du modèle.

use std::collections::HashMap;

use tracing::debug;

use super::{Args, BindError, PartCodec, Value, ValueSetter};
use crate::message::WireMessage;
use crate::model::{AttachmentMedia, ModelError, Parameter, WrapperParameter};
use crate::qname::QName;

/// Lit un message de requête et range les valeurs dans `args`
pub trait ArgumentsReader: Send + Sync {
    fn read_request(&self, msg: &WireMessage, args: &mut Args) -> Result<(), BindError>;
}

/// Opération sans entrée : ne lit rien
#[derive(Debug, Default)]
pub struct NoArgs;

impl ArgumentsReader for NoArgs {
    fn read_request(&self, _msg: &WireMessage, _args: &mut Args) -> Result<(), BindError> {
        Ok(())
    }
}

/// Remet un paramètre non lié à sa valeur non initialisée
#[derive(Debug)]
pub struct NullSetter {
    setter: ValueSetter,
}

impl NullSetter {
    pub fn new(setter: ValueSetter) -> Self {
        Self { setter }
    }
}

impl ArgumentsReader for NullSetter {
    fn read_request(&self, _msg: &WireMessage, args: &mut Args) -> Result<(), BindError> {
        self.setter.clear(args);
        Ok(())
    }
}

/// Composition séquentielle de plusieurs stratégies.
///
/// Utilisé quand un message se décompose en plusieurs portions (deux
/// en-têtes, un paramètre de corps, des pièces jointes...), chacune
/// traitée par son propre membre.
pub struct Composite {
    members: Vec<Box<dyn ArgumentsReader>>,
}

impl Composite {
    pub fn new(members: Vec<Box<dyn ArgumentsReader>>) -> Self {
        Self { members }
    }
}

impl ArgumentsReader for Composite {
    fn read_request(&self, msg: &WireMessage, args: &mut Args) -> Result<(), BindError> {
        for member in &self.members {
            member.read_request(msg, args)?;
        }
        Ok(())
    }
}

/// Liaison bare : le payload entier est une seule valeur
#[derive(Debug)]
pub struct BareReader {
    codec: PartCodec,
    setter: ValueSetter,
}

impl BareReader {
    pub fn new(param: &Parameter) -> Self {
        Self {
            codec: param.codec,
            setter: ValueSetter::for_parameter(param),
        }
    }
}

impl ArgumentsReader for BareReader {
    fn read_request(&self, msg: &WireMessage, args: &mut Args) -> Result<(), BindError> {
        let payload = msg.payload.as_ref().ok_or(BindError::MissingPayload)?;
        self.setter.put(self.codec.decode(payload)?, args);
        Ok(())
    }
}

/// Liaison wrapped document-literal.
///
/// Les enfants déclarés sont appariés aux propriétés du type wrapper à
/// la construction : un nom absent du type est un défaut de
/// configuration, jamais une erreur par appel.
pub struct DocLitReader {
    parts: Vec<DocLitPart>,
}

struct DocLitPart {
    name: QName,
    codec: PartCodec,
    setter: ValueSetter,
}

impl DocLitReader {
    pub fn new(wrapper: &WrapperParameter) -> Result<Self, ModelError> {
        let mut parts = Vec::with_capacity(wrapper.children.len());
        for child in &wrapper.children {
            if !wrapper.fields.contains(&child.name) {
                return Err(ModelError::WrapperFieldMissing {
                    wrapper: wrapper.name.clone(),
                    child: child.name.clone(),
                });
            }
            parts.push(DocLitPart {
                name: child.name.clone(),
                codec: child.codec,
                setter: ValueSetter::for_parameter(child),
            });
        }
        Ok(Self { parts })
    }
}

impl ArgumentsReader for DocLitReader {
    fn read_request(&self, msg: &WireMessage, args: &mut Args) -> Result<(), BindError> {
        let wrapper = msg.payload.as_ref().ok_or(BindError::MissingPayload)?;

        for part in &self.parts {
            let child = wrapper
                .children
                .iter()
                .filter_map(xmltree::XMLNode::as_element)
                .find(|e| part.name.matches(e));
            match child {
                Some(elem) => part.setter.put(part.codec.decode(elem)?, args),
                // propriété absente du wrapper reçu : slot non initialisé
                None => part.setter.clear(args),
            }
        }
        Ok(())
    }
}

/// Liaison wrapped rpc-literal.
///
/// Vérifie le nom du wrapper puis itère ses enfants immédiats; chaque
/// enfant reconnu passe par son sérialiseur propre, les autres sont
/// sautés structurellement et la lecture reprend au frère suivant.
pub struct RpcLitReader {
    wrapper_name: QName,
    parts: HashMap<QName, RpcLitPart>,
}

struct RpcLitPart {
    codec: PartCodec,
    setter: ValueSetter,
}

impl RpcLitReader {
    pub fn new(wrapper: &WrapperParameter) -> Self {
        let parts = wrapper
            .children
            .iter()
            .map(|child| {
                (
                    child.name.clone(),
                    RpcLitPart {
                        codec: child.codec,
                        setter: ValueSetter::for_parameter(child),
                    },
                )
            })
            .collect();
        Self {
            wrapper_name: wrapper.name.clone(),
            parts,
        }
    }
}

impl ArgumentsReader for RpcLitReader {
    fn read_request(&self, msg: &WireMessage, args: &mut Args) -> Result<(), BindError> {
        let mut cursor = msg.payload_cursor().ok_or(BindError::MissingPayload)?;

        let got = cursor.wrapper_qname();
        if got != self.wrapper_name {
            return Err(BindError::UnexpectedWrapper {
                expected: self.wrapper_name.clone(),
                got,
            });
        }

        while let Some(elem) = cursor.next_element() {
            match self.parts.get(&QName::of_element(elem)) {
                Some(part) => part.setter.put(part.codec.decode(elem)?, args),
                None => {
                    // part inconnue : tolérée pour la compatibilité avant
                    debug!(element = %QName::of_element(elem), "skipping unknown rpc-literal part");
                }
            }
        }
        Ok(())
    }
}

/// Liaison d'un paramètre d'en-tête.
///
/// Silencieusement sans effet si l'en-tête est absent : son éventuelle
/// obligation relève du validateur de cardinalité, pas d'ici.
#[derive(Debug)]
pub struct HeaderReader {
    name: QName,
    codec: PartCodec,
    setter: ValueSetter,
}

impl HeaderReader {
    pub fn new(param: &Parameter) -> Self {
        Self {
            name: param.name.clone(),
            codec: param.codec,
            setter: ValueSetter::for_parameter(param),
        }
    }
}

impl ArgumentsReader for HeaderReader {
    fn read_request(&self, msg: &WireMessage, args: &mut Args) -> Result<(), BindError> {
        if let Some(header) = msg.headers.get(&self.name) {
            self.setter.put(self.codec.decode(&header.element)?, args);
        }
        Ok(())
    }
}

/// Liaison d'un paramètre pièce jointe.
///
/// La part est résolue par le nom décodé de son content-id; un
/// content-id malformé ne correspond simplement à rien.
#[derive(Debug)]
pub struct AttachmentReader {
    part_name: String,
    media: AttachmentMedia,
    setter: ValueSetter,
}

impl AttachmentReader {
    pub fn new(param: &Parameter, media: AttachmentMedia) -> Self {
        Self {
            part_name: param.part_name.clone(),
            media,
            setter: ValueSetter::for_parameter(param),
        }
    }
}

impl ArgumentsReader for AttachmentReader {
    fn read_request(&self, msg: &WireMessage, args: &mut Args) -> Result<(), BindError> {
        for att in &msg.attachments {
            if att.part_name().as_deref() != Some(self.part_name.as_str()) {
                continue;
            }
            let value = match self.media {
                AttachmentMedia::Bytes => Value::Bytes(att.data.clone()),
                AttachmentMedia::Text => Value::Text(
                    String::from_utf8(att.data.clone()).map_err(|_| {
                        BindError::AttachmentEncoding {
                            part: self.part_name.clone(),
                        }
                    })?,
                ),
                AttachmentMedia::Image | AttachmentMedia::Stream => {
                    return Err(BindError::AttachmentNotMapped {
                        part: self.part_name.clone(),
                    });
                }
            };
            self.setter.put(value, args);
        }
        Ok(())
    }
}
