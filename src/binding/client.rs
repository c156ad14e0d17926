//! Construction du payload de requête côté client.
//!
//! Opération miroir de la liaison serveur : le wrapper est instancié
//! puis chaque champ est posé depuis l'argument d'appel correspondant,
//! en ordre inverse de déclaration (les poseurs de champ sont sans
//! dépendance entre eux, l'ordre wire reste l'ordre de déclaration).
//! Un accesseur requis sans valeur est une défaillance définitive du
//! wrapper vis-à-vis du modèle : l'erreur ne doit pas être retentée.

use xmltree::{Element, XMLNode};

use super::{Args, BindError, PartCodec, ValueGetter};
use crate::message::WireMessage;
use crate::model::{ModelError, Parameter, WrapperParameter};
use crate::qname::QName;

/// Construit le payload d'un message de requête depuis les arguments
pub trait PayloadBuilder: Send + Sync {
    fn build_payload(&self, args: &Args) -> Result<Option<Element>, BindError>;

    /// Message complet prêt à sérialiser
    fn build_request(&self, args: &Args) -> Result<WireMessage, BindError> {
        Ok(WireMessage::new(self.build_payload(args)?))
    }
}

/// Requête à corps vide
#[derive(Debug, Default)]
pub struct EmptyBody;

impl PayloadBuilder for EmptyBody {
    fn build_payload(&self, _args: &Args) -> Result<Option<Element>, BindError> {
        Ok(None)
    }
}

/// Un seul paramètre devient le payload entier
#[derive(Debug)]
pub struct BareBody {
    name: QName,
    codec: PartCodec,
    getter: ValueGetter,
}

impl BareBody {
    pub fn new(param: &Parameter) -> Self {
        Self {
            name: param.name.clone(),
            codec: param.codec,
            getter: ValueGetter::for_parameter(param),
        }
    }
}

impl PayloadBuilder for BareBody {
    fn build_payload(&self, args: &Args) -> Result<Option<Element>, BindError> {
        let value = self.getter.get(args).ok_or(BindError::MissingArgument {
            name: self.name.clone(),
        })?;
        Ok(Some(self.codec.encode(&self.name, &value)?))
    }
}

/// Plusieurs paramètres empaquetés dans un élément wrapper
pub struct WrappedBody {
    wrapper_name: QName,
    parts: Vec<WrappedPart>,
}

struct WrappedPart {
    name: QName,
    codec: PartCodec,
    getter: ValueGetter,
}

impl WrappedBody {
    /// Apparie les enfants aux propriétés du type wrapper.
    ///
    /// Comme côté serveur, un nom absent du type est un défaut de
    /// configuration détecté ici, pas par appel.
    pub fn new(wrapper: &WrapperParameter) -> Result<Self, ModelError> {
        let mut parts = Vec::with_capacity(wrapper.children.len());
        for child in &wrapper.children {
            if !wrapper.fields.contains(&child.name) {
                return Err(ModelError::WrapperFieldMissing {
                    wrapper: wrapper.name.clone(),
                    child: child.name.clone(),
                });
            }
            parts.push(WrappedPart {
                name: child.name.clone(),
                codec: child.codec,
                getter: ValueGetter::for_parameter(child),
            });
        }
        Ok(Self {
            wrapper_name: wrapper.name.clone(),
            parts,
        })
    }
}

impl PayloadBuilder for WrappedBody {
    fn build_payload(&self, args: &Args) -> Result<Option<Element>, BindError> {
        let mut wrapper = Element::new(&self.wrapper_name.local);
        if !self.wrapper_name.namespace.is_empty() {
            wrapper
                .attributes
                .insert("xmlns".to_string(), self.wrapper_name.namespace.clone());
        }

        // ordre inverse de déclaration, insertion en tête : l'ordre wire
        // reste l'ordre de déclaration
        for part in self.parts.iter().rev() {
            let value = part.getter.get(args).ok_or(BindError::MissingArgument {
                name: part.name.clone(),
            })?;
            let elem = part.codec.encode(&part.name, &value)?;
            wrapper.children.insert(0, XMLNode::Element(elem));
        }

        Ok(Some(wrapper))
    }
}
