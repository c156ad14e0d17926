//! Valeurs d'argument et conversion élément XML <-> valeur.
//!
//! [`Value`] est une variante taguée : chaque forme est traitée par un
//! `match` exhaustif, jamais par des tests d'instance en cascade.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use xmltree::{Element, XMLNode};

use super::BindError;
use crate::qname::QName;

/// Valeur logique d'un paramètre
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Contenu textuel simple
    Text(String),

    /// Sous-arbre XML complet
    Element(Element),

    /// Octets binaires
    Bytes(Vec<u8>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Value::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// Sérialiseur indépendant d'une part.
///
/// Chaque paramètre déclare comment son élément se convertit en valeur
/// et réciproquement; en rpc-literal chaque enfant a le sien.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartCodec {
    /// Contenu textuel de l'élément
    Text,

    /// L'élément lui-même, conservé tel quel
    Xml,

    /// Texte base64 décodé en octets
    Base64,
}

impl PartCodec {
    /// Décode un élément en valeur
    pub fn decode(&self, elem: &Element) -> Result<Value, BindError> {
        match self {
            PartCodec::Text => Ok(Value::Text(
                elem.get_text().unwrap_or_default().to_string(),
            )),
            PartCodec::Xml => Ok(Value::Element(elem.clone())),
            PartCodec::Base64 => {
                let text = elem.get_text().unwrap_or_default();
                BASE64
                    .decode(text.trim().as_bytes())
                    .map(Value::Bytes)
                    .map_err(|source| BindError::Base64 {
                        name: QName::of_element(elem),
                        source,
                    })
            }
        }
    }

    /// Encode une valeur en élément nommé `name`.
    ///
    /// Un namespace non vide est déclaré comme namespace par défaut de
    /// l'élément produit, pour que le QName survive au re-parsing.
    pub fn encode(&self, name: &QName, value: &Value) -> Result<Element, BindError> {
        let make = |text: String| {
            let mut elem = Element::new(&name.local);
            if !name.namespace.is_empty() {
                elem.attributes
                    .insert("xmlns".to_string(), name.namespace.clone());
            }
            if !text.is_empty() {
                elem.children.push(XMLNode::Text(text));
            }
            elem
        };

        match (self, value) {
            (PartCodec::Text, Value::Text(s)) => Ok(make(s.clone())),
            (PartCodec::Xml, Value::Element(e)) => Ok(e.clone()),
            (PartCodec::Base64, Value::Bytes(b)) => Ok(make(BASE64.encode(b))),
            _ => Err(BindError::TypeMismatch { name: name.clone() }),
        }
    }
}
