//! Noms qualifiés XML.
//!
//! Un [`QName`] identifie un élément ou un en-tête par la paire
//! (URI de namespace, nom local). Toutes les comparaisons du runtime
//! (vocabulaire d'adressage, dispatch d'opération, enfants de wrapper)
//! passent par ce type.

use std::fmt;

use xmltree::Element;

/// Nom qualifié (namespace URI + nom local)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// URI de namespace, chaîne vide si non qualifié
    pub namespace: String,

    /// Nom local
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    /// Nom local sans namespace
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            local: local.into(),
        }
    }

    /// QName d'un élément XML parsé.
    ///
    /// Les éléments construits à la main peuvent porter un préfixe dans
    /// leur champ `name` ("u:Play"); on ne garde que la partie locale.
    pub fn of_element(elem: &Element) -> Self {
        Self {
            namespace: elem.namespace.clone().unwrap_or_default(),
            local: local_name(&elem.name).to_string(),
        }
    }

    /// Teste si l'élément porte ce QName
    pub fn matches(&self, elem: &Element) -> bool {
        local_name(&elem.name) == self.local
            && elem.namespace.as_deref().unwrap_or("") == self.namespace
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

/// Partie locale d'un nom éventuellement préfixé ("s:Body" -> "Body")
pub(crate) fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Valeur d'un attribut par nom local, que la clé soit préfixée ou non
pub(crate) fn attribute_local<'a>(elem: &'a Element, local: &str) -> Option<&'a str> {
    elem.attributes
        .iter()
        .find(|(k, _)| local_name(k) == local)
        .map(|(_, v)| v.as_str())
}
