//! En-têtes SOAP et références d'endpoint WS-Addressing.

use xmltree::{Element, XMLNode};

use crate::addressing::AddressingVersion;
use crate::qname::{QName, attribute_local};
use crate::soap::SoapVersion;

/// En-tête d'un message en transit
#[derive(Debug, Clone)]
pub struct MessageHeader {
    /// Nom qualifié de l'en-tête
    pub name: QName,

    /// Contenu XML brut
    pub element: Element,
}

impl MessageHeader {
    pub fn new(element: Element) -> Self {
        Self {
            name: QName::of_element(&element),
            element,
        }
    }

    /// En-tête construit à la main, dont le QName est connu de l'appelant
    /// (les éléments bâtis hors parsing ne portent pas de namespace résolu)
    pub fn with_name(name: QName, element: Element) -> Self {
        Self { name, element }
    }

    /// Contenu textuel de l'en-tête (vide si absent)
    pub fn text(&self) -> String {
        self.element.get_text().unwrap_or_default().to_string()
    }

    /// Rôle SOAP porté par l'en-tête.
    ///
    /// Attribut `role` en SOAP 1.2, `actor` en SOAP 1.1; `None` si
    /// l'en-tête n'en déclare aucun.
    pub fn role(&self, version: SoapVersion) -> Option<&str> {
        match version {
            SoapVersion::Soap11 => attribute_local(&self.element, "actor"),
            SoapVersion::Soap12 => attribute_local(&self.element, "role"),
        }
    }

    /// Décode l'en-tête comme une référence d'endpoint
    pub fn read_as_epr(&self, version: AddressingVersion) -> EndpointReference {
        EndpointReference::from_element(&self.element, version)
    }
}

/// Collection ordonnée des en-têtes d'un message
#[derive(Debug, Clone, Default)]
pub struct HeaderList {
    headers: Vec<MessageHeader>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, header: MessageHeader) {
        self.headers.push(header);
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Premier en-tête portant ce nom qualifié
    pub fn get(&self, name: &QName) -> Option<&MessageHeader> {
        self.headers.iter().find(|h| &h.name == name)
    }

    /// En-têtes dont le namespace est `ns`
    pub fn in_namespace<'a>(&'a self, ns: &'a str) -> impl Iterator<Item = &'a MessageHeader> {
        self.headers.iter().filter(move |h| h.name.namespace == ns)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageHeader> {
        self.headers.iter()
    }
}

/// Référence d'endpoint WS-Addressing (ReplyTo, FaultTo)
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointReference {
    /// URI d'adresse
    pub address: String,

    /// Paramètres de référence à recopier dans les messages retour
    pub reference_parameters: Vec<Element>,
}

impl EndpointReference {
    /// Référence anonyme de la version d'adressage donnée
    pub fn anonymous(version: AddressingVersion) -> Self {
        Self {
            address: version.vocabulary().anonymous_uri.to_string(),
            reference_parameters: Vec::new(),
        }
    }

    /// Décode une référence depuis son élément XML.
    ///
    /// L'adresse est l'enfant `Address` du namespace d'adressage; à défaut
    /// le contenu textuel de l'élément lui-même (forme abrégée tolérée par
    /// les vieux clients). Une adresse introuvable vaut adresse anonyme.
    pub fn from_element(elem: &Element, version: AddressingVersion) -> Self {
        let vocab = version.vocabulary();
        let address_tag = QName::new(vocab.ns_uri, "Address");
        let params_tag = QName::new(vocab.ns_uri, "ReferenceParameters");

        let mut address = None;
        let mut reference_parameters = Vec::new();

        for node in &elem.children {
            let Some(child) = node.as_element() else {
                continue;
            };
            if address_tag.matches(child) {
                address = Some(child.get_text().unwrap_or_default().trim().to_string());
            } else if params_tag.matches(child) {
                reference_parameters.extend(
                    child
                        .children
                        .iter()
                        .filter_map(XMLNode::as_element)
                        .cloned(),
                );
            }
        }

        let address = address
            .or_else(|| elem.get_text().map(|t| t.trim().to_string()))
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| vocab.anonymous_uri.to_string());

        Self {
            address,
            reference_parameters,
        }
    }

    /// Vrai si la référence désigne l'endpoint anonyme
    pub fn is_anonymous(&self, version: AddressingVersion) -> bool {
        self.address == version.vocabulary().anonymous_uri
    }
}
