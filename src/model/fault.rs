//! Modèle de faults d'un port.
//!
//! Chaque fault déclaré du contrat est décrit par une [`FaultBinding`] :
//! le QName de son élément de détail, son genre, et les deux conversions
//! (détail XML -> erreur typée, erreur typée -> détail XML). Le modèle
//! tient les deux index en cohérence : une liaison enregistrée est
//! retrouvable par QName de détail comme par type d'erreur.
//!
//! Les conversions sont des fermetures explicites fournies au moment de
//! la construction du modèle, pas une introspection des types : le coût
//! est payé une fois au gel, jamais par appel.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use xmltree::{Element, XMLNode};

use crate::qname::QName;
use crate::soap::FaultError;

/// Erreur métier transportable dans un fault SOAP.
///
/// Implémentée automatiquement par tout type d'erreur concret; le
/// sur-trait [`Any`] permet au modèle de retrouver la liaison d'une
/// valeur reçue en `dyn`.
pub trait ServiceFault: std::error::Error + Any + Send + Sync {}

impl<T: std::error::Error + Any + Send + Sync> ServiceFault for T {}

/// Genre d'un fault déclaré
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Erreur applicative dont les champs publics sont recopiés
    /// un à un dans le détail
    UserDefined,

    /// Erreur générée portant un bean de détail dédié
    FaultInfo,
}

/// Champ public d'une erreur applicative.
///
/// Table de correspondance explicite : le nom local de l'élément de
/// détail et les deux accesseurs du champ.
#[derive(Clone, Copy)]
pub struct FaultField<E> {
    pub name: &'static str,
    pub get: fn(&E) -> String,
    pub set: fn(&mut E, &str),
}

type ConstructFn =
    Box<dyn Fn(String, &Element) -> Result<Box<dyn ServiceFault>, FaultError> + Send + Sync>;
type ExtractFn = Box<dyn Fn(&dyn ServiceFault) -> Result<Element, FaultError> + Send + Sync>;

/// Liaison d'un fault déclaré : détail XML <-> erreur typée
pub struct FaultBinding {
    detail_name: QName,
    kind: FaultKind,
    fault_type: TypeId,
    construct: ConstructFn,
    extract: ExtractFn,
}

impl FaultBinding {
    /// Liaison d'une erreur générée : construite depuis la raison et son
    /// bean de détail, le bean ressort tel quel à l'aller.
    pub fn fault_info<E, C, G>(detail_name: QName, construct: C, fault_info: G) -> Self
    where
        E: ServiceFault,
        C: Fn(String, Element) -> E + Send + Sync + 'static,
        G: Fn(&E) -> Element + Send + Sync + 'static,
    {
        Self {
            detail_name,
            kind: FaultKind::FaultInfo,
            fault_type: TypeId::of::<E>(),
            construct: Box::new(move |reason, detail| {
                Ok(Box::new(construct(reason, detail.clone())) as Box<dyn ServiceFault>)
            }),
            extract: Box::new(move |fault| Ok(fault_info(downcast::<E>(fault)?))),
        }
    }

    /// Liaison d'une erreur applicative : construite depuis la raison
    /// seule, puis ses champs recopiés depuis les enfants du détail.
    pub fn user_defined<E, N>(detail_name: QName, new: N, fields: Vec<FaultField<E>>) -> Self
    where
        E: ServiceFault,
        N: Fn(String) -> E + Send + Sync + 'static,
    {
        let fields = Arc::new(fields);
        let read_fields = Arc::clone(&fields);
        let detail_tag = detail_name.clone();

        Self {
            detail_name,
            kind: FaultKind::UserDefined,
            fault_type: TypeId::of::<E>(),
            construct: Box::new(move |reason, detail| {
                let mut fault = new(reason);
                for field in read_fields.iter() {
                    if let Some(child) = detail.get_child(field.name) {
                        let text = child.get_text().unwrap_or_default();
                        (field.set)(&mut fault, text.trim());
                    }
                }
                Ok(Box::new(fault) as Box<dyn ServiceFault>)
            }),
            extract: Box::new(move |fault| {
                let typed = downcast::<E>(fault)?;
                let mut detail = Element::new(&detail_tag.local);
                if !detail_tag.namespace.is_empty() {
                    detail
                        .attributes
                        .insert("xmlns".to_string(), detail_tag.namespace.clone());
                }
                for field in fields.iter() {
                    let mut child = Element::new(field.name);
                    child.children.push(XMLNode::Text((field.get)(typed)));
                    detail.children.push(XMLNode::Element(child));
                }
                Ok(detail)
            }),
        }
    }

    /// QName de l'élément de détail wire
    pub fn detail_name(&self) -> &QName {
        &self.detail_name
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// Construit l'erreur typée depuis le fault-string et son détail
    pub fn construct(
        &self,
        reason: String,
        detail: &Element,
    ) -> Result<Box<dyn ServiceFault>, FaultError> {
        (self.construct)(reason, detail)
    }

    /// Sérialise l'erreur typée en élément de détail
    pub fn extract(&self, fault: &dyn ServiceFault) -> Result<Element, FaultError> {
        (self.extract)(fault)
    }
}

impl fmt::Debug for FaultBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultBinding")
            .field("detail_name", &self.detail_name)
            .field("kind", &self.kind)
            .finish()
    }
}

fn downcast<E: ServiceFault>(fault: &dyn ServiceFault) -> Result<&E, FaultError> {
    let any: &dyn Any = fault;
    any.downcast_ref::<E>().ok_or_else(|| {
        FaultError::Marshal("fault value does not match the registered binding type".to_string())
    })
}

/// Modèle de faults d'un port, gelé avant mise en service.
///
/// Les deux index partagent les mêmes liaisons; l'enregistrement passe
/// par un point unique, ils ne peuvent pas diverger.
#[derive(Debug, Default)]
pub struct FaultModel {
    by_detail: HashMap<QName, Arc<FaultBinding>>,
    by_type: HashMap<TypeId, Arc<FaultBinding>>,
}

impl FaultModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre une liaison dans les deux index
    pub fn register(&mut self, binding: FaultBinding) {
        let binding = Arc::new(binding);
        self.by_detail
            .insert(binding.detail_name.clone(), Arc::clone(&binding));
        self.by_type.insert(binding.fault_type, binding);
    }

    /// Liaison dont l'élément de détail porte ce QName
    pub fn by_detail(&self, name: &QName) -> Option<&Arc<FaultBinding>> {
        self.by_detail.get(name)
    }

    /// Liaison du type concret de cette erreur
    pub fn for_fault(&self, fault: &dyn ServiceFault) -> Option<&Arc<FaultBinding>> {
        let any: &dyn Any = fault;
        self.by_type.get(&any.type_id())
    }

    pub fn is_empty(&self) -> bool {
        self.by_detail.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct CalcFault {
        message: String,
        info: Element,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct QuotaFault {
        message: String,
        limit: String,
    }

    fn detail(xml: &str) -> Element {
        Element::parse(xml.as_bytes()).unwrap()
    }

    fn calc_binding() -> FaultBinding {
        FaultBinding::fault_info(
            QName::new("urn:calc", "CalcError"),
            |message, info| CalcFault { message, info },
            |f: &CalcFault| f.info.clone(),
        )
    }

    #[test]
    fn test_register_keeps_both_indexes_consistent() {
        let mut model = FaultModel::new();
        model.register(calc_binding());

        let tag = QName::new("urn:calc", "CalcError");
        let by_detail = model.by_detail(&tag).unwrap();
        let fault = by_detail
            .construct("bad".to_string(), &detail("<CalcError/>"))
            .unwrap();
        let by_type = model.for_fault(fault.as_ref()).unwrap();
        assert_eq!(by_type.detail_name(), &tag);
        assert_eq!(by_type.kind(), FaultKind::FaultInfo);
    }

    #[test]
    fn test_fault_info_detail_round_trip() {
        let binding = calc_binding();
        let info = detail(r#"<CalcError xmlns="urn:calc"><op>div</op></CalcError>"#);
        let fault = binding.construct("divide by zero".to_string(), &info).unwrap();
        assert_eq!(fault.to_string(), "divide by zero");
        assert_eq!(binding.extract(fault.as_ref()).unwrap(), info);
    }

    #[test]
    fn test_user_defined_copies_fields_both_ways() {
        let binding = FaultBinding::user_defined(
            QName::new("urn:test", "QuotaExceeded"),
            |message| QuotaFault {
                message,
                limit: String::new(),
            },
            vec![FaultField {
                name: "limit",
                get: |f: &QuotaFault| f.limit.clone(),
                set: |f, v| f.limit = v.to_string(),
            }],
        );

        let fault = binding
            .construct(
                "over quota".to_string(),
                &detail(r#"<QuotaExceeded xmlns="urn:test"><limit>10</limit></QuotaExceeded>"#),
            )
            .unwrap();
        let any: &dyn Any = fault.as_ref();
        assert_eq!(any.downcast_ref::<QuotaFault>().unwrap().limit, "10");

        let out = binding.extract(fault.as_ref()).unwrap();
        assert_eq!(out.get_child("limit").unwrap().get_text().unwrap(), "10");
    }

    #[test]
    fn test_extract_rejects_foreign_fault_type() {
        let binding = calc_binding();
        let foreign = QuotaFault {
            message: "nope".to_string(),
            limit: String::new(),
        };
        assert!(matches!(
            binding.extract(&foreign),
            Err(FaultError::Marshal(_))
        ));
    }
}
