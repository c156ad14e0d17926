//! # Modèle de port
//!
//! Vue en lecture seule du contrat d'un endpoint : opérations liées,
//! liaisons de paramètres et modèle de faults vérifiés.
//!
//! Le modèle est produit par un collaborateur externe (lecture du WSDL ou
//! des annotations, hors du périmètre de ce crate) et gelé par
//! [`PortModelBuilder::build`], qui vérifie les invariants de liaison.
//! Après gel, tout est immuable et partageable entre appels concurrents.

mod fault;

pub use fault::{FaultBinding, FaultField, FaultKind, FaultModel, ServiceFault};

use std::collections::HashMap;
use std::sync::Arc;

use crate::addressing::AddressingVersion;
use crate::binding::PartCodec;
use crate::qname::QName;

/// Erreur de configuration du modèle, détectée au gel.
///
/// Fatale : jamais convertie en fault par appel.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("wrapper {wrapper} has no field named {child}")]
    WrapperFieldMissing { wrapper: QName, child: QName },

    #[error("wrapper {wrapper} field {field} is not covered by any child binding")]
    WrapperFieldUncovered { wrapper: QName, field: QName },

    #[error("wrapper {wrapper} binds child {child} more than once")]
    DuplicateWrapperChild { wrapper: QName, child: QName },

    #[error("operation {operation} declares more than one return binding")]
    MultipleReturns { operation: String },

    #[error("attachment part {part} has an unmapped media representation")]
    AttachmentNotMapped { part: String },

    #[error("operation {operation} binds argument index {index} outside of {count} slots")]
    ArgumentIndexOutOfRange {
        operation: String,
        index: usize,
        count: usize,
    },
}

/// Genre d'échange d'une opération
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mep {
    OneWay,
    RequestResponse,
}

impl Mep {
    pub fn is_one_way(&self) -> bool {
        matches!(self, Mep::OneWay)
    }
}

/// Direction d'un paramètre
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    InOut,
}

/// Représentation déclarée d'une pièce jointe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentMedia {
    /// Octets bruts
    Bytes,
    /// Contenu textuel
    Text,
    /// Image décodée : représentation non supportée, limite fixe
    Image,
    /// Flux : représentation non supportée, limite fixe
    Stream,
}

/// Liaison wire d'un paramètre logique
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Body,
    Header,
    Attachment(AttachmentMedia),
    Unbound,
}

/// Paramètre logique d'une opération
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Nom qualifié de l'élément lié
    pub name: QName,

    /// Nom de part WSDL (pièces jointes)
    pub part_name: String,

    /// Indice dans le tableau d'arguments
    pub index: usize,

    pub direction: Direction,
    pub binding: BindingKind,

    /// Conversion élément <-> valeur pour cette part
    pub codec: PartCodec,

    /// Ce paramètre alimente le slot de retour direct
    pub is_return: bool,
}

impl Parameter {
    pub fn new(name: QName, index: usize, direction: Direction, codec: PartCodec) -> Self {
        Self {
            part_name: name.local.clone(),
            name,
            index,
            direction,
            binding: BindingKind::Body,
            codec,
            is_return: false,
        }
    }

    pub fn bound_to(mut self, binding: BindingKind) -> Self {
        self.binding = binding;
        self
    }

    pub fn with_part_name(mut self, part_name: impl Into<String>) -> Self {
        self.part_name = part_name.into();
        self
    }

    pub fn returning(mut self) -> Self {
        self.is_return = true;
        self
    }

    /// Un paramètre OUT/INOUT passe par une cellule Holder
    pub fn uses_holder(&self) -> bool {
        matches!(self.direction, Direction::Out | Direction::InOut)
    }
}

/// Séquence ordonnée d'enfants d'un élément wrapper.
///
/// `fields` décrit les propriétés du type wrapper déclaré par le
/// contrat; `children` les liaisons déclarées. Le gel vérifie que les
/// secondes couvrent les premières exactement une fois.
#[derive(Debug, Clone)]
pub struct WrapperParameter {
    pub name: QName,
    pub fields: Vec<QName>,
    pub children: Vec<Parameter>,
}

impl WrapperParameter {
    pub fn new(name: QName, children: Vec<Parameter>) -> Self {
        // par défaut le type wrapper expose exactement les enfants liés
        let fields = children.iter().map(|c| c.name.clone()).collect();
        Self {
            name,
            fields,
            children,
        }
    }

    pub fn with_fields(mut self, fields: Vec<QName>) -> Self {
        self.fields = fields;
        self
    }
}

/// Forme de liaison du payload d'une opération
#[derive(Debug, Clone)]
pub enum PayloadStyle {
    /// Corps vide
    Empty,

    /// Le payload entier est une seule valeur
    Bare(Parameter),

    /// Wrapper document-literal : enfants extraits par propriété
    DocLitWrapped(WrapperParameter),

    /// Wrapper rpc-literal : enfants désérialisés indépendamment
    RpcLit(WrapperParameter),
}

/// Action d'entrée attribuée par défaut quand le contrat n'en déclare pas
pub const DEFAULT_INPUT_ACTION: &str = "http://fake.input.action";

/// Action de sortie attribuée par défaut
pub const DEFAULT_OUTPUT_ACTION: &str = "http://fake.output.action";

/// Opération liée du modèle de port.
///
/// Lecture seule après construction.
#[derive(Debug, Clone)]
pub struct BoundOperation {
    /// Nom logique de l'opération
    pub name: String,

    pub mep: Mep,

    /// Action d'entrée attendue
    pub input_action: String,

    /// Vrai si `input_action` est la valeur par défaut de la bibliothèque
    pub input_action_default: bool,

    /// Action de sortie déclarée
    pub output_action: Option<String>,

    /// Valeur SOAPAction du binding transport
    pub soap_action: Option<String>,

    /// QName de détail de fault -> action wire du fault
    pub fault_actions: HashMap<QName, String>,
}

impl BoundOperation {
    pub fn new(name: impl Into<String>, mep: Mep) -> Self {
        Self {
            name: name.into(),
            mep,
            input_action: DEFAULT_INPUT_ACTION.to_string(),
            input_action_default: true,
            output_action: None,
            soap_action: None,
            fault_actions: HashMap::new(),
        }
    }

    pub fn with_input_action(mut self, action: impl Into<String>) -> Self {
        self.input_action = action.into();
        self.input_action_default = false;
        self
    }

    pub fn with_output_action(mut self, action: impl Into<String>) -> Self {
        self.output_action = Some(action.into());
        self
    }

    pub fn with_soap_action(mut self, action: impl Into<String>) -> Self {
        self.soap_action = Some(action.into());
        self
    }

    pub fn with_fault_action(mut self, detail: QName, action: impl Into<String>) -> Self {
        self.fault_actions.insert(detail, action.into());
        self
    }

    /// Action de sortie, valeur par défaut de la bibliothèque à défaut
    pub fn output_action_or_default(&self) -> &str {
        self.output_action.as_deref().unwrap_or(DEFAULT_OUTPUT_ACTION)
    }

    /// Action à porter par un fault dont le détail est `detail`.
    ///
    /// Retombe sur l'action de fault par défaut de la version
    /// d'adressage quand l'opération n'en déclare pas pour ce détail.
    pub fn fault_action(&self, detail: &QName, version: AddressingVersion) -> String {
        self.fault_actions
            .get(detail)
            .cloned()
            .unwrap_or_else(|| version.vocabulary().default_fault_action.to_string())
    }
}

/// Liaison complète d'une opération : payload, en-têtes, pièces jointes
#[derive(Debug, Clone)]
pub struct OperationBinding {
    pub operation: Arc<BoundOperation>,
    pub style: PayloadStyle,
    pub headers: Vec<Parameter>,
    pub attachments: Vec<Parameter>,
    pub unbound: Vec<Parameter>,

    /// Taille du tableau d'arguments de l'invocation
    pub arg_count: usize,
}

impl OperationBinding {
    pub fn new(operation: BoundOperation, style: PayloadStyle, arg_count: usize) -> Self {
        Self {
            operation: Arc::new(operation),
            style,
            headers: Vec::new(),
            attachments: Vec::new(),
            unbound: Vec::new(),
            arg_count,
        }
    }

    pub fn with_header(mut self, param: Parameter) -> Self {
        self.headers.push(param);
        self
    }

    pub fn with_attachment(mut self, param: Parameter) -> Self {
        self.attachments.push(param);
        self
    }

    pub fn with_unbound(mut self, param: Parameter) -> Self {
        self.unbound.push(param);
        self
    }

    /// QName du payload attendu en entrée, `None` pour un corps vide
    pub fn payload_qname(&self) -> Option<&QName> {
        match &self.style {
            PayloadStyle::Empty => None,
            PayloadStyle::Bare(p) => Some(&p.name),
            PayloadStyle::DocLitWrapped(w) | PayloadStyle::RpcLit(w) => Some(&w.name),
        }
    }

    fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        let style_params: Box<dyn Iterator<Item = &Parameter>> = match &self.style {
            PayloadStyle::Empty => Box::new(std::iter::empty()),
            PayloadStyle::Bare(p) => Box::new(std::iter::once(p)),
            PayloadStyle::DocLitWrapped(w) | PayloadStyle::RpcLit(w) => {
                Box::new(w.children.iter())
            }
        };
        style_params
            .chain(self.headers.iter())
            .chain(self.attachments.iter())
            .chain(self.unbound.iter())
    }
}

/// Configuration d'adressage d'un port
#[derive(Debug, Clone, Copy)]
pub struct AddressingConfig {
    pub version: AddressingVersion,
    pub required: bool,
}

/// Modèle de port gelé.
///
/// Partagé en lecture seule par tout le trafic; construit une fois avant
/// la mise en service.
#[derive(Debug)]
pub struct PortModel {
    addressing: Option<AddressingConfig>,
    by_payload: HashMap<QName, Arc<OperationBinding>>,
    by_action: HashMap<String, Arc<OperationBinding>>,
    operations: Vec<Arc<OperationBinding>>,
}

impl PortModel {
    pub fn addressing_enabled(&self) -> bool {
        self.addressing.is_some()
    }

    pub fn addressing_required(&self) -> bool {
        self.addressing.is_some_and(|a| a.required)
    }

    pub fn addressing_version(&self) -> Option<AddressingVersion> {
        self.addressing.map(|a| a.version)
    }

    pub fn operation_by_payload(&self, name: &QName) -> Option<&Arc<OperationBinding>> {
        self.by_payload.get(name)
    }

    pub fn operation_by_action(&self, action: &str) -> Option<&Arc<OperationBinding>> {
        self.by_action.get(action)
    }

    pub fn operations(&self) -> impl Iterator<Item = &Arc<OperationBinding>> {
        self.operations.iter()
    }
}

/// Constructeur du modèle de port, validation des invariants au gel
#[derive(Debug, Default)]
pub struct PortModelBuilder {
    addressing: Option<AddressingConfig>,
    bindings: Vec<OperationBinding>,
}

impl PortModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn addressing(mut self, version: AddressingVersion, required: bool) -> Self {
        self.addressing = Some(AddressingConfig { version, required });
        self
    }

    pub fn operation(mut self, binding: OperationBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Gèle le modèle.
    ///
    /// Vérifie les invariants de liaison : couverture exacte des champs
    /// de wrapper, unicité du slot de retour, indices d'arguments dans
    /// les bornes, représentations de pièces jointes supportées.
    pub fn build(self) -> Result<PortModel, ModelError> {
        let mut by_payload = HashMap::new();
        let mut by_action = HashMap::new();
        let mut operations = Vec::new();

        for binding in self.bindings {
            validate_binding(&binding)?;

            let binding = Arc::new(binding);
            if let Some(name) = binding.payload_qname() {
                by_payload.insert(name.clone(), Arc::clone(&binding));
            }
            if !binding.operation.input_action_default {
                by_action.insert(binding.operation.input_action.clone(), Arc::clone(&binding));
            }
            operations.push(binding);
        }

        Ok(PortModel {
            addressing: self.addressing,
            by_payload,
            by_action,
            operations,
        })
    }
}

fn validate_binding(binding: &OperationBinding) -> Result<(), ModelError> {
    match &binding.style {
        PayloadStyle::DocLitWrapped(w) => validate_wrapper(w, true)?,
        PayloadStyle::RpcLit(w) => validate_wrapper(w, false)?,
        _ => {}
    }

    let mut returns = 0;
    for param in binding.parameters() {
        if param.is_return {
            returns += 1;
        }
        if param.index >= binding.arg_count && !param.is_return {
            return Err(ModelError::ArgumentIndexOutOfRange {
                operation: binding.operation.name.clone(),
                index: param.index,
                count: binding.arg_count,
            });
        }
        if let BindingKind::Attachment(media) = &param.binding
            && matches!(media, AttachmentMedia::Image | AttachmentMedia::Stream)
        {
            return Err(ModelError::AttachmentNotMapped {
                part: param.part_name.clone(),
            });
        }
    }
    if returns > 1 {
        return Err(ModelError::MultipleReturns {
            operation: binding.operation.name.clone(),
        });
    }

    Ok(())
}

fn validate_wrapper(wrapper: &WrapperParameter, exact_cover: bool) -> Result<(), ModelError> {
    let mut seen: Vec<&QName> = Vec::new();
    for child in &wrapper.children {
        if seen.contains(&&child.name) {
            return Err(ModelError::DuplicateWrapperChild {
                wrapper: wrapper.name.clone(),
                child: child.name.clone(),
            });
        }
        seen.push(&child.name);

        if exact_cover && !wrapper.fields.contains(&child.name) {
            return Err(ModelError::WrapperFieldMissing {
                wrapper: wrapper.name.clone(),
                child: child.name.clone(),
            });
        }
    }

    if exact_cover {
        for field in &wrapper.fields {
            if !wrapper.children.iter().any(|c| &c.name == field) {
                return Err(ModelError::WrapperFieldUncovered {
                    wrapper: wrapper.name.clone(),
                    field: field.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_param(local: &str, index: usize) -> Parameter {
        Parameter::new(QName::local(local), index, Direction::In, PartCodec::Text)
    }

    fn wrapped_op(children: Vec<Parameter>, fields: Option<Vec<QName>>) -> OperationBinding {
        let count = children.len();
        let mut wrapper = WrapperParameter::new(QName::new("urn:test", "Op"), children);
        if let Some(fields) = fields {
            wrapper = wrapper.with_fields(fields);
        }
        OperationBinding::new(
            BoundOperation::new("op", Mep::RequestResponse),
            PayloadStyle::DocLitWrapped(wrapper),
            count,
        )
    }

    #[test]
    fn test_freeze_accepts_exact_cover() {
        let model = PortModelBuilder::new()
            .operation(wrapped_op(vec![text_param("a", 0), text_param("b", 1)], None))
            .build()
            .unwrap();
        assert!(
            model
                .operation_by_payload(&QName::new("urn:test", "Op"))
                .is_some()
        );
    }

    #[test]
    fn test_freeze_rejects_unknown_wrapper_child() {
        let err = PortModelBuilder::new()
            .operation(wrapped_op(
                vec![text_param("a", 0)],
                Some(vec![QName::local("other")]),
            ))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::WrapperFieldMissing { .. }));
    }

    #[test]
    fn test_freeze_rejects_uncovered_field() {
        let err = PortModelBuilder::new()
            .operation(wrapped_op(
                vec![text_param("a", 0)],
                Some(vec![QName::local("a"), QName::local("b")]),
            ))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::WrapperFieldUncovered { .. }));
    }

    #[test]
    fn test_freeze_rejects_duplicate_child() {
        let err = PortModelBuilder::new()
            .operation(wrapped_op(vec![text_param("a", 0), text_param("a", 1)], None))
            .build()
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateWrapperChild { .. }));
    }

    #[test]
    fn test_freeze_rejects_multiple_returns() {
        let op = wrapped_op(
            vec![
                text_param("a", 0).returning(),
                text_param("b", 1).returning(),
            ],
            None,
        );
        let err = PortModelBuilder::new().operation(op).build().unwrap_err();
        assert!(matches!(err, ModelError::MultipleReturns { .. }));
    }

    #[test]
    fn test_freeze_rejects_unmapped_attachment_media() {
        let att = Parameter::new(QName::local("img"), 0, Direction::In, PartCodec::Text)
            .bound_to(BindingKind::Attachment(AttachmentMedia::Image));
        let op = OperationBinding::new(
            BoundOperation::new("op", Mep::OneWay),
            PayloadStyle::Empty,
            1,
        )
        .with_attachment(att);
        let err = PortModelBuilder::new().operation(op).build().unwrap_err();
        assert!(matches!(err, ModelError::AttachmentNotMapped { .. }));
    }

    #[test]
    fn test_fault_action_fallback() {
        let op = BoundOperation::new("op", Mep::RequestResponse)
            .with_fault_action(QName::new("urn:test", "Oops"), "urn:test:oops");
        assert_eq!(
            op.fault_action(&QName::new("urn:test", "Oops"), AddressingVersion::W3c),
            "urn:test:oops"
        );
        assert_eq!(
            op.fault_action(&QName::new("urn:test", "Other"), AddressingVersion::W3c),
            "http://www.w3.org/2005/08/addressing/fault"
        );
    }

    #[test]
    fn test_action_index_skips_defaulted_actions() {
        let op = OperationBinding::new(
            BoundOperation::new("op", Mep::OneWay),
            PayloadStyle::Empty,
            0,
        );
        let model = PortModelBuilder::new().operation(op).build().unwrap();
        assert!(model.operation_by_action(DEFAULT_INPUT_ACTION).is_none());
    }
}
