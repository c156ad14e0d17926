//! # Module de liaison d'arguments
//!
//! Famille de stratégies déplaçant les valeurs entre le payload wire et
//! le tableau d'arguments typé d'une invocation.
//!
//! ## Architecture
//!
//! - [`Value`] / [`PartCodec`] : valeurs d'argument et conversion XML
//! - [`Args`] / [`Holder`] : tableau positionnel et cellules IN/OUT
//! - [`ArgumentsReader`] : stratégies côté serveur (bare, wrapped,
//!   rpc-literal, en-tête, pièce jointe) composées par [`Composite`]
//! - [`PayloadBuilder`] : construction miroir côté client
//! - [`compile_reader`] / [`compile_request_builder`] : assemblage des
//!   stratégies depuis le modèle gelé
//!
//! Les stratégies sont sans état après construction et s'invoquent
//! librement en concurrence; l'état par appel vit dans [`Args`].

mod args;
mod client;
mod compile;
mod reader;
mod value;

pub use args::{Args, Holder, Slot, ValueGetter, ValueSetter};
pub use client::{BareBody, EmptyBody, PayloadBuilder, WrappedBody};
pub use compile::{compile_reader, compile_request_builder};
pub use reader::{
    ArgumentsReader, AttachmentReader, BareReader, Composite, DocLitReader, HeaderReader, NoArgs,
    NullSetter, RpcLitReader,
};
pub use value::{PartCodec, Value};

use crate::qname::QName;

/// Erreur de liaison par appel.
///
/// Court-circuitée en réponse de fault par l'appelant, jamais propagée
/// au code applicatif côté serveur.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("message has no payload")]
    MissingPayload,

    #[error("unexpected wrapper element {got}, expected {expected}")]
    UnexpectedWrapper { expected: QName, got: QName },

    #[error("part {name} does not carry the expected value shape")]
    TypeMismatch { name: QName },

    #[error("invalid base64 content in part {name}: {source}")]
    Base64 {
        name: QName,
        source: base64::DecodeError,
    },

    #[error("attachment part {part} has no mapped representation")]
    AttachmentNotMapped { part: String },

    #[error("attachment part {part} is not valid UTF-8")]
    AttachmentEncoding { part: String },

    #[error("argument for {name} is absent")]
    MissingArgument { name: QName },
}
