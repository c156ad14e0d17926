//! Tableau d'arguments et accesseurs de valeur.
//!
//! Les indices du tableau correspondent un pour un à la signature
//! déclarée de l'opération. Un paramètre OUT/INOUT occupe son slot via
//! une cellule [`Holder`] dont la mutation est l'effet visible de la
//! liaison; les accesseurs [`ValueSetter`] et [`ValueGetter`] abstraient
//! la différence entre slot simple et cellule.

use std::sync::Arc;

use parking_lot::Mutex;

use super::Value;
use crate::model::Parameter;

/// Cellule de référence mutable d'un paramètre OUT/INOUT
#[derive(Debug, Clone, Default)]
pub struct Holder(Arc<Mutex<Option<Value>>>);

impl Holder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: Value) -> Self {
        Self(Arc::new(Mutex::new(Some(value))))
    }

    pub fn get(&self) -> Option<Value> {
        self.0.lock().clone()
    }

    pub fn set(&self, value: Option<Value>) {
        *self.0.lock() = value;
    }
}

/// Slot du tableau d'arguments
#[derive(Debug, Clone, Default)]
pub enum Slot {
    /// Non initialisé (équivalent du zéro/null de la machine)
    #[default]
    Empty,

    /// Valeur directe
    Plain(Value),

    /// Cellule partagée
    Holder(Holder),
}

/// Tableau positionnel des arguments d'une invocation.
///
/// Transitoire, un par appel, propriété exclusive de l'invocation.
#[derive(Debug, Default)]
pub struct Args {
    slots: Vec<Slot>,
}

impl Args {
    /// Tableau de `count` slots non initialisés
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count).map(|_| Slot::Empty).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Place une cellule pré-existante dans un slot (arguments INOUT
    /// fournis par l'appelant côté client)
    pub fn put_holder(&mut self, index: usize, holder: Holder) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Slot::Holder(holder);
        }
    }

    /// Valeur directe d'un slot côté client
    pub fn put_plain(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Slot::Plain(value);
        }
    }
}

/// Écrit la valeur d'un paramètre à sa place dans le tableau
#[derive(Debug, Clone, Copy)]
pub struct ValueSetter {
    index: usize,
    holder: bool,
}

impl ValueSetter {
    pub fn for_parameter(param: &Parameter) -> Self {
        Self {
            index: param.index,
            holder: param.uses_holder(),
        }
    }

    pub fn plain(index: usize) -> Self {
        Self {
            index,
            holder: false,
        }
    }

    pub fn holder(index: usize) -> Self {
        Self {
            index,
            holder: true,
        }
    }

    /// Dépose `value` dans le slot, en créant la cellule au besoin
    pub fn put(&self, value: Value, args: &mut Args) {
        let Some(slot) = args.slots.get_mut(self.index) else {
            debug_assert!(false, "argument index out of range");
            return;
        };
        if self.holder {
            match slot {
                Slot::Holder(h) => h.set(Some(value)),
                _ => *slot = Slot::Holder(Holder::with_value(value)),
            }
        } else {
            *slot = Slot::Plain(value);
        }
    }

    /// Remet le slot à sa valeur non initialisée
    pub fn clear(&self, args: &mut Args) {
        let Some(slot) = args.slots.get_mut(self.index) else {
            return;
        };
        if self.holder {
            match slot {
                Slot::Holder(h) => h.set(None),
                _ => *slot = Slot::Holder(Holder::new()),
            }
        } else {
            *slot = Slot::Empty;
        }
    }
}

/// Lit la valeur d'un paramètre depuis le tableau
#[derive(Debug, Clone, Copy)]
pub struct ValueGetter {
    index: usize,
    holder: bool,
}

impl ValueGetter {
    pub fn for_parameter(param: &Parameter) -> Self {
        Self {
            index: param.index,
            holder: param.uses_holder(),
        }
    }

    pub fn get(&self, args: &Args) -> Option<Value> {
        match args.slots.get(self.index)? {
            Slot::Empty => None,
            Slot::Plain(v) => Some(v.clone()),
            Slot::Holder(h) => {
                if self.holder {
                    h.get()
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::PartCodec;
    use crate::model::{Direction, Parameter};
    use crate::qname::QName;

    #[test]
    fn test_plain_setter_and_getter() {
        let mut args = Args::new(2);
        let setter = ValueSetter::plain(1);
        setter.put(Value::Text("x".to_string()), &mut args);
        let getter = ValueGetter {
            index: 1,
            holder: false,
        };
        assert_eq!(getter.get(&args), Some(Value::Text("x".to_string())));
    }

    #[test]
    fn test_holder_setter_creates_cell() {
        let mut args = Args::new(1);
        let setter = ValueSetter::holder(0);
        setter.put(Value::Text("out".to_string()), &mut args);
        match args.slot(0).unwrap() {
            Slot::Holder(h) => assert_eq!(h.get(), Some(Value::Text("out".to_string()))),
            other => panic!("expected holder slot, got {other:?}"),
        }
    }

    #[test]
    fn test_holder_mutation_is_visible_through_clone() {
        // la mutation de la cellule est l'effet visible de la liaison
        let holder = Holder::new();
        let mut args = Args::new(1);
        args.put_holder(0, holder.clone());
        ValueSetter::holder(0).put(Value::Text("v".to_string()), &mut args);
        assert_eq!(holder.get(), Some(Value::Text("v".to_string())));
    }

    #[test]
    fn test_inout_parameter_uses_holder() {
        let p = Parameter::new(QName::local("a"), 0, Direction::InOut, PartCodec::Text);
        assert!(p.uses_holder());
        let p = Parameter::new(QName::local("a"), 0, Direction::In, PartCodec::Text);
        assert!(!p.uses_holder());
    }

    #[test]
    fn test_clear_resets_slot() {
        let mut args = Args::new(1);
        args.put_plain(0, Value::Text("x".to_string()));
        ValueSetter::plain(0).clear(&mut args);
        assert!(matches!(args.slot(0).unwrap(), Slot::Empty));
    }
}
