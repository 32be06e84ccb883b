//! Runtime type registrations for types the binder has no built-in or
//! extension support for.
//!
//! The typical use-case is making third-party types embeddable in schemas:
//! for first-party types, implementing [`ParamValue`](crate::ParamValue) (or
//! `FromStr`/`Display` plus [`TypeDesc`](crate::TypeDesc)) is the nicer
//! solution because it needs no registry at all.
//!
//! A registration wins over every other dispatch strategy, built-ins
//! included, so applications can also use it to override default behavior
//! for any type. The registry is a plain value owned by the binder (or by
//! [`cli::Command`](crate::cli::Command)) and passed by reference through the
//! walk — there is no global state, and parallel tests can each use their
//! own. It is not internally synchronized; share it behind your own lock if
//! you must mutate it concurrently (registration normally happens once,
//! before commands run).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use crate::value::{ParamValue, ValueError};

/// A registered (parse, display) pair for one type, keyed by its `TypeId`.
#[derive(Clone)]
pub struct TypeRegistration {
    name: String,
    apply: Arc<dyn Fn(&mut dyn Any, &str) -> Result<(), ValueError> + Send + Sync>,
    display: Arc<dyn Fn(&dyn Any) -> String + Send + Sync>,
}

impl std::fmt::Debug for TypeRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistration")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Mapping from type identity to a custom parse/serialize pair.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    entries: HashMap<TypeId, TypeRegistration>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom type. Registering an already-registered type
    /// overwrites the previous entry.
    ///
    /// `parse` turns the textual value into a `T`; `display` renders the
    /// current value for help text and environment dumps.
    pub fn register<T, E>(
        &mut self,
        parse: impl Fn(&str) -> Result<T, E> + Send + Sync + 'static,
        display: impl Fn(&T) -> String + Send + Sync + 'static,
    ) where
        T: Any,
        E: Display,
    {
        let apply = move |target: &mut dyn Any, text: &str| {
            let value = parse(text).map_err(ValueError::new)?;
            match target.downcast_mut::<T>() {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(ValueError::new("type registration mismatch")),
            }
        };
        let display = move |value: &dyn Any| {
            value.downcast_ref::<T>().map(&display).unwrap_or_default()
        };
        self.entries.insert(
            TypeId::of::<T>(),
            TypeRegistration {
                name: short_type_name::<T>().to_string(),
                apply: Arc::new(apply),
                display: Arc::new(display),
            },
        );
    }

    /// Remove a registration. Removing an unregistered type is a no-op;
    /// useful for restoring built-in dispatch in tests.
    pub fn unregister<T: Any>(&mut self) {
        self.entries.remove(&TypeId::of::<T>());
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    pub(crate) fn lookup(&self, id: TypeId) -> Option<&TypeRegistration> {
        self.entries.get(&id)
    }
}

/// [`ParamValue`] view of a field served by a [`TypeRegistration`].
pub(crate) struct RegisteredValue<'a> {
    target: &'a mut dyn Any,
    reg: TypeRegistration,
}

impl<'a> RegisteredValue<'a> {
    pub(crate) fn new(target: &'a mut dyn Any, reg: TypeRegistration) -> Self {
        Self { target, reg }
    }
}

impl ParamValue for RegisteredValue<'_> {
    fn set_text(&mut self, text: &str) -> Result<(), ValueError> {
        (self.reg.apply)(self.target, text)
    }

    fn text(&self) -> String {
        (self.reg.display)(self.target)
    }

    fn type_name(&self) -> String {
        self.reg.name.clone()
    }
}

/// Last path segment of a type name: `my_app::config::Level` → `Level`.
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Default)]
    struct Tier(u8);

    fn parse_tier(text: &str) -> Result<Tier, String> {
        match text {
            "gold" => Ok(Tier(1)),
            "silver" => Ok(Tier(2)),
            _ => Err(format!("unknown tier {text:?}")),
        }
    }

    fn display_tier(tier: &Tier) -> String {
        match tier.0 {
            1 => "gold".to_string(),
            2 => "silver".to_string(),
            _ => "unset".to_string(),
        }
    }

    #[test]
    fn register_and_unregister() {
        let mut registry = TypeRegistry::new();
        assert!(!registry.contains::<Tier>());

        registry.register(parse_tier, display_tier);
        assert!(registry.contains::<Tier>());
        let entry = registry.lookup(TypeId::of::<Tier>()).unwrap();
        assert_eq!(entry.name, "Tier");

        registry.unregister::<Tier>();
        assert!(!registry.contains::<Tier>());
        // Removing again is a no-op.
        registry.unregister::<Tier>();
    }

    #[test]
    fn registered_value_round_trips() {
        let mut registry = TypeRegistry::new();
        registry.register(parse_tier, display_tier);
        let reg = registry.lookup(TypeId::of::<Tier>()).unwrap().clone();

        let mut tier = Tier::default();
        let mut value = RegisteredValue::new(&mut tier, reg);
        assert_eq!(value.text(), "unset");
        value.set_text("gold").unwrap();
        assert_eq!(value.text(), "gold");
        assert_eq!(value.type_name(), "Tier");
        drop(value);
        assert_eq!(tier, Tier(1));
    }

    #[test]
    fn parse_failure_carries_message() {
        let mut registry = TypeRegistry::new();
        registry.register(parse_tier, display_tier);
        let reg = registry.lookup(TypeId::of::<Tier>()).unwrap().clone();

        let mut tier = Tier::default();
        let mut value = RegisteredValue::new(&mut tier, reg);
        let err = value.set_text("bronze").unwrap_err();
        assert!(err.to_string().contains("unknown tier"));
        assert_eq!(tier, Tier(0));
    }

    #[test]
    fn reregistering_overwrites() {
        let mut registry = TypeRegistry::new();
        registry.register(parse_tier, display_tier);
        registry.register(
            |_: &str| Ok::<_, String>(Tier(9)),
            |_: &Tier| "nine".to_string(),
        );
        let reg = registry.lookup(TypeId::of::<Tier>()).unwrap().clone();

        let mut tier = Tier::default();
        let mut value = RegisteredValue::new(&mut tier, reg);
        value.set_text("anything").unwrap();
        drop(value);
        assert_eq!(tier, Tier(9));
    }
}
