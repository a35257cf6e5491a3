//! Dispatcher and facet composition.
//!
//! Behavior is attached to a simulant by name-lookup into these registries.
//! Each dispatcher/facet implements a fixed trait with default no-op bodies;
//! facet stacking is explicit iteration over an entity's ordered name list,
//! not inheritance chaining. New behavior is added by editing a name list
//! and registering an implementation, not by subclassing.

use crate::error::KernelError;
use crate::message::RenderDescriptor;
use crate::simulant::Entity;
use crate::world::World;
use crate::xtension::FieldDefault;
use glam::Vec2;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tableau_common::Address;

/// Name the standard game dispatcher is registered under.
pub const DEFAULT_GAME_DISPATCHER: &str = "game";
/// Name the standard screen dispatcher is registered under.
pub const DEFAULT_SCREEN_DISPATCHER: &str = "screen";
/// Name the standard group dispatcher is registered under.
pub const DEFAULT_GROUP_DISPATCHER: &str = "group";
/// Name the standard entity dispatcher is registered under.
pub const DEFAULT_ENTITY_DISPATCHER: &str = "entity";

/// Lifecycle hooks for the game simulant.
pub trait GameDispatcher: Send + Sync {
    fn register(&self, world: &mut World) -> Result<(), KernelError> {
        let _ = world;
        Ok(())
    }

    fn unregister(&self, world: &mut World) -> Result<(), KernelError> {
        let _ = world;
        Ok(())
    }

    fn field_defaults(&self) -> Vec<FieldDefault> {
        Vec::new()
    }
}

/// Lifecycle hooks for a screen.
pub trait ScreenDispatcher: Send + Sync {
    fn register(&self, screen: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (screen, world);
        Ok(())
    }

    fn unregister(&self, screen: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (screen, world);
        Ok(())
    }

    fn field_defaults(&self) -> Vec<FieldDefault> {
        Vec::new()
    }
}

/// Lifecycle hooks for a group.
pub trait GroupDispatcher: Send + Sync {
    fn register(&self, group: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (group, world);
        Ok(())
    }

    fn unregister(&self, group: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (group, world);
        Ok(())
    }

    fn field_defaults(&self) -> Vec<FieldDefault> {
        Vec::new()
    }
}

/// Lifecycle and query hooks for an entity's primary behavior.
pub trait EntityDispatcher: Send + Sync {
    fn register(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (entity, world);
        Ok(())
    }

    fn unregister(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (entity, world);
        Ok(())
    }

    fn register_physics(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (entity, world);
        Ok(())
    }

    fn unregister_physics(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (entity, world);
        Ok(())
    }

    /// Sync entity state from the physics subsystem's view of it.
    fn propagate_physics(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (entity, world);
        Ok(())
    }

    fn render_descriptors(&self, entity: &Entity, world: &World) -> Vec<RenderDescriptor> {
        let _ = (entity, world);
        Vec::new()
    }

    fn quick_size(&self, entity: &Entity, world: &World) -> Vec2 {
        let _ = world;
        entity.size
    }

    fn picking_priority(&self, entity: &Entity) -> f32 {
        entity.depth
    }

    fn field_defaults(&self) -> Vec<FieldDefault> {
        Vec::new()
    }
}

/// Optional additive behavior unit, stackable onto entities.
///
/// Facets contribute their own default fields and hooks; an entity's stack
/// runs in `facet_names` order after its dispatcher.
pub trait Facet: Send + Sync {
    fn register(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (entity, world);
        Ok(())
    }

    fn unregister(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (entity, world);
        Ok(())
    }

    fn register_physics(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (entity, world);
        Ok(())
    }

    fn unregister_physics(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (entity, world);
        Ok(())
    }

    fn propagate_physics(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let _ = (entity, world);
        Ok(())
    }

    fn render_descriptors(&self, entity: &Entity, world: &World) -> Vec<RenderDescriptor> {
        let _ = (entity, world);
        Vec::new()
    }

    fn quick_size(&self, entity: &Entity, world: &World) -> Vec2 {
        let _ = (entity, world);
        Vec2::ZERO
    }

    fn field_defaults(&self) -> Vec<FieldDefault> {
        Vec::new()
    }
}

/// Standard no-op dispatchers registered under the `DEFAULT_*` names.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDispatcher;

impl GameDispatcher for StandardDispatcher {}
impl ScreenDispatcher for StandardDispatcher {}
impl GroupDispatcher for StandardDispatcher {}
impl EntityDispatcher for StandardDispatcher {}

/// Dispatcher/facet registries, keyed by unique name.
#[derive(Clone, Default)]
pub struct Components {
    game_dispatchers: BTreeMap<String, Arc<dyn GameDispatcher>>,
    screen_dispatchers: BTreeMap<String, Arc<dyn ScreenDispatcher>>,
    group_dispatchers: BTreeMap<String, Arc<dyn GroupDispatcher>>,
    entity_dispatchers: BTreeMap<String, Arc<dyn EntityDispatcher>>,
    facets: BTreeMap<String, Arc<dyn Facet>>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registries pre-seeded with the standard no-op dispatchers.
    pub fn standard() -> Self {
        let mut components = Self::new();
        let standard = Arc::new(StandardDispatcher);
        components
            .game_dispatchers
            .insert(DEFAULT_GAME_DISPATCHER.into(), standard.clone());
        components
            .screen_dispatchers
            .insert(DEFAULT_SCREEN_DISPATCHER.into(), standard.clone());
        components
            .group_dispatchers
            .insert(DEFAULT_GROUP_DISPATCHER.into(), standard.clone());
        components
            .entity_dispatchers
            .insert(DEFAULT_ENTITY_DISPATCHER.into(), standard);
        components
    }

    pub fn register_game_dispatcher(
        &mut self,
        name: impl Into<String>,
        dispatcher: Arc<dyn GameDispatcher>,
    ) -> Result<(), KernelError> {
        let name = name.into();
        if self.game_dispatchers.contains_key(&name) {
            return Err(KernelError::DuplicateComponent(name));
        }
        self.game_dispatchers.insert(name, dispatcher);
        Ok(())
    }

    pub fn register_screen_dispatcher(
        &mut self,
        name: impl Into<String>,
        dispatcher: Arc<dyn ScreenDispatcher>,
    ) -> Result<(), KernelError> {
        let name = name.into();
        if self.screen_dispatchers.contains_key(&name) {
            return Err(KernelError::DuplicateComponent(name));
        }
        self.screen_dispatchers.insert(name, dispatcher);
        Ok(())
    }

    pub fn register_group_dispatcher(
        &mut self,
        name: impl Into<String>,
        dispatcher: Arc<dyn GroupDispatcher>,
    ) -> Result<(), KernelError> {
        let name = name.into();
        if self.group_dispatchers.contains_key(&name) {
            return Err(KernelError::DuplicateComponent(name));
        }
        self.group_dispatchers.insert(name, dispatcher);
        Ok(())
    }

    pub fn register_entity_dispatcher(
        &mut self,
        name: impl Into<String>,
        dispatcher: Arc<dyn EntityDispatcher>,
    ) -> Result<(), KernelError> {
        let name = name.into();
        if self.entity_dispatchers.contains_key(&name) {
            return Err(KernelError::DuplicateComponent(name));
        }
        self.entity_dispatchers.insert(name, dispatcher);
        Ok(())
    }

    pub fn register_facet(
        &mut self,
        name: impl Into<String>,
        facet: Arc<dyn Facet>,
    ) -> Result<(), KernelError> {
        let name = name.into();
        if self.facets.contains_key(&name) {
            return Err(KernelError::DuplicateComponent(name));
        }
        self.facets.insert(name, facet);
        Ok(())
    }

    pub fn game_dispatcher(&self, name: &str) -> Result<Arc<dyn GameDispatcher>, KernelError> {
        self.game_dispatchers
            .get(name)
            .cloned()
            .ok_or_else(|| KernelError::UnknownDispatcher(name.to_string()))
    }

    pub fn screen_dispatcher(&self, name: &str) -> Result<Arc<dyn ScreenDispatcher>, KernelError> {
        self.screen_dispatchers
            .get(name)
            .cloned()
            .ok_or_else(|| KernelError::UnknownDispatcher(name.to_string()))
    }

    pub fn group_dispatcher(&self, name: &str) -> Result<Arc<dyn GroupDispatcher>, KernelError> {
        self.group_dispatchers
            .get(name)
            .cloned()
            .ok_or_else(|| KernelError::UnknownDispatcher(name.to_string()))
    }

    pub fn entity_dispatcher(&self, name: &str) -> Result<Arc<dyn EntityDispatcher>, KernelError> {
        self.entity_dispatchers
            .get(name)
            .cloned()
            .ok_or_else(|| KernelError::UnknownDispatcher(name.to_string()))
    }

    pub fn facet(&self, name: &str) -> Result<Arc<dyn Facet>, KernelError> {
        self.facets
            .get(name)
            .cloned()
            .ok_or_else(|| KernelError::UnknownFacet(name.to_string()))
    }

    /// Resolve an ordered facet name list to instances.
    ///
    /// Fails on the first unknown name rather than silently dropping it;
    /// silent loss would desynchronize persisted names from actual behavior.
    pub fn resolve_facets(&self, names: &[String]) -> Result<Vec<Arc<dyn Facet>>, KernelError> {
        names.iter().map(|name| self.facet(name)).collect()
    }

    /// An entity's full default field schema: dispatcher defaults first,
    /// then each facet's in stack order (later declarations win on merge).
    pub fn entity_field_defaults(
        &self,
        dispatcher_name: &str,
        facet_names: &[String],
    ) -> Result<Vec<FieldDefault>, KernelError> {
        let mut defaults = self.entity_dispatcher(dispatcher_name)?.field_defaults();
        for facet in self.resolve_facets(facet_names)? {
            defaults.extend(facet.field_defaults());
        }
        Ok(defaults)
    }

    pub fn facet_names(&self) -> impl Iterator<Item = &str> {
        self.facets.keys().map(String::as_str)
    }
}

impl fmt::Debug for dyn EntityDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn EntityDispatcher")
    }
}

impl fmt::Debug for dyn Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Facet")
    }
}

impl fmt::Debug for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Components")
            .field("game_dispatchers", &self.game_dispatchers.keys().collect::<Vec<_>>())
            .field("screen_dispatchers", &self.screen_dispatchers.keys().collect::<Vec<_>>())
            .field("group_dispatchers", &self.group_dispatchers.keys().collect::<Vec<_>>())
            .field("entity_dispatchers", &self.entity_dispatchers.keys().collect::<Vec<_>>())
            .field("facets", &self.facets.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xtension::FieldDefault;
    use tableau_common::Value;

    struct BounceFacet;

    impl Facet for BounceFacet {
        fn field_defaults(&self) -> Vec<FieldDefault> {
            vec![FieldDefault::new("Restitution", Value::Float(0.5))]
        }
    }

    struct GlowFacet;

    impl Facet for GlowFacet {
        fn field_defaults(&self) -> Vec<FieldDefault> {
            vec![FieldDefault::new("GlowColor", Value::String("white".into()))]
        }
    }

    fn registry() -> Components {
        let mut components = Components::standard();
        components
            .register_facet("bounce", Arc::new(BounceFacet))
            .unwrap();
        components.register_facet("glow", Arc::new(GlowFacet)).unwrap();
        components
    }

    #[test]
    fn resolve_preserves_order_and_length() {
        let components = registry();
        let names = vec!["bounce".to_string(), "glow".to_string()];
        let facets = components.resolve_facets(&names).unwrap();
        assert_eq!(facets.len(), 2);
        // Order is observable through the contributed defaults.
        assert_eq!(facets[0].field_defaults()[0].name, "Restitution");
        assert_eq!(facets[1].field_defaults()[0].name, "GlowColor");
    }

    #[test]
    fn resolve_fails_naming_the_unknown_facet() {
        let components = registry();
        let names = vec!["bounce".to_string(), "missing".to_string()];
        let err = components.resolve_facets(&names).unwrap_err();
        assert!(matches!(err, KernelError::UnknownFacet(name) if name == "missing"));
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut components = registry();
        let err = components
            .register_facet("bounce", Arc::new(BounceFacet))
            .unwrap_err();
        assert!(matches!(err, KernelError::DuplicateComponent(name) if name == "bounce"));
    }

    #[test]
    fn unknown_dispatcher_lookup_fails() {
        let components = registry();
        let err = components.entity_dispatcher("missing").unwrap_err();
        assert!(matches!(err, KernelError::UnknownDispatcher(name) if name == "missing"));
    }

    #[test]
    fn entity_defaults_merge_dispatcher_then_facets() {
        let components = registry();
        let names = vec!["bounce".to_string(), "glow".to_string()];
        let defaults = components
            .entity_field_defaults(DEFAULT_ENTITY_DISPATCHER, &names)
            .unwrap();
        let field_names: Vec<&str> = defaults.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(field_names, ["Restitution", "GlowColor"]);
    }
}
