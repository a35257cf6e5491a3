//! The simulant hierarchy: game, screens, groups, entities.
//!
//! Four plain records, unified only by the capability of reporting an
//! event-publishing priority. Behavior lives in registry-resolved
//! dispatchers and facets, not here.
//!
//! # Invariants
//! - Every map key equals the `name` of the value it keys ([`Simulants::validate`]).
//! - Exactly one game; screens own groups own entities.
//! - An entity's `facet_names` and resolved `facets` are kept in lockstep;
//!   only names are serialized, instances are re-derived from the registry.

use crate::dispatch::Facet;
use crate::error::KernelError;
use crate::xtension::Xtension;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tableau_common::Address;

/// Publishing priority of the game simulant.
pub const GAME_PRIORITY: f32 = f32::MAX;
/// Publishing priority of screens (below game).
pub const SCREEN_PRIORITY: f32 = f32::MAX / 2.0;
/// Publishing priority of groups (below screens).
pub const GROUP_PRIORITY: f32 = f32::MAX / 4.0;

/// Which transition phase a screen is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionState {
    Incoming,
    Outgoing,
    Idling,
}

/// Visual style of a screen transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    Instant,
    Dissolve,
}

/// Timed incoming/outgoing transition descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Transition duration in ticks.
    pub lifetime: u64,
    pub kind: TransitionKind,
    /// Dissolve visual asset, when `kind` is `Dissolve`.
    pub dissolve_image: Option<String>,
}

impl Default for Transition {
    fn default() -> Self {
        Self {
            lifetime: 0,
            kind: TransitionKind::Instant,
            dissolve_image: None,
        }
    }
}

impl Transition {
    pub fn instant() -> Self {
        Self::default()
    }

    pub fn dissolve(lifetime: u64, image: impl Into<String>) -> Self {
        Self {
            lifetime,
            kind: TransitionKind::Dissolve,
            dissolve_image: Some(image.into()),
        }
    }
}

/// How an entity's position is interpreted by renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewKind {
    /// Positioned in world space, subject to the camera.
    Relative,
    /// Positioned in screen space, ignoring the camera.
    Absolute,
}

/// Singleton root of the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub selected_screen: Option<Address>,
    pub created_at_tick: u64,
    pub dispatcher_name: String,
    pub xtension: Xtension,
}

impl Game {
    pub fn new(dispatcher_name: impl Into<String>, created_at_tick: u64) -> Self {
        Self {
            selected_screen: None,
            created_at_tick,
            dispatcher_name: dispatcher_name.into(),
            xtension: Xtension::new(),
        }
    }
}

/// A screen: one scene of the simulation, with its transition machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screen {
    pub name: String,
    pub transition_state: TransitionState,
    /// Ticks elapsed since entering the current transition state.
    pub transition_ticks: u64,
    pub incoming: Transition,
    pub outgoing: Transition,
    pub persistent: bool,
    pub dispatcher_name: String,
    pub xtension: Xtension,
}

impl Screen {
    pub fn new(name: impl Into<String>, dispatcher_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transition_state: TransitionState::Idling,
            transition_ticks: 0,
            incoming: Transition::default(),
            outgoing: Transition::default(),
            persistent: true,
            dispatcher_name: dispatcher_name.into(),
            xtension: Xtension::new(),
        }
    }

    pub fn with_transitions(mut self, incoming: Transition, outgoing: Transition) -> Self {
        self.incoming = incoming;
        self.outgoing = outgoing;
        self
    }

    pub fn address(&self) -> Address {
        Address::new([self.name.clone()])
    }
}

/// A named logical container of entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub persistent: bool,
    pub dispatcher_name: String,
    pub xtension: Xtension,
}

impl Group {
    pub fn new(name: impl Into<String>, dispatcher_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            persistent: true,
            dispatcher_name: dispatcher_name.into(),
            xtension: Xtension::new(),
        }
    }
}

/// A concrete scene object.
///
/// Behavior is composed at runtime from the named dispatcher plus the ordered
/// facet stack; `facets` holds the registry-resolved instances and is derived
/// state, reconstructible from `facet_names`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub position: Vec2,
    pub depth: f32,
    pub size: Vec2,
    pub rotation: f32,
    pub visible: bool,
    pub view: ViewKind,
    /// Publish an entity-change event on every update.
    pub publish_changes: bool,
    pub persistent: bool,
    pub dispatcher_name: String,
    pub facet_names: Vec<String>,
    #[serde(skip)]
    pub facets: Vec<Arc<dyn Facet>>,
    pub overlay: Option<String>,
    pub xtension: Xtension,
}

impl Entity {
    pub fn new(name: impl Into<String>, dispatcher_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vec2::ZERO,
            depth: 0.0,
            size: Vec2::ONE,
            rotation: 0.0,
            visible: true,
            view: ViewKind::Relative,
            publish_changes: false,
            persistent: true,
            dispatcher_name: dispatcher_name.into(),
            facet_names: Vec::new(),
            facets: Vec::new(),
            overlay: None,
            xtension: Xtension::new(),
        }
    }

    pub fn with_facets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facet_names = names.into_iter().map(Into::into).collect();
        self
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("depth", &self.depth)
            .field("size", &self.size)
            .field("rotation", &self.rotation)
            .field("visible", &self.visible)
            .field("view", &self.view)
            .field("dispatcher_name", &self.dispatcher_name)
            .field("facet_names", &self.facet_names)
            .field("overlay", &self.overlay)
            .field("xtension", &self.xtension)
            .finish_non_exhaustive()
    }
}

/// Borrowed view over any of the four simulant kinds.
#[derive(Debug, Clone, Copy)]
pub enum SimulantRef<'a> {
    Game(&'a Game),
    Screen(&'a Screen),
    Group(&'a Group),
    Entity(&'a Entity),
}

impl SimulantRef<'_> {
    /// Priority used to order subscriber folds. Game > screen > group;
    /// entity priority is computed by the caller-supplied function over
    /// its depth field.
    pub fn publishing_priority(&self, entity_priority: &dyn Fn(&Entity) -> f32) -> f32 {
        match self {
            SimulantRef::Game(_) => GAME_PRIORITY,
            SimulantRef::Screen(_) => SCREEN_PRIORITY,
            SimulantRef::Group(_) => GROUP_PRIORITY,
            SimulantRef::Entity(entity) => entity_priority(entity),
        }
    }

    pub fn xtension(&self) -> &Xtension {
        match self {
            SimulantRef::Game(game) => &game.xtension,
            SimulantRef::Screen(screen) => &screen.xtension,
            SimulantRef::Group(group) => &group.xtension,
            SimulantRef::Entity(entity) => &entity.xtension,
        }
    }
}

/// A screen with its owned groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenNode {
    pub screen: Screen,
    pub groups: BTreeMap<String, GroupNode>,
}

/// A group with its owned entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupNode {
    pub group: Group,
    pub entities: BTreeMap<String, Entity>,
}

/// The whole hierarchy: one game, screens keyed by name, and so on down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulants {
    pub game: Game,
    screens: BTreeMap<String, ScreenNode>,
}

impl Simulants {
    pub fn new(game: Game) -> Self {
        Self {
            game,
            screens: BTreeMap::new(),
        }
    }

    pub fn screen(&self, name: &str) -> Option<&Screen> {
        self.screens.get(name).map(|node| &node.screen)
    }

    pub fn screen_mut(&mut self, name: &str) -> Option<&mut Screen> {
        self.screens.get_mut(name).map(|node| &mut node.screen)
    }

    pub fn group(&self, screen: &str, group: &str) -> Option<&Group> {
        self.screens
            .get(screen)?
            .groups
            .get(group)
            .map(|node| &node.group)
    }

    pub fn group_mut(&mut self, screen: &str, group: &str) -> Option<&mut Group> {
        self.screens
            .get_mut(screen)?
            .groups
            .get_mut(group)
            .map(|node| &mut node.group)
    }

    /// Entity lookup by a 3-segment address.
    pub fn entity(&self, address: &Address) -> Option<&Entity> {
        let [screen, group, entity] = address.segments() else {
            return None;
        };
        self.screens
            .get(screen)?
            .groups
            .get(group)?
            .entities
            .get(entity)
    }

    pub fn entity_mut(&mut self, address: &Address) -> Option<&mut Entity> {
        let [screen, group, entity] = address.segments() else {
            return None;
        };
        self.screens
            .get_mut(screen)?
            .groups
            .get_mut(group)?
            .entities
            .get_mut(entity)
    }

    /// Resolve any address to a borrowed simulant view.
    pub fn get(&self, address: &Address) -> Option<SimulantRef<'_>> {
        match address.segments() {
            [] => Some(SimulantRef::Game(&self.game)),
            [screen] => self.screen(screen).map(SimulantRef::Screen),
            [screen, group] => self.group(screen, group).map(SimulantRef::Group),
            [_, _, _] => self.entity(address).map(SimulantRef::Entity),
            _ => None,
        }
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.get(address).is_some()
    }

    pub fn insert_screen(&mut self, screen: Screen) -> Result<(), KernelError> {
        if self.screens.contains_key(&screen.name) {
            return Err(KernelError::AlreadyExists(screen.address()));
        }
        self.screens.insert(
            screen.name.clone(),
            ScreenNode {
                screen,
                groups: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub fn remove_screen(&mut self, name: &str) -> Option<ScreenNode> {
        self.screens.remove(name)
    }

    pub fn insert_group(&mut self, screen: &str, group: Group) -> Result<(), KernelError> {
        let node = self
            .screens
            .get_mut(screen)
            .ok_or_else(|| KernelError::AddressResolution(Address::new([screen])))?;
        if node.groups.contains_key(&group.name) {
            return Err(KernelError::AlreadyExists(Address::new([
                screen.to_string(),
                group.name.clone(),
            ])));
        }
        node.groups.insert(
            group.name.clone(),
            GroupNode {
                group,
                entities: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub fn remove_group(&mut self, screen: &str, name: &str) -> Option<GroupNode> {
        self.screens.get_mut(screen)?.groups.remove(name)
    }

    pub fn insert_entity(
        &mut self,
        screen: &str,
        group: &str,
        entity: Entity,
    ) -> Result<(), KernelError> {
        let group_node = self
            .screens
            .get_mut(screen)
            .and_then(|node| node.groups.get_mut(group))
            .ok_or_else(|| {
                KernelError::AddressResolution(Address::new([screen.to_string(), group.to_string()]))
            })?;
        if group_node.entities.contains_key(&entity.name) {
            return Err(KernelError::AlreadyExists(Address::new([
                screen.to_string(),
                group.to_string(),
                entity.name.clone(),
            ])));
        }
        group_node.entities.insert(entity.name.clone(), entity);
        Ok(())
    }

    pub fn remove_entity(&mut self, screen: &str, group: &str, name: &str) -> Option<Entity> {
        self.screens
            .get_mut(screen)?
            .groups
            .get_mut(group)?
            .entities
            .remove(name)
    }

    pub fn screens(&self) -> impl Iterator<Item = &Screen> {
        self.screens.values().map(|node| &node.screen)
    }

    pub fn groups_of(&self, screen: &str) -> impl Iterator<Item = &Group> {
        self.screens
            .get(screen)
            .into_iter()
            .flat_map(|node| node.groups.values().map(|g| &g.group))
    }

    pub fn entities_of(&self, screen: &str, group: &str) -> impl Iterator<Item = &Entity> {
        self.screens
            .get(screen)
            .and_then(|node| node.groups.get(group))
            .into_iter()
            .flat_map(|node| node.entities.values())
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    pub fn group_count(&self) -> usize {
        self.screens.values().map(|node| node.groups.len()).sum()
    }

    pub fn entity_count(&self) -> usize {
        self.screens
            .values()
            .flat_map(|node| node.groups.values())
            .map(|group| group.entities.len())
            .sum()
    }

    /// Check that every map key equals the `name` of the value it keys,
    /// recursively at every level.
    pub fn validate(&self) -> Result<(), KernelError> {
        for (screen_key, screen_node) in &self.screens {
            if *screen_key != screen_node.screen.name {
                return Err(KernelError::HierarchyMismatch {
                    key: screen_key.clone(),
                    name: screen_node.screen.name.clone(),
                });
            }
            for (group_key, group_node) in &screen_node.groups {
                if *group_key != group_node.group.name {
                    return Err(KernelError::HierarchyMismatch {
                        key: group_key.clone(),
                        name: group_node.group.name.clone(),
                    });
                }
                for (entity_key, entity) in &group_node.entities {
                    if *entity_key != entity.name {
                        return Err(KernelError::HierarchyMismatch {
                            key: entity_key.clone(),
                            name: entity.name.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
