//! The world: the single aggregate of all simulation state.
//!
//! Every operation is an explicit method on `World`; the world is owned by
//! the simulation loop and threaded through hooks, subscriber callbacks, and
//! tasks by exclusive reference. `World` is `Clone`, so a caller that needs
//! the pre-operation value keeps a snapshot — behavior callables are stored
//! behind `Arc` and snapshots share them.
//!
//! # Invariants
//! - Tick time is monotonically non-decreasing and is the only clock the
//!   core observes.
//! - All state mutations flow through explicit operations.
//! - Subscriber and task order is deterministic (see `event` and `task`).

use crate::dispatch::Components;
use crate::error::KernelError;
use crate::event::{
    self, Event, EventData, Handling, Outcome, SubscriptionEntry, SubscriptionKey, Subscriptions,
    channels,
};
use crate::message::{AudioMessage, MessageQueues, PhysicsMessage, RenderDescriptor, RenderMessage};
use crate::plugin::Plugin;
use crate::simulant::{
    Entity, Game, Group, Screen, Simulants, TransitionState,
};
use crate::task::{Task, Tasks};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tableau_assets::{AssetMetadataMap, OverlayRouter};
use tableau_common::{Address, Camera, Value};

/// How much of the simulation is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interactivity {
    /// GUI only: no physics hooks run.
    Gui,
    GuiAndPhysics,
    GuiAndPhysicsAndGameplay,
}

impl Interactivity {
    pub fn physics_enabled(&self) -> bool {
        !matches!(self, Interactivity::Gui)
    }

    pub fn gameplay_enabled(&self) -> bool {
        matches!(self, Interactivity::GuiAndPhysicsAndGameplay)
    }
}

impl Default for Interactivity {
    fn default() -> Self {
        Interactivity::GuiAndPhysicsAndGameplay
    }
}

/// Opaque handle to an external subsystem. The core never calls through it;
/// it only gates whether messages for that subsystem are enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsystemHandle {
    pub name: String,
    pub enabled: bool,
}

impl SubsystemHandle {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
        }
    }
}

/// The external services the core enqueues messages for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsystems {
    pub audio: SubsystemHandle,
    pub render: SubsystemHandle,
    pub physics: SubsystemHandle,
    pub overlay: SubsystemHandle,
}

impl Default for Subsystems {
    fn default() -> Self {
        Self {
            audio: SubsystemHandle::new("audio"),
            render: SubsystemHandle::new("render"),
            physics: SubsystemHandle::new("physics"),
            overlay: SubsystemHandle::new("overlay"),
        }
    }
}

/// Pending deferred work: tasks, subscriptions, and opaque per-key callback
/// state blobs.
#[derive(Debug, Clone, Default)]
pub struct Callbacks {
    pub tasks: Tasks,
    pub subscriptions: Subscriptions,
    states: BTreeMap<SubscriptionKey, Value>,
}

/// Global simulation state.
#[derive(Debug, Clone)]
pub struct WorldState {
    pub tick_time: u64,
    pub running: bool,
    pub interactivity: Interactivity,
    /// Where the current outgoing transition hands off to.
    pub transition_destination: Option<Address>,
    pub camera: Camera,
    pub asset_metadata: AssetMetadataMap,
    pub overlay_router: OverlayRouter,
    pub user_state: Option<Value>,
}

/// Initial configuration for `World::make`.
#[derive(Debug, Clone, Default)]
pub struct WorldConfig {
    pub interactivity: Interactivity,
    pub camera: Camera,
    pub asset_metadata: AssetMetadataMap,
    pub user_state: Option<Value>,
}

/// The single aggregate value of all simulation state.
#[derive(Debug, Clone)]
pub struct World {
    simulants: Simulants,
    components: Components,
    pub subsystems: Subsystems,
    queues: MessageQueues,
    callbacks: Callbacks,
    state: WorldState,
}

impl World {
    /// Create the world from initial configuration and plugin-registered
    /// dispatchers/facets. Unknown or duplicate component names abort
    /// startup.
    pub fn make(plugin: &dyn Plugin, config: WorldConfig) -> Result<Self, KernelError> {
        let mut components = Components::standard();
        for (name, dispatcher) in plugin.screen_dispatchers() {
            components.register_screen_dispatcher(name, dispatcher)?;
        }
        for (name, dispatcher) in plugin.group_dispatchers() {
            components.register_group_dispatcher(name, dispatcher)?;
        }
        for (name, dispatcher) in plugin.entity_dispatchers() {
            components.register_entity_dispatcher(name, dispatcher)?;
        }
        for (name, facet) in plugin.facets() {
            components.register_facet(name, facet)?;
        }

        let (game_dispatcher_name, game_dispatcher) = match plugin.game_dispatcher() {
            Some((name, dispatcher)) => {
                components.register_game_dispatcher(name.clone(), dispatcher.clone())?;
                (name, dispatcher)
            }
            None => {
                let name = crate::dispatch::DEFAULT_GAME_DISPATCHER.to_string();
                let dispatcher = components.game_dispatcher(&name)?;
                (name, dispatcher)
            }
        };

        let overlay_router = OverlayRouter::from_routes(plugin.overlay_routes())?;

        let mut game = Game::new(game_dispatcher_name, 0);
        game.xtension.merge_defaults(game_dispatcher.field_defaults());

        let mut world = Self {
            simulants: Simulants::new(game),
            components,
            subsystems: Subsystems::default(),
            queues: MessageQueues::new(),
            callbacks: Callbacks::default(),
            state: WorldState {
                tick_time: 0,
                running: true,
                interactivity: config.interactivity,
                transition_destination: None,
                camera: config.camera,
                asset_metadata: config.asset_metadata,
                overlay_router,
                user_state: config.user_state,
            },
        };
        game_dispatcher.register(&mut world)?;
        tracing::info!("world constructed");
        Ok(world)
    }

    // --- Accessors ---

    pub fn tick_time(&self) -> u64 {
        self.state.tick_time
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.state.running = running;
    }

    pub fn interactivity(&self) -> Interactivity {
        self.state.interactivity
    }

    pub fn camera(&self) -> &Camera {
        &self.state.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.state.camera
    }

    pub fn asset_metadata(&self) -> &AssetMetadataMap {
        &self.state.asset_metadata
    }

    pub fn overlay_router(&self) -> &OverlayRouter {
        &self.state.overlay_router
    }

    pub fn user_state(&self) -> Option<&Value> {
        self.state.user_state.as_ref()
    }

    pub fn set_user_state(&mut self, state: Option<Value>) {
        self.state.user_state = state;
    }

    pub fn transition_destination(&self) -> Option<&Address> {
        self.state.transition_destination.as_ref()
    }

    pub fn simulants(&self) -> &Simulants {
        &self.simulants
    }

    pub fn components(&self) -> &Components {
        &self.components
    }

    pub fn subscription_count(&self) -> usize {
        self.callbacks.subscriptions.len()
    }

    pub fn task_count(&self) -> usize {
        self.callbacks.tasks.len()
    }

    /// Check the key/name invariant at every hierarchy level.
    pub fn validate(&self) -> Result<(), KernelError> {
        self.simulants.validate()
    }

    /// Publishing priority of the simulant at `subscriber`, or `None` if it
    /// no longer exists. Entity priority is its depth.
    pub fn publishing_priority(&self, subscriber: &Address) -> Option<f32> {
        self.simulants
            .get(subscriber)
            .map(|simulant| simulant.publishing_priority(&|entity: &Entity| entity.depth))
    }

    // --- Event engine ---

    /// Subscribe `subscriber` to events at `event_address` (which may
    /// contain `*` wildcard segments). Returns the key used to unsubscribe.
    pub fn subscribe<F>(
        &mut self,
        event_address: Address,
        subscriber: Address,
        callback: F,
    ) -> SubscriptionKey
    where
        F: Fn(&Event, &mut World) -> Result<Handling, KernelError> + Send + Sync + 'static,
    {
        self.callbacks
            .subscriptions
            .subscribe(event_address, subscriber, Arc::new(callback))
    }

    /// Unsubscribe by key; unknown keys are a no-op. Any callback state
    /// recorded for the key is dropped with it.
    pub fn unsubscribe(&mut self, key: SubscriptionKey) {
        if self.callbacks.subscriptions.unsubscribe(key) {
            self.callbacks.states.remove(&key);
        }
    }

    /// Publish with the default sorter (publishing priority, highest first).
    pub fn publish(
        &mut self,
        event_address: &Address,
        publisher: &Address,
        data: EventData,
    ) -> Result<Outcome, KernelError> {
        self.publish_with(event_address, publisher, data, event::by_publishing_priority)
    }

    /// Publish in raw subscription insertion order.
    pub fn publish_unsorted(
        &mut self,
        event_address: &Address,
        publisher: &Address,
        data: EventData,
    ) -> Result<Outcome, KernelError> {
        self.publish_with(event_address, publisher, data, event::insertion_order)
    }

    /// Publish with an injectable sorter.
    ///
    /// Collects every matching entry, sorts, then folds left-to-right:
    /// subscribers removed mid-publish are skipped without error; a
    /// `Resolve` stops the fold; a callback error propagates unswallowed.
    /// The entry list is snapshotted up front, so handlers may subscribe
    /// and unsubscribe freely during dispatch.
    pub fn publish_with<S>(
        &mut self,
        event_address: &Address,
        publisher: &Address,
        data: EventData,
        sorter: S,
    ) -> Result<Outcome, KernelError>
    where
        S: FnOnce(Vec<SubscriptionEntry>, &World) -> Vec<SubscriptionEntry>,
    {
        let entries = self.callbacks.subscriptions.matching(event_address);
        if entries.is_empty() {
            return Ok(Outcome::Exhausted);
        }
        let _span = tracing::info_span!("publish", event = %event_address).entered();
        let sorted = sorter(entries, &*self);
        for entry in sorted {
            if !self.simulants.contains(&entry.subscriber) {
                // Removed by an earlier handler in this same publish.
                continue;
            }
            let event = Event {
                event_address: event_address.clone(),
                subscriber_address: entry.subscriber.clone(),
                publisher_address: publisher.clone(),
                data: data.clone(),
            };
            match (entry.callback)(&event, self)? {
                Handling::Resolve => return Ok(Outcome::Resolved),
                Handling::Cascade => {}
            }
        }
        Ok(Outcome::Exhausted)
    }

    /// Opaque per-subscription state blob, kept until unsubscribe.
    pub fn set_callback_state(&mut self, key: SubscriptionKey, state: Value) {
        self.callbacks.states.insert(key, state);
    }

    pub fn callback_state(&self, key: &SubscriptionKey) -> Option<&Value> {
        self.callbacks.states.get(key)
    }

    // --- Task scheduler ---

    /// Schedule an operation to run at `tick` (or the next drain after it).
    /// Tasks have no identity and cannot be cancelled once scheduled.
    pub fn schedule_task_at<F>(&mut self, tick: u64, operation: F)
    where
        F: Fn(&mut World) -> Result<(), KernelError> + Send + Sync + 'static,
    {
        self.callbacks.tasks.schedule(Task {
            scheduled_tick: tick,
            operation: Arc::new(operation),
        });
    }

    /// Schedule an operation `delta` ticks from now.
    pub fn schedule_task_in<F>(&mut self, delta: u64, operation: F)
    where
        F: Fn(&mut World) -> Result<(), KernelError> + Send + Sync + 'static,
    {
        self.schedule_task_at(self.state.tick_time + delta, operation);
    }

    /// Run every task due at the current tick, earliest scheduled first.
    /// A failing operation aborts the drain; effects of earlier tasks
    /// remain (no rollback).
    pub fn drain_tasks(&mut self) -> Result<(), KernelError> {
        let due = self.callbacks.tasks.take_due(self.state.tick_time);
        for task in due {
            (task.operation)(self).map_err(|source| KernelError::TaskFailed {
                scheduled: task.scheduled_tick,
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    // --- Message queues ---

    pub fn enqueue_audio(&mut self, message: AudioMessage) {
        if self.subsystems.audio.enabled {
            self.queues.enqueue_audio(message);
        }
    }

    pub fn enqueue_render(&mut self, message: RenderMessage) {
        if self.subsystems.render.enabled {
            self.queues.enqueue_render(message);
        }
    }

    pub fn enqueue_physics(&mut self, message: PhysicsMessage) {
        if self.subsystems.physics.enabled {
            self.queues.enqueue_physics(message);
        }
    }

    pub fn drain_audio_messages(&mut self) -> Vec<AudioMessage> {
        self.queues.drain_audio()
    }

    pub fn drain_render_messages(&mut self) -> Vec<RenderMessage> {
        self.queues.drain_render()
    }

    pub fn drain_physics_messages(&mut self) -> Vec<PhysicsMessage> {
        self.queues.drain_physics()
    }

    pub fn queues(&self) -> &MessageQueues {
        &self.queues
    }

    // --- Simulant lifecycle ---

    /// Add a screen and run its dispatcher's register hook.
    pub fn add_screen(&mut self, mut screen: Screen) -> Result<Address, KernelError> {
        let dispatcher = self.components.screen_dispatcher(&screen.dispatcher_name)?;
        screen.xtension.merge_defaults(dispatcher.field_defaults());
        let address = screen.address();
        self.simulants.insert_screen(screen)?;
        dispatcher.register(&address, self)?;
        tracing::debug!(screen = %address, "screen registered");
        Ok(address)
    }

    /// Add a group under `screen_address` and run its register hook.
    pub fn add_group(
        &mut self,
        screen_address: &Address,
        mut group: Group,
    ) -> Result<Address, KernelError> {
        let [screen_name] = screen_address.segments() else {
            return Err(KernelError::AddressResolution(screen_address.clone()));
        };
        let dispatcher = self.components.group_dispatcher(&group.dispatcher_name)?;
        group.xtension.merge_defaults(dispatcher.field_defaults());
        let address = screen_address.child(group.name.clone());
        let screen_name = screen_name.clone();
        self.simulants.insert_group(&screen_name, group)?;
        dispatcher.register(&address, self)?;
        tracing::debug!(group = %address, "group registered");
        Ok(address)
    }

    /// Add an entity under `group_address`.
    ///
    /// Resolves the dispatcher and the full facet stack first — an unknown
    /// facet name fails before any entity is created — then merges the
    /// declared field defaults, routes an overlay if none was set, inserts,
    /// and runs register hooks: dispatcher first, then facets in list
    /// order, then the physics hooks when physics is live.
    pub fn add_entity(
        &mut self,
        group_address: &Address,
        mut entity: Entity,
    ) -> Result<Address, KernelError> {
        let [screen_name, group_name] = group_address.segments() else {
            return Err(KernelError::AddressResolution(group_address.clone()));
        };
        let dispatcher = self.components.entity_dispatcher(&entity.dispatcher_name)?;
        let facets = self.components.resolve_facets(&entity.facet_names)?;

        entity.xtension.merge_defaults(dispatcher.field_defaults());
        for facet in &facets {
            entity.xtension.merge_defaults(facet.field_defaults());
        }
        if entity.overlay.is_none() {
            entity.overlay = self
                .state
                .overlay_router
                .route(&entity.dispatcher_name)
                .map(str::to_string);
        }
        entity.facets = facets.clone();

        let address = group_address.child(entity.name.clone());
        let (screen_name, group_name) = (screen_name.clone(), group_name.clone());
        self.simulants.insert_entity(&screen_name, &group_name, entity)?;

        dispatcher.register(&address, self)?;
        for facet in &facets {
            facet.register(&address, self)?;
        }
        if self.state.interactivity.physics_enabled() {
            dispatcher.register_physics(&address, self)?;
            for facet in &facets {
                facet.register_physics(&address, self)?;
            }
        }
        tracing::debug!(entity = %address, "entity registered");
        Ok(address)
    }

    /// Remove an entity, running unregister hooks first (dispatcher, then
    /// facets in list order; physics hooks when physics is live).
    pub fn remove_entity(&mut self, address: &Address) -> Result<(), KernelError> {
        let (dispatcher_name, facets) = {
            let entity = self
                .simulants
                .entity(address)
                .ok_or_else(|| KernelError::AddressResolution(address.clone()))?;
            (entity.dispatcher_name.clone(), entity.facets.clone())
        };
        let dispatcher = self.components.entity_dispatcher(&dispatcher_name)?;

        if self.state.interactivity.physics_enabled() {
            dispatcher.unregister_physics(address, self)?;
            for facet in &facets {
                facet.unregister_physics(address, self)?;
            }
        }
        dispatcher.unregister(address, self)?;
        for facet in &facets {
            facet.unregister(address, self)?;
        }

        if let [screen, group, entity] = address.segments() {
            let (screen, group, entity) = (screen.clone(), group.clone(), entity.clone());
            self.simulants.remove_entity(&screen, &group, &entity);
        }
        tracing::debug!(entity = %address, "entity unregistered");
        Ok(())
    }

    /// Remove a group, unregistering its entities first.
    pub fn remove_group(&mut self, address: &Address) -> Result<(), KernelError> {
        let [screen_name, group_name] = address.segments() else {
            return Err(KernelError::AddressResolution(address.clone()));
        };
        let (screen_name, group_name) = (screen_name.clone(), group_name.clone());
        let group = self
            .simulants
            .group(&screen_name, &group_name)
            .ok_or_else(|| KernelError::AddressResolution(address.clone()))?;
        let dispatcher = self.components.group_dispatcher(&group.dispatcher_name)?;

        let entity_addresses: Vec<Address> = self
            .simulants
            .entities_of(&screen_name, &group_name)
            .map(|entity| address.child(entity.name.clone()))
            .collect();
        for entity_address in entity_addresses {
            self.remove_entity(&entity_address)?;
        }

        dispatcher.unregister(address, self)?;
        self.simulants.remove_group(&screen_name, &group_name);
        tracing::debug!(group = %address, "group unregistered");
        Ok(())
    }

    /// Remove a screen, unregistering its groups (and their entities) first.
    pub fn remove_screen(&mut self, address: &Address) -> Result<(), KernelError> {
        let [screen_name] = address.segments() else {
            return Err(KernelError::AddressResolution(address.clone()));
        };
        let screen_name = screen_name.clone();
        let screen = self
            .simulants
            .screen(&screen_name)
            .ok_or_else(|| KernelError::AddressResolution(address.clone()))?;
        let dispatcher = self.components.screen_dispatcher(&screen.dispatcher_name)?;

        let group_addresses: Vec<Address> = self
            .simulants
            .groups_of(&screen_name)
            .map(|group| address.child(group.name.clone()))
            .collect();
        for group_address in group_addresses {
            self.remove_group(&group_address)?;
        }

        dispatcher.unregister(address, self)?;
        if self.simulants.game.selected_screen.as_ref() == Some(address) {
            self.simulants.game.selected_screen = None;
        }
        self.simulants.remove_screen(&screen_name);
        tracing::debug!(screen = %address, "screen unregistered");
        Ok(())
    }

    // --- Simulant access ---

    pub fn entity(&self, address: &Address) -> Result<&Entity, KernelError> {
        self.simulants
            .entity(address)
            .ok_or_else(|| KernelError::AddressResolution(address.clone()))
    }

    pub fn screen(&self, address: &Address) -> Result<&Screen, KernelError> {
        let [name] = address.segments() else {
            return Err(KernelError::AddressResolution(address.clone()));
        };
        self.simulants
            .screen(name)
            .ok_or_else(|| KernelError::AddressResolution(address.clone()))
    }

    pub fn group(&self, address: &Address) -> Result<&Group, KernelError> {
        let [screen, group] = address.segments() else {
            return Err(KernelError::AddressResolution(address.clone()));
        };
        self.simulants
            .group(screen, group)
            .ok_or_else(|| KernelError::AddressResolution(address.clone()))
    }

    pub fn game(&self) -> &Game {
        &self.simulants.game
    }

    /// Apply `update` to the entity at `address`; publishes on the entity's
    /// change channel when its `publish_changes` flag is set.
    pub fn update_entity<F>(&mut self, address: &Address, update: F) -> Result<(), KernelError>
    where
        F: FnOnce(&mut Entity),
    {
        let publish_changes = {
            let entity = self
                .simulants
                .entity_mut(address)
                .ok_or_else(|| KernelError::AddressResolution(address.clone()))?;
            update(entity);
            entity.publish_changes
        };
        if publish_changes {
            self.publish(
                &channels::change(address),
                address,
                EventData::EntityChange {
                    entity: address.clone(),
                },
            )?;
        }
        Ok(())
    }

    pub fn update_screen<F>(&mut self, address: &Address, update: F) -> Result<(), KernelError>
    where
        F: FnOnce(&mut Screen),
    {
        let [name] = address.segments() else {
            return Err(KernelError::AddressResolution(address.clone()));
        };
        let screen = self
            .simulants
            .screen_mut(name)
            .ok_or_else(|| KernelError::AddressResolution(address.clone()))?;
        update(screen);
        Ok(())
    }

    pub fn update_group<F>(&mut self, address: &Address, update: F) -> Result<(), KernelError>
    where
        F: FnOnce(&mut Group),
    {
        let [screen, group] = address.segments() else {
            return Err(KernelError::AddressResolution(address.clone()));
        };
        let group_ref = self
            .simulants
            .group_mut(screen, group)
            .ok_or_else(|| KernelError::AddressResolution(address.clone()))?;
        update(group_ref);
        Ok(())
    }

    pub fn update_game<F>(&mut self, update: F)
    where
        F: FnOnce(&mut Game),
    {
        update(&mut self.simulants.game);
    }

    /// Replace an entity's facet name list, re-resolving instances against
    /// the registry; names and instances stay in lockstep.
    pub fn set_entity_facet_names(
        &mut self,
        address: &Address,
        facet_names: Vec<String>,
    ) -> Result<(), KernelError> {
        let facets = self.components.resolve_facets(&facet_names)?;
        let entity = self
            .simulants
            .entity_mut(address)
            .ok_or_else(|| KernelError::AddressResolution(address.clone()))?;
        for facet in &facets {
            entity.xtension.merge_defaults(facet.field_defaults());
        }
        entity.facet_names = facet_names;
        entity.facets = facets;
        Ok(())
    }

    // --- Dispatcher/facet aggregation ---

    /// Run the physics-sync hooks: dispatcher first, then facets in list
    /// order, each seeing the previous hook's world (last applied wins).
    pub fn propagate_entity_physics(&mut self, address: &Address) -> Result<(), KernelError> {
        let (dispatcher_name, facets) = {
            let entity = self.entity(address)?;
            (entity.dispatcher_name.clone(), entity.facets.clone())
        };
        let dispatcher = self.components.entity_dispatcher(&dispatcher_name)?;
        dispatcher.propagate_physics(address, self)?;
        for facet in &facets {
            facet.propagate_physics(address, self)?;
        }
        Ok(())
    }

    /// Render descriptors for one entity: dispatcher's, then each facet's,
    /// concatenated in stack order.
    pub fn entity_render_descriptors(
        &self,
        address: &Address,
    ) -> Result<Vec<RenderDescriptor>, KernelError> {
        let entity = self.entity(address)?;
        let dispatcher = self.components.entity_dispatcher(&entity.dispatcher_name)?;
        let mut descriptors = dispatcher.render_descriptors(entity, self);
        for facet in &entity.facets {
            descriptors.extend(facet.render_descriptors(entity, self));
        }
        Ok(descriptors)
    }

    /// Quick size of one entity: component-wise max over the dispatcher and
    /// every facet.
    pub fn entity_quick_size(&self, address: &Address) -> Result<Vec2, KernelError> {
        let entity = self.entity(address)?;
        let dispatcher = self.components.entity_dispatcher(&entity.dispatcher_name)?;
        let mut size = dispatcher.quick_size(entity, self);
        for facet in &entity.facets {
            size = size.max(facet.quick_size(entity, self));
        }
        Ok(size)
    }

    // --- Screen selection and transitions ---

    /// Start transitioning to `target`.
    ///
    /// With a screen already selected, that screen enters `Outgoing` and the
    /// destination is recorded for handoff when it completes. With no
    /// selection, `target` is selected immediately and enters `Incoming`.
    pub fn select_screen(&mut self, target: &Address) -> Result<(), KernelError> {
        let [target_name] = target.segments() else {
            return Err(KernelError::AddressResolution(target.clone()));
        };
        let target_name = target_name.clone();
        if self.simulants.screen(&target_name).is_none() {
            return Err(KernelError::AddressResolution(target.clone()));
        }
        match self.simulants.game.selected_screen.clone() {
            Some(current) if current != *target => {
                if let Some(name) = current.name() {
                    let name = name.to_string();
                    if let Some(screen) = self.simulants.screen_mut(&name) {
                        screen.transition_state = TransitionState::Outgoing;
                        screen.transition_ticks = 0;
                    }
                }
                self.state.transition_destination = Some(target.clone());
            }
            Some(_) => {}
            None => {
                self.simulants.game.selected_screen = Some(target.clone());
                if let Some(screen) = self.simulants.screen_mut(&target_name) {
                    screen.transition_state = TransitionState::Incoming;
                    screen.transition_ticks = 0;
                }
                self.state.transition_destination = None;
            }
        }
        Ok(())
    }

    /// Advance the selected screen's transition machine by one tick.
    ///
    /// Incoming completing publishes once on its `incoming-finish` channel
    /// and idles the screen. Outgoing completing publishes on
    /// `outgoing-finish`, then selection moves to the recorded destination,
    /// which enters `Incoming`.
    pub fn advance_transitions(&mut self) -> Result<(), KernelError> {
        let Some(selected) = self.simulants.game.selected_screen.clone() else {
            return Ok(());
        };
        let Some(name) = selected.name().map(str::to_string) else {
            return Ok(());
        };
        let Some(screen) = self.simulants.screen(&name) else {
            return Ok(());
        };
        let (state, ticks, incoming_lifetime, outgoing_lifetime) = (
            screen.transition_state,
            screen.transition_ticks,
            screen.incoming.lifetime,
            screen.outgoing.lifetime,
        );

        match state {
            TransitionState::Idling => Ok(()),
            TransitionState::Incoming => {
                let ticks = ticks + 1;
                if let Some(screen) = self.simulants.screen_mut(&name) {
                    screen.transition_ticks = ticks;
                }
                if ticks >= incoming_lifetime {
                    if let Some(screen) = self.simulants.screen_mut(&name) {
                        screen.transition_state = TransitionState::Idling;
                        screen.transition_ticks = 0;
                    }
                    self.publish(
                        &channels::incoming_finish(&name),
                        &selected,
                        EventData::ScreenTransitionFinished {
                            screen: name.clone(),
                        },
                    )?;
                }
                Ok(())
            }
            TransitionState::Outgoing => {
                let ticks = ticks + 1;
                if let Some(screen) = self.simulants.screen_mut(&name) {
                    screen.transition_ticks = ticks;
                }
                if ticks >= outgoing_lifetime {
                    if let Some(screen) = self.simulants.screen_mut(&name) {
                        screen.transition_state = TransitionState::Idling;
                        screen.transition_ticks = 0;
                    }
                    self.publish(
                        &channels::outgoing_finish(&name),
                        &selected,
                        EventData::ScreenTransitionFinished {
                            screen: name.clone(),
                        },
                    )?;
                    match self.state.transition_destination.take() {
                        Some(destination) => {
                            self.simulants.game.selected_screen = Some(destination.clone());
                            if let Some(dest_name) = destination.name() {
                                let dest_name = dest_name.to_string();
                                if let Some(screen) = self.simulants.screen_mut(&dest_name) {
                                    screen.transition_state = TransitionState::Incoming;
                                    screen.transition_ticks = 0;
                                }
                            }
                        }
                        None => {
                            self.simulants.game.selected_screen = None;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    /// One simulation step: advance the clock, drain due tasks, publish the
    /// tick event, advance screen transitions. A stopped world is inert.
    pub fn tick(&mut self) -> Result<(), KernelError> {
        if !self.state.running {
            return Ok(());
        }
        self.state.tick_time += 1;
        let _span = tracing::info_span!("tick", tick = self.state.tick_time).entered();
        self.drain_tasks()?;
        self.publish(&channels::tick(), &Address::root(), EventData::Tick)?;
        self.advance_transitions()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{
        DEFAULT_ENTITY_DISPATCHER, DEFAULT_GROUP_DISPATCHER, DEFAULT_SCREEN_DISPATCHER, Facet,
    };
    use crate::plugin::NoPlugin;
    use crate::simulant::Transition;
    use crate::xtension::FieldDefault;
    use std::sync::Mutex;
    use tableau_assets::OverlayRoute;

    type Log = Arc<Mutex<Vec<String>>>;

    fn log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn logged(entries: &Log) -> Vec<String> {
        entries.lock().unwrap().clone()
    }

    struct BounceFacet {
        hooks: Log,
    }

    impl Facet for BounceFacet {
        fn register(&self, entity: &Address, _world: &mut World) -> Result<(), KernelError> {
            self.hooks.lock().unwrap().push(format!("bounce:register:{entity}"));
            Ok(())
        }

        fn unregister(&self, entity: &Address, _world: &mut World) -> Result<(), KernelError> {
            self.hooks.lock().unwrap().push(format!("bounce:unregister:{entity}"));
            Ok(())
        }

        fn propagate_physics(
            &self,
            entity: &Address,
            world: &mut World,
        ) -> Result<(), KernelError> {
            world.update_entity(entity, |e| e.position = Vec2::new(2.0, 0.0))
        }

        fn render_descriptors(
            &self,
            entity: &Entity,
            _world: &World,
        ) -> Vec<RenderDescriptor> {
            vec![RenderDescriptor {
                position: entity.position,
                size: entity.size,
                rotation: entity.rotation,
                depth: entity.depth,
                view: entity.view,
                asset: "bounce-overlay".into(),
                color: [1.0; 4],
            }]
        }

        fn quick_size(&self, _entity: &Entity, _world: &World) -> Vec2 {
            Vec2::new(4.0, 1.0)
        }

        fn field_defaults(&self) -> Vec<FieldDefault> {
            vec![FieldDefault::new("Restitution", Value::Float(0.5))]
        }
    }

    struct SlideFacet;

    impl Facet for SlideFacet {
        fn propagate_physics(
            &self,
            entity: &Address,
            world: &mut World,
        ) -> Result<(), KernelError> {
            world.update_entity(entity, |e| e.position = Vec2::new(7.0, 0.0))
        }

        fn quick_size(&self, _entity: &Entity, _world: &World) -> Vec2 {
            Vec2::new(1.0, 6.0)
        }
    }

    struct TestPlugin {
        hooks: Log,
    }

    impl Plugin for TestPlugin {
        fn facets(&self) -> Vec<(String, Arc<dyn Facet>)> {
            vec![
                (
                    "bounce".into(),
                    Arc::new(BounceFacet {
                        hooks: self.hooks.clone(),
                    }),
                ),
                ("slide".into(), Arc::new(SlideFacet)),
            ]
        }

        fn overlay_routes(&self) -> Vec<OverlayRoute> {
            vec![OverlayRoute {
                target: DEFAULT_ENTITY_DISPATCHER.into(),
                overlay: "EntityOverlay".into(),
            }]
        }
    }

    fn world_with_plugin() -> (World, Log) {
        let hooks = log();
        let world = World::make(
            &TestPlugin {
                hooks: hooks.clone(),
            },
            WorldConfig::default(),
        )
        .unwrap();
        (world, hooks)
    }

    /// Screen, group, and a ball entity carrying the bounce facet.
    fn populated() -> (World, Log, Address) {
        let (mut world, hooks) = world_with_plugin();
        let screen = world
            .add_screen(Screen::new("beach", DEFAULT_SCREEN_DISPATCHER))
            .unwrap();
        let group = world
            .add_group(&screen, Group::new("props", DEFAULT_GROUP_DISPATCHER))
            .unwrap();
        let ball = world
            .add_entity(
                &group,
                Entity::new("ball", DEFAULT_ENTITY_DISPATCHER).with_facets(["bounce"]),
            )
            .unwrap();
        (world, hooks, ball)
    }

    #[test]
    fn make_constructs_running_world() {
        let world = World::make(&NoPlugin, WorldConfig::default()).unwrap();
        assert_eq!(world.tick_time(), 0);
        assert!(world.is_running());
        assert_eq!(world.simulants().screen_count(), 0);
        world.validate().unwrap();
    }

    #[test]
    fn add_entity_merges_facet_defaults_and_routes_overlay() {
        let (world, _, ball) = populated();
        let entity = world.entity(&ball).unwrap();
        assert_eq!(entity.xtension.get_float("Restitution").unwrap(), 0.5);
        assert_eq!(entity.overlay.as_deref(), Some("EntityOverlay"));
        assert_eq!(entity.facet_names, ["bounce"]);
        assert_eq!(entity.facets.len(), 1);
        world.validate().unwrap();
    }

    #[test]
    fn unknown_facet_fails_without_creating_entity() {
        let (mut world, _, _) = populated();
        let group = Address::new(["beach", "props"]);
        let err = world
            .add_entity(
                &group,
                Entity::new("net", DEFAULT_ENTITY_DISPATCHER).with_facets(["bounce", "missing"]),
            )
            .unwrap_err();
        assert!(matches!(err, KernelError::UnknownFacet(name) if name == "missing"));
        assert!(world.entity(&group.child("net")).is_err());
    }

    #[test]
    fn register_hooks_run_in_stack_order() {
        let (_, hooks, ball) = populated();
        assert_eq!(logged(&hooks), [format!("bounce:register:{ball}")]);
    }

    #[test]
    fn remove_entity_runs_unregister_hooks() {
        let (mut world, hooks, ball) = populated();
        world.remove_entity(&ball).unwrap();
        assert!(world.entity(&ball).is_err());
        assert_eq!(
            logged(&hooks),
            [
                format!("bounce:register:{ball}"),
                format!("bounce:unregister:{ball}")
            ]
        );
    }

    #[test]
    fn remove_screen_cascades_to_entities() {
        let (mut world, hooks, ball) = populated();
        world.remove_screen(&Address::new(["beach"])).unwrap();
        assert_eq!(world.simulants().screen_count(), 0);
        assert_eq!(world.simulants().entity_count(), 0);
        assert!(logged(&hooks).contains(&format!("bounce:unregister:{ball}")));
    }

    #[test]
    fn subscribers_run_in_insertion_order_with_identity_sorter() {
        let (mut world, _, ball) = populated();
        let order = log();
        let channel = Address::new(["custom"]);
        for name in ["c1", "c2", "c3"] {
            let order = order.clone();
            let name = name.to_string();
            world.subscribe(channel.clone(), ball.clone(), move |_event, _world| {
                order.lock().unwrap().push(name.clone());
                Ok(Handling::Cascade)
            });
        }

        let outcome = world
            .publish_unsorted(&channel, &Address::root(), EventData::Custom(Value::Int(1)))
            .unwrap();
        assert_eq!(outcome, Outcome::Exhausted);
        assert_eq!(logged(&order), ["c1", "c2", "c3"]);
    }

    #[test]
    fn resolve_short_circuits_later_subscribers() {
        let (mut world, _, ball) = populated();
        let order = log();
        let channel = Address::new(["custom"]);

        let o1 = order.clone();
        world.subscribe(channel.clone(), ball.clone(), move |_e, _w| {
            o1.lock().unwrap().push("c1".into());
            Ok(Handling::Cascade)
        });
        let o2 = order.clone();
        world.subscribe(channel.clone(), ball.clone(), move |_e, world| {
            o2.lock().unwrap().push("c2".into());
            world.update_entity(
                &Address::new(["beach", "props", "ball"]),
                |entity| entity.depth = 42.0,
            )?;
            Ok(Handling::Resolve)
        });
        let o3 = order.clone();
        world.subscribe(channel.clone(), ball.clone(), move |_e, _w| {
            o3.lock().unwrap().push("c3".into());
            Ok(Handling::Cascade)
        });

        let outcome = world
            .publish_unsorted(&channel, &Address::root(), EventData::Tick)
            .unwrap();
        assert_eq!(outcome, Outcome::Resolved);
        assert_eq!(logged(&order), ["c1", "c2"]);
        // The world is the one produced by c2.
        assert_eq!(world.entity(&ball).unwrap().depth, 42.0);
    }

    #[test]
    fn removed_subscriber_is_skipped_without_error() {
        let (mut world, _, ball) = populated();
        let order = log();
        let channel = Address::new(["custom"]);

        let removed = ball.clone();
        let o1 = order.clone();
        world.subscribe(channel.clone(), Address::root(), move |_e, world| {
            o1.lock().unwrap().push("remover".into());
            world.remove_entity(&removed)?;
            Ok(Handling::Cascade)
        });
        let o2 = order.clone();
        world.subscribe(channel.clone(), ball.clone(), move |_e, _w| {
            o2.lock().unwrap().push("orphan".into());
            Ok(Handling::Cascade)
        });

        let outcome = world
            .publish_unsorted(&channel, &Address::root(), EventData::Tick)
            .unwrap();
        assert_eq!(outcome, Outcome::Exhausted);
        assert_eq!(logged(&order), ["remover"]);
    }

    #[test]
    fn default_sorter_orders_by_publishing_priority() {
        let (mut world, _, ball) = populated();
        let order = log();
        let channel = Address::new(["custom"]);

        // Entity subscriber inserted first, game root second; priority
        // ordering must still run the game's callback first.
        let o1 = order.clone();
        world.subscribe(channel.clone(), ball.clone(), move |_e, _w| {
            o1.lock().unwrap().push("entity".into());
            Ok(Handling::Cascade)
        });
        let o2 = order.clone();
        world.subscribe(channel.clone(), Address::root(), move |_e, _w| {
            o2.lock().unwrap().push("game".into());
            Ok(Handling::Cascade)
        });

        world
            .publish(&channel, &Address::root(), EventData::Tick)
            .unwrap();
        assert_eq!(logged(&order), ["game", "entity"]);
    }

    #[test]
    fn publish_with_no_subscribers_is_noop() {
        let (mut world, _, _) = populated();
        let outcome = world
            .publish(&Address::new(["silence"]), &Address::root(), EventData::Tick)
            .unwrap();
        assert_eq!(outcome, Outcome::Exhausted);
    }

    #[test]
    fn callback_error_propagates_to_publisher() {
        let (mut world, _, ball) = populated();
        let channel = Address::new(["custom"]);
        world.subscribe(channel.clone(), ball, |_e, _w| {
            Err(KernelError::Handler("boom".into()))
        });
        let err = world
            .publish(&channel, &Address::root(), EventData::Tick)
            .unwrap_err();
        assert!(matches!(err, KernelError::Handler(msg) if msg == "boom"));
    }

    #[test]
    fn unsubscribe_drops_callback_state() {
        let (mut world, _, ball) = populated();
        let key = world.subscribe(Address::new(["custom"]), ball, |_e, _w| {
            Ok(Handling::Cascade)
        });
        world.set_callback_state(key, Value::Int(3));
        assert_eq!(world.callback_state(&key), Some(&Value::Int(3)));

        world.unsubscribe(key);
        assert_eq!(world.callback_state(&key), None);
        // Second unsubscribe is a no-op.
        world.unsubscribe(key);
    }

    #[test]
    fn tasks_drain_in_scheduled_order() {
        let (mut world, _, _) = populated();
        let order = log();
        for tick in [5u64, 2, 2, 8] {
            let order = order.clone();
            world.schedule_task_at(tick, move |world| {
                order
                    .lock()
                    .unwrap()
                    .push(format!("t{}@{}", tick, world.tick_time()));
                Ok(())
            });
        }

        for _ in 0..6 {
            world.tick().unwrap();
        }
        // Tick 1 runs nothing; at tick 2 both tick-2 tasks run in insertion
        // order, then the tick-5 task at tick 5; tick-8 stays pending.
        assert_eq!(logged(&order), ["t2@2", "t2@2", "t5@5"]);
        assert_eq!(world.task_count(), 1);
    }

    #[test]
    fn failing_task_aborts_drain_but_keeps_earlier_effects() {
        let mut world = World::make(&NoPlugin, WorldConfig::default()).unwrap();
        let order = log();
        let o1 = order.clone();
        world.schedule_task_at(1, move |_world| {
            o1.lock().unwrap().push("first".into());
            Ok(())
        });
        world.schedule_task_at(1, |_world| Err(KernelError::Handler("bad task".into())));

        let err = world.tick().unwrap_err();
        assert!(matches!(err, KernelError::TaskFailed { scheduled: 1, .. }));
        assert_eq!(logged(&order), ["first"]);
    }

    #[test]
    fn incoming_transition_completes_at_lifetime() {
        let (mut world, _, _) = populated();
        let screen = Address::new(["beach"]);
        world
            .update_screen(&screen, |s| {
                s.incoming = Transition::dissolve(10, "fade");
            })
            .unwrap();

        let finishes = log();
        let f = finishes.clone();
        world.subscribe(
            channels::incoming_finish("beach"),
            Address::root(),
            move |event, _world| {
                f.lock().unwrap().push(format!("{:?}", event.data));
                Ok(Handling::Cascade)
            },
        );

        world.select_screen(&screen).unwrap();
        assert_eq!(
            world.screen(&screen).unwrap().transition_state,
            TransitionState::Incoming
        );

        for step in 1..=9u64 {
            world.advance_transitions().unwrap();
            assert_eq!(
                world.screen(&screen).unwrap().transition_state,
                TransitionState::Incoming,
                "still incoming at step {step}"
            );
        }
        world.advance_transitions().unwrap();
        assert_eq!(
            world.screen(&screen).unwrap().transition_state,
            TransitionState::Idling
        );
        assert_eq!(logged(&finishes).len(), 1);

        // Further advances publish nothing more.
        world.advance_transitions().unwrap();
        assert_eq!(logged(&finishes).len(), 1);
    }

    #[test]
    fn outgoing_completion_hands_off_to_destination() {
        let (mut world, _, _) = populated();
        let beach = Address::new(["beach"]);
        let lobby = world
            .add_screen(
                Screen::new("lobby", DEFAULT_SCREEN_DISPATCHER)
                    .with_transitions(Transition::dissolve(3, "fade"), Transition::default()),
            )
            .unwrap();

        world.select_screen(&beach).unwrap();
        world.advance_transitions().unwrap(); // instant incoming completes
        assert_eq!(
            world.screen(&beach).unwrap().transition_state,
            TransitionState::Idling
        );

        world.select_screen(&lobby).unwrap();
        assert_eq!(
            world.screen(&beach).unwrap().transition_state,
            TransitionState::Outgoing
        );
        assert_eq!(world.transition_destination(), Some(&lobby));

        world.advance_transitions().unwrap(); // instant outgoing completes
        assert_eq!(world.game().selected_screen.as_ref(), Some(&lobby));
        assert_eq!(
            world.screen(&lobby).unwrap().transition_state,
            TransitionState::Incoming
        );
        assert_eq!(world.transition_destination(), None);
    }

    #[test]
    fn update_entity_publishes_change_when_flagged() {
        let (mut world, _, ball) = populated();
        world
            .update_entity(&ball, |entity| entity.publish_changes = true)
            .unwrap();

        let changes = log();
        let c = changes.clone();
        world.subscribe(channels::change(&ball), Address::root(), move |event, _w| {
            c.lock().unwrap().push(event.event_address.to_string());
            Ok(Handling::Cascade)
        });

        world
            .update_entity(&ball, |entity| entity.position = Vec2::ONE)
            .unwrap();
        assert_eq!(logged(&changes), ["beach/props/ball/change"]);
    }

    #[test]
    fn propagate_physics_last_applied_wins() {
        let (mut world, _, _) = populated();
        let group = Address::new(["beach", "props"]);
        let puck = world
            .add_entity(
                &group,
                Entity::new("puck", DEFAULT_ENTITY_DISPATCHER)
                    .with_facets(["bounce", "slide"]),
            )
            .unwrap();

        world.propagate_entity_physics(&puck).unwrap();
        // bounce writes (2, 0), slide runs after and wins with (7, 0).
        assert_eq!(world.entity(&puck).unwrap().position, Vec2::new(7.0, 0.0));
    }

    #[test]
    fn render_descriptors_concatenate_across_facets() {
        let (world, _, ball) = populated();
        let descriptors = world.entity_render_descriptors(&ball).unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].asset, "bounce-overlay");
    }

    #[test]
    fn quick_size_is_componentwise_max() {
        let (mut world, _, _) = populated();
        let group = Address::new(["beach", "props"]);
        let puck = world
            .add_entity(
                &group,
                Entity::new("puck", DEFAULT_ENTITY_DISPATCHER)
                    .with_facets(["bounce", "slide"]),
            )
            .unwrap();
        // Dispatcher reports entity.size (1,1); bounce (4,1); slide (1,6).
        assert_eq!(world.entity_quick_size(&puck).unwrap(), Vec2::new(4.0, 6.0));
    }

    #[test]
    fn set_facet_names_keeps_lockstep() {
        let (mut world, _, ball) = populated();
        world
            .set_entity_facet_names(&ball, vec!["bounce".into(), "slide".into()])
            .unwrap();
        let entity = world.entity(&ball).unwrap();
        assert_eq!(entity.facet_names, ["bounce", "slide"]);
        assert_eq!(entity.facets.len(), 2);

        let err = world
            .set_entity_facet_names(&ball, vec!["missing".into()])
            .unwrap_err();
        assert!(matches!(err, KernelError::UnknownFacet(_)));
        // Failed replacement leaves the previous lockstep pair intact.
        let entity = world.entity(&ball).unwrap();
        assert_eq!(entity.facet_names, ["bounce", "slide"]);
    }

    #[test]
    fn disabled_subsystem_drops_messages() {
        let (mut world, _, _) = populated();
        world.subsystems.audio.enabled = false;
        world.enqueue_audio(AudioMessage::StopSong);
        assert_eq!(world.queues().audio_len(), 0);

        world.subsystems.audio.enabled = true;
        world.enqueue_audio(AudioMessage::StopSong);
        assert_eq!(world.drain_audio_messages().len(), 1);
    }

    #[test]
    fn stopped_world_does_not_advance() {
        let (mut world, _, _) = populated();
        world.set_running(false);
        world.tick().unwrap();
        assert_eq!(world.tick_time(), 0);
    }

    #[test]
    fn duplicate_plugin_component_is_fatal() {
        struct DupPlugin;
        impl Plugin for DupPlugin {
            fn facets(&self) -> Vec<(String, Arc<dyn Facet>)> {
                vec![
                    ("twin".into(), Arc::new(SlideFacet)),
                    ("twin".into(), Arc::new(SlideFacet)),
                ]
            }
        }
        let err = World::make(&DupPlugin, WorldConfig::default()).unwrap_err();
        assert!(matches!(err, KernelError::DuplicateComponent(name) if name == "twin"));
    }
}
