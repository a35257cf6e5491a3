use tableau_common::Address;
use tableau_kernel::World;

/// World inspector for developer tooling.
///
/// Provides read-only queries against the world state for debugging and
/// development UI.
pub struct WorldInspector;

impl WorldInspector {
    /// Produce a summary of the world state.
    pub fn summary(world: &World) -> WorldSummary {
        WorldSummary {
            tick: world.tick_time(),
            running: world.is_running(),
            selected_screen: world
                .game()
                .selected_screen
                .as_ref()
                .map(|address| address.to_string()),
            screen_count: world.simulants().screen_count(),
            group_count: world.simulants().group_count(),
            entity_count: world.simulants().entity_count(),
            subscription_count: world.subscription_count(),
            task_count: world.task_count(),
        }
    }

    /// Snapshot one entity's display-relevant state.
    pub fn inspect_entity(world: &World, address: &Address) -> Option<EntityInfo> {
        world.entity(address).ok().map(|entity| EntityInfo {
            address: address.clone(),
            position: [entity.position.x, entity.position.y],
            size: [entity.size.x, entity.size.y],
            depth: entity.depth,
            visible: entity.visible,
            dispatcher: entity.dispatcher_name.clone(),
            facets: entity.facet_names.clone(),
            fields: entity.xtension.field_names().count(),
        })
    }

    /// Every entity address in the hierarchy, in deterministic order.
    pub fn list_entities(world: &World) -> Vec<Address> {
        let mut addresses = Vec::new();
        for screen in world.simulants().screens() {
            let screen_address = screen.address();
            for group in world.simulants().groups_of(&screen.name) {
                let group_address = screen_address.child(group.name.clone());
                for entity in world.simulants().entities_of(&screen.name, &group.name) {
                    addresses.push(group_address.child(entity.name.clone()));
                }
            }
        }
        addresses
    }
}

/// Summary of world state for the inspector.
#[derive(Debug, Clone)]
pub struct WorldSummary {
    pub tick: u64,
    pub running: bool,
    pub selected_screen: Option<String>,
    pub screen_count: usize,
    pub group_count: usize,
    pub entity_count: usize,
    pub subscription_count: usize,
    pub task_count: usize,
}

impl std::fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "World: tick={} running={} screen={} screens={} groups={} entities={} subscriptions={} tasks={}",
            self.tick,
            self.running,
            self.selected_screen.as_deref().unwrap_or("-"),
            self.screen_count,
            self.group_count,
            self.entity_count,
            self.subscription_count,
            self.task_count,
        )
    }
}

/// Detailed info about a single entity.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub address: Address,
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub depth: f32,
    pub visible: bool,
    pub dispatcher: String,
    pub facets: Vec<String>,
    pub fields: usize,
}

impl std::fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Entity [{}] pos=({:.2}, {:.2}) size=({:.2}, {:.2}) depth={:.1} dispatcher={} facets=[{}]",
            self.address,
            self.position[0],
            self.position[1],
            self.size[0],
            self.size[1],
            self.depth,
            self.dispatcher,
            self.facets.join(", "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use tableau_kernel::dispatch::{
        DEFAULT_ENTITY_DISPATCHER, DEFAULT_GROUP_DISPATCHER, DEFAULT_SCREEN_DISPATCHER,
    };
    use tableau_kernel::plugin::NoPlugin;
    use tableau_kernel::simulant::{Entity, Group, Screen};
    use tableau_kernel::world::WorldConfig;

    fn populated() -> World {
        let mut world = World::make(&NoPlugin, WorldConfig::default()).unwrap();
        let screen = world
            .add_screen(Screen::new("beach", DEFAULT_SCREEN_DISPATCHER))
            .unwrap();
        let group = world
            .add_group(&screen, Group::new("props", DEFAULT_GROUP_DISPATCHER))
            .unwrap();
        let mut ball = Entity::new("ball", DEFAULT_ENTITY_DISPATCHER);
        ball.position = Vec2::new(1.0, 2.0);
        world.add_entity(&group, ball).unwrap();
        world
    }

    #[test]
    fn summary_empty_world() {
        let world = World::make(&NoPlugin, WorldConfig::default()).unwrap();
        let summary = WorldInspector::summary(&world);
        assert_eq!(summary.tick, 0);
        assert_eq!(summary.entity_count, 0);
        assert!(summary.selected_screen.is_none());
    }

    #[test]
    fn summary_counts_hierarchy() {
        let summary = WorldInspector::summary(&populated());
        assert_eq!(summary.screen_count, 1);
        assert_eq!(summary.group_count, 1);
        assert_eq!(summary.entity_count, 1);
    }

    #[test]
    fn inspect_entity_found() {
        let world = populated();
        let info =
            WorldInspector::inspect_entity(&world, &Address::new(["beach", "props", "ball"]))
                .unwrap();
        assert_eq!(info.position, [1.0, 2.0]);
        assert_eq!(info.dispatcher, DEFAULT_ENTITY_DISPATCHER);
    }

    #[test]
    fn inspect_entity_not_found() {
        let world = populated();
        assert!(
            WorldInspector::inspect_entity(&world, &Address::new(["beach", "props", "net"]))
                .is_none()
        );
    }

    #[test]
    fn list_entities_walks_hierarchy() {
        let world = populated();
        let addresses = WorldInspector::list_entities(&world);
        assert_eq!(addresses, [Address::new(["beach", "props", "ball"])]);
    }
}
