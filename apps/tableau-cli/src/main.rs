use std::sync::Arc;

use clap::{Parser, Subcommand};
use glam::Vec2;
use tableau_audio::{AudioPlayer, NullAudioPlayer};
use tableau_common::{Address, Value};
use tableau_kernel::dispatch::{
    DEFAULT_ENTITY_DISPATCHER, DEFAULT_GROUP_DISPATCHER, DEFAULT_SCREEN_DISPATCHER,
    EntityDispatcher, Facet,
};
use tableau_kernel::message::{AudioMessage, BodyShape, PhysicsMessage, RenderMessage};
use tableau_kernel::simulant::{Entity, Group, Screen, Transition, ViewKind};
use tableau_kernel::world::WorldConfig;
use tableau_kernel::xtension::FieldDefault;
use tableau_kernel::{
    Event, EventData, Handling, KernelError, Plugin, RenderDescriptor, World, channels,
};
use tableau_physics::{BoxIntegrator, Integrator};
use tableau_render::{DebugTextRenderer, Renderer};
use tableau_tools::WorldInspector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tableau-cli", about = "CLI tool for tableau operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print engine version and world info
    Info,
    /// Run the bouncing-ball demo simulation
    Run {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "60")]
        ticks: u64,
        /// Print a rendered frame every N ticks
        #[arg(short, long, default_value = "15")]
        frame_interval: u64,
    },
}

/// Entity dispatcher for the demo ball: a dynamic circle body that sprites
/// as "Ball".
struct BallDispatcher;

impl EntityDispatcher for BallDispatcher {
    fn register(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let subscriber = entity.clone();
        world.subscribe(
            channels::collision(entity),
            entity.clone(),
            move |event: &Event, world: &mut World| {
                let data = event.data.expect_collision()?;
                tracing::debug!(entity = %subscriber, speed = data.speed, "ball collided");
                world.enqueue_audio(AudioMessage::PlaySound {
                    asset: "Bounce".into(),
                    volume: 1.0,
                });
                Ok(Handling::Cascade)
            },
        );
        Ok(())
    }

    fn register_physics(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let (position, radius, restitution) = {
            let entity = world.entity(entity)?;
            (
                entity.position,
                entity.size.x / 2.0,
                entity.xtension.get_float("Restitution")?,
            )
        };
        world.enqueue_physics(PhysicsMessage::CreateBody {
            address: entity.clone(),
            shape: BodyShape::Circle { radius },
            position,
            density: 1.0,
            restitution,
        });
        Ok(())
    }

    fn unregister_physics(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        world.enqueue_physics(PhysicsMessage::DestroyBody {
            address: entity.clone(),
        });
        Ok(())
    }

    fn render_descriptors(&self, entity: &Entity, _world: &World) -> Vec<RenderDescriptor> {
        vec![RenderDescriptor {
            position: entity.position,
            size: entity.size,
            rotation: entity.rotation,
            depth: entity.depth,
            view: entity.view,
            asset: "Ball".into(),
            color: [1.0, 1.0, 1.0, 1.0],
        }]
    }

    fn field_defaults(&self) -> Vec<FieldDefault> {
        vec![FieldDefault::new("Restitution", Value::Float(0.8))]
    }
}

/// Facet that pins a static box body under its entity, for floors and walls.
struct StaticBodyFacet;

impl Facet for StaticBodyFacet {
    fn register_physics(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        let (position, size) = {
            let entity = world.entity(entity)?;
            (entity.position, entity.size)
        };
        world.enqueue_physics(PhysicsMessage::CreateBody {
            address: entity.clone(),
            shape: BodyShape::Box { size },
            position,
            density: 0.0,
            restitution: 0.0,
        });
        Ok(())
    }

    fn unregister_physics(&self, entity: &Address, world: &mut World) -> Result<(), KernelError> {
        world.enqueue_physics(PhysicsMessage::DestroyBody {
            address: entity.clone(),
        });
        Ok(())
    }

    fn render_descriptors(&self, entity: &Entity, _world: &World) -> Vec<RenderDescriptor> {
        vec![RenderDescriptor {
            position: entity.position,
            size: entity.size,
            rotation: entity.rotation,
            depth: entity.depth - 1.0,
            view: entity.view,
            asset: "Ground".into(),
            color: [0.5, 0.5, 0.5, 1.0],
        }]
    }
}

struct DemoPlugin;

impl Plugin for DemoPlugin {
    fn entity_dispatchers(&self) -> Vec<(String, Arc<dyn EntityDispatcher>)> {
        vec![("ball".into(), Arc::new(BallDispatcher))]
    }

    fn facets(&self) -> Vec<(String, Arc<dyn Facet>)> {
        vec![("static-body".into(), Arc::new(StaticBodyFacet))]
    }
}

fn build_demo_world() -> anyhow::Result<World> {
    let mut world = World::make(&DemoPlugin, WorldConfig::default())?;

    let screen = world.add_screen(
        Screen::new("arena", DEFAULT_SCREEN_DISPATCHER)
            .with_transitions(Transition::dissolve(5, "Fade"), Transition::instant()),
    )?;
    let group = world.add_group(&screen, Group::new("props", DEFAULT_GROUP_DISPATCHER))?;

    let mut ball = Entity::new("ball", "ball");
    ball.position = Vec2::new(0.0, 200.0);
    ball.size = Vec2::splat(16.0);
    world.add_entity(&group, ball)?;

    let mut floor =
        Entity::new("floor", DEFAULT_ENTITY_DISPATCHER).with_facets(["static-body"]);
    floor.position = Vec2::new(-480.0, -272.0);
    floor.size = Vec2::new(960.0, 32.0);
    floor.view = ViewKind::Relative;
    world.add_entity(&group, floor)?;

    world.select_screen(&screen)?;
    Ok(world)
}

fn run_demo(ticks: u64, frame_interval: u64) -> anyhow::Result<()> {
    let mut world = build_demo_world()?;
    let mut renderer = DebugTextRenderer::new();
    let mut player = NullAudioPlayer::new();
    let mut integrator = BoxIntegrator::new();

    let entities = WorldInspector::list_entities(&world);
    println!("Demo world: {} entities", entities.len());

    for tick in 1..=ticks {
        world.tick()?;

        // Physics: drain messages, step, write positions back, report
        // collisions into the event engine.
        integrator.handle(world.drain_physics_messages());
        let reports = integrator.step();
        for address in WorldInspector::list_entities(&world) {
            if let Some(position) = integrator.body_position(&address) {
                world.update_entity(&address, |entity| entity.position = position)?;
            }
        }
        for (address, data) in reports {
            if world.entity(&address).is_err() {
                continue;
            }
            world.publish(
                &channels::collision(&address),
                &address,
                EventData::Collision(data),
            )?;
        }

        // Render: gather descriptors, drain, print at the given cadence.
        let mut descriptors = Vec::new();
        for address in WorldInspector::list_entities(&world) {
            if world.entity(&address)?.visible {
                descriptors.extend(world.entity_render_descriptors(&address)?);
            }
        }
        world.enqueue_render(RenderMessage::Descriptors(descriptors));
        let frame = renderer.render(world.drain_render_messages(), world.camera());
        if frame_interval > 0 && tick % frame_interval == 0 {
            println!("--- tick {tick} ---");
            print!("{frame}");
        }

        player.update(world.drain_audio_messages());
    }

    println!("{}", WorldInspector::summary(&world));
    println!("Sounds played: {}", player.sounds_played());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("tableau-cli v{}", env!("CARGO_PKG_VERSION"));
            let world = build_demo_world()?;
            println!("{}", WorldInspector::summary(&world));
            for address in WorldInspector::list_entities(&world) {
                if let Some(info) = WorldInspector::inspect_entity(&world, &address) {
                    println!("  {info}");
                }
            }
        }
        Commands::Run {
            ticks,
            frame_interval,
        } => run_demo(ticks, frame_interval)?,
    }

    Ok(())
}
