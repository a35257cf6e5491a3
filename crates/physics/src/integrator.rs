use glam::Vec2;
use std::collections::BTreeMap;
use tableau_common::Address;
use tableau_kernel::message::{BodyShape, CollisionData, PhysicsMessage};

/// One simulated rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Axis-aligned half extents; circles use their bounding box.
    pub half_extents: Vec2,
    /// Zero mass marks a static body.
    pub mass: f32,
    pub restitution: f32,
}

impl Body {
    fn min(&self) -> Vec2 {
        self.position - self.half_extents
    }

    fn max(&self) -> Vec2 {
        self.position + self.half_extents
    }

    fn is_static(&self) -> bool {
        self.mass == 0.0
    }
}

/// Integrator-agnostic interface. All physics backends implement this trait.
pub trait Integrator {
    /// Process one tick's message batch.
    fn handle(&mut self, messages: Vec<PhysicsMessage>);

    /// Advance the simulation one tick. Returns one collision report per
    /// involved body, addressed to it and naming the other as collidee.
    fn step(&mut self) -> Vec<(Address, CollisionData)>;

    /// Current position of a body, if it exists.
    fn body_position(&self, address: &Address) -> Option<Vec2>;
}

/// AABB integrator standing in for a full rigid-body backend.
///
/// Boxes (and circle bounding boxes) under uniform gravity with impulse
/// application and restitution-scaled collision response. The trait is
/// stable; swap in a real backend without changing consumers.
#[derive(Debug, Clone)]
pub struct BoxIntegrator {
    bodies: BTreeMap<Address, Body>,
    gravity: Vec2,
}

impl Default for BoxIntegrator {
    fn default() -> Self {
        Self {
            bodies: BTreeMap::new(),
            gravity: Vec2::new(0.0, -9.8),
        }
    }
}

impl BoxIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(&self, address: &Address) -> Option<&Body> {
        self.bodies.get(address)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn create_body(
        &mut self,
        address: Address,
        shape: BodyShape,
        position: Vec2,
        density: f32,
        restitution: f32,
    ) {
        let half_extents = match shape {
            BodyShape::Box { size } => size / 2.0,
            BodyShape::Circle { radius } => Vec2::splat(radius),
        };
        let area = half_extents.x * half_extents.y * 4.0;
        let body = Body {
            position,
            velocity: Vec2::ZERO,
            half_extents,
            mass: density * area,
            restitution,
        };
        tracing::debug!(body = %address, "body created");
        self.bodies.insert(address, body);
    }

    /// Overlap test plus response for one pair. Returns the collision
    /// normal (pointing from `a` toward `b`) and closing speed, or `None`
    /// when the pair is separated or parting.
    fn collide(a: &mut Body, b: &mut Body) -> Option<(Vec2, f32)> {
        let overlap_x = (a.max().x.min(b.max().x)) - (a.min().x.max(b.min().x));
        let overlap_y = (a.max().y.min(b.max().y)) - (a.min().y.max(b.min().y));
        if overlap_x <= 0.0 || overlap_y <= 0.0 {
            return None;
        }

        // Resolve along the axis of least penetration.
        let normal = if overlap_x < overlap_y {
            Vec2::new(if a.position.x < b.position.x { 1.0 } else { -1.0 }, 0.0)
        } else {
            Vec2::new(0.0, if a.position.y < b.position.y { 1.0 } else { -1.0 })
        };

        let closing_speed = (a.velocity - b.velocity).dot(normal);
        if closing_speed <= 0.0 {
            return None;
        }

        let restitution = a.restitution.max(b.restitution);
        let penetration = overlap_x.min(overlap_y);
        match (a.is_static(), b.is_static()) {
            (false, false) => {
                let total = a.mass + b.mass;
                let impulse = (1.0 + restitution) * closing_speed / total;
                a.velocity -= normal * impulse * b.mass;
                b.velocity += normal * impulse * a.mass;
                a.position -= normal * penetration / 2.0;
                b.position += normal * penetration / 2.0;
            }
            (false, true) => {
                a.velocity -= normal * (1.0 + restitution) * closing_speed;
                a.position -= normal * penetration;
            }
            (true, false) => {
                b.velocity += normal * (1.0 + restitution) * closing_speed;
                b.position += normal * penetration;
            }
            (true, true) => return None,
        }
        Some((normal, closing_speed))
    }
}

impl Integrator for BoxIntegrator {
    fn handle(&mut self, messages: Vec<PhysicsMessage>) {
        for message in messages {
            match message {
                PhysicsMessage::CreateBody {
                    address,
                    shape,
                    position,
                    density,
                    restitution,
                } => self.create_body(address, shape, position, density, restitution),
                PhysicsMessage::DestroyBody { address } => {
                    if self.bodies.remove(&address).is_some() {
                        tracing::debug!(body = %address, "body destroyed");
                    }
                }
                PhysicsMessage::SetPosition { address, position } => {
                    if let Some(body) = self.bodies.get_mut(&address) {
                        body.position = position;
                    }
                }
                PhysicsMessage::ApplyImpulse { address, impulse } => {
                    if let Some(body) = self.bodies.get_mut(&address) {
                        if !body.is_static() {
                            body.velocity += impulse / body.mass;
                        }
                    }
                }
                PhysicsMessage::SetGravity { gravity } => {
                    self.gravity = gravity;
                }
            }
        }
    }

    fn step(&mut self) -> Vec<(Address, CollisionData)> {
        for body in self.bodies.values_mut() {
            if !body.is_static() {
                body.velocity += self.gravity;
                body.position += body.velocity;
            }
        }

        let addresses: Vec<Address> = self.bodies.keys().cloned().collect();
        let mut reports = Vec::new();
        for i in 0..addresses.len() {
            for j in (i + 1)..addresses.len() {
                // Move both bodies out to get simultaneous &mut access.
                let Some(mut a) = self.bodies.remove(&addresses[i]) else {
                    continue;
                };
                let Some(mut b) = self.bodies.remove(&addresses[j]) else {
                    self.bodies.insert(addresses[i].clone(), a);
                    continue;
                };
                if let Some((normal, speed)) = Self::collide(&mut a, &mut b) {
                    reports.push((
                        addresses[i].clone(),
                        CollisionData {
                            normal,
                            speed,
                            collidee: addresses[j].clone(),
                        },
                    ));
                    reports.push((
                        addresses[j].clone(),
                        CollisionData {
                            normal: -normal,
                            speed,
                            collidee: addresses[i].clone(),
                        },
                    ));
                }
                self.bodies.insert(addresses[i].clone(), a);
                self.bodies.insert(addresses[j].clone(), b);
            }
        }
        reports
    }

    fn body_position(&self, address: &Address) -> Option<Vec2> {
        self.bodies.get(address).map(|body| body.position)
    }
}
