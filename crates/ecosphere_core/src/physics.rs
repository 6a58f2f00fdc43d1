//! Explicit Euler integration with biome friction, plus grid-bucketed
//! AABB/circle collision detection and mass-proportional resolution.

use ecosphere_data::{EntityId, Position, Velocity};
use std::collections::HashMap;

/// A collision-phase working record; built from live entities sorted by id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub id: EntityId,
    pub position: Position,
    pub velocity: Velocity,
    pub radius: f64,
    pub mass: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionRecord {
    pub a: EntityId,
    pub b: EntityId,
    pub overlap: f64,
    pub midpoint: Position,
}

/// One Euler step with velocity damping. The caller clamps the result into
/// world bounds afterward.
pub fn integrate(
    position: &mut Position,
    velocity: &mut Velocity,
    friction: f64,
    max_speed: f64,
    dt: f64,
) {
    let damping = (1.0 - friction).clamp(0.0, 1.0);
    velocity.vx *= damping;
    velocity.vy *= damping;

    let speed = velocity.magnitude();
    if speed > max_speed {
        let scale = max_speed / speed;
        velocity.vx *= scale;
        velocity.vy *= scale;
    }

    position.x += velocity.vx * dt;
    position.y += velocity.vy * dt;
}

#[inline]
fn bucket_of(pos: &Position, cell_size: f64) -> (i64, i64) {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
    )
}

fn aabb_overlaps(a: &Body, b: &Body) -> bool {
    (a.position.x - b.position.x).abs() <= a.radius + b.radius
        && (a.position.y - b.position.y).abs() <= a.radius + b.radius
}

/// Detect and resolve pairwise collisions.
///
/// Candidate pairs come from each body's bucket plus its 8 neighbors; the
/// AABB test gates the exact circle-overlap test. Resolution pushes bodies
/// apart along the contact normal proportional to the opposite body's mass
/// and reflects the approaching velocity component scaled by `restitution`.
/// `bodies` must be sorted by id so pair iteration is deterministic.
pub fn resolve_collisions(
    bodies: &mut [Body],
    cell_size: f64,
    restitution: f64,
) -> Vec<CollisionRecord> {
    let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (idx, body) in bodies.iter().enumerate() {
        buckets
            .entry(bucket_of(&body.position, cell_size))
            .or_default()
            .push(idx);
    }

    let mut records = Vec::new();
    for i in 0..bodies.len() {
        let (bx, by) = bucket_of(&bodies[i].position, cell_size);
        let mut candidates: Vec<usize> = Vec::new();
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(cell) = buckets.get(&(bx + dx, by + dy)) {
                    candidates.extend(cell.iter().copied().filter(|&j| j > i));
                }
            }
        }
        candidates.sort_unstable();

        for j in candidates {
            let (left, right) = bodies.split_at_mut(j);
            let a = &mut left[i];
            let b = &mut right[0];

            if !aabb_overlaps(a, b) {
                continue;
            }

            let dx = b.position.x - a.position.x;
            let dy = b.position.y - a.position.y;
            let dist_sq = dx * dx + dy * dy;
            let min_dist = a.radius + b.radius;
            if dist_sq >= min_dist * min_dist {
                continue;
            }

            let dist = dist_sq.sqrt();
            // Coincident centers: separate along x deterministically.
            let (nx, ny) = if dist > 1e-9 {
                (dx / dist, dy / dist)
            } else {
                (1.0, 0.0)
            };
            let overlap = min_dist - dist;
            let total_mass = (a.mass + b.mass).max(1e-9);
            let push_a = overlap * (b.mass / total_mass);
            let push_b = overlap * (a.mass / total_mass);

            let midpoint = Position::new(
                (a.position.x + b.position.x) * 0.5,
                (a.position.y + b.position.y) * 0.5,
            );

            a.position.x -= nx * push_a;
            a.position.y -= ny * push_a;
            b.position.x += nx * push_b;
            b.position.y += ny * push_b;

            // Reflect only the approaching component, scaled by restitution.
            let rel_vx = b.velocity.vx - a.velocity.vx;
            let rel_vy = b.velocity.vy - a.velocity.vy;
            let approach = rel_vx * nx + rel_vy * ny;
            if approach < 0.0 {
                let impulse = -(1.0 + restitution) * approach;
                let ia = impulse * (b.mass / total_mass);
                let ib = impulse * (a.mass / total_mass);
                a.velocity.vx -= nx * ia;
                a.velocity.vy -= ny * ia;
                b.velocity.vx += nx * ib;
                b.velocity.vy += ny * ib;
            }

            records.push(CollisionRecord {
                a: a.id,
                b: b.id,
                overlap,
                midpoint,
            });
        }
    }
    records
}
