use serde::{Deserialize, Serialize};

use kartwar_core::game_trait::PlayerId;

use crate::arena::ExplosionRequest;
use crate::math::{Vec2, circles_overlap};

/// Mine lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MineState {
    /// Placed but not yet able to trigger.
    Inert,
    Armed,
    Detonated,
    Expired,
}

/// A stationary proximity-triggered charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mine {
    pub id: u64,
    pub owner: PlayerId,
    pub pos: Vec2,
    pub damage: f32,
    /// Trigger radius.
    pub size: f32,
    pub explosion_radius: f32,
    pub knockback: f32,
    pub arm_time: f32,
    pub lifetime: f32,
    pub age: f32,
    pub state: MineState,
}

impl Mine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        owner: PlayerId,
        pos: Vec2,
        damage: f32,
        size: f32,
        explosion_radius: f32,
        knockback: f32,
        arm_time: f32,
        lifetime: f32,
    ) -> Self {
        Self {
            id,
            owner,
            pos,
            damage,
            size,
            explosion_radius,
            knockback,
            arm_time,
            lifetime,
            age: 0.0,
            state: MineState::Inert,
        }
    }

    /// Age the mine. Returns `true` on the tick it arms.
    pub fn update(&mut self, dt: f32) -> bool {
        if !self.is_active() {
            return false;
        }
        self.age += dt;
        if self.age >= self.lifetime {
            self.state = MineState::Expired;
            return false;
        }
        if self.state == MineState::Inert && self.age >= self.arm_time {
            self.state = MineState::Armed;
            return true;
        }
        false
    }

    pub fn is_armed(&self) -> bool {
        self.state == MineState::Armed
    }

    /// Still in the world (inert or armed).
    pub fn is_active(&self) -> bool {
        matches!(self.state, MineState::Inert | MineState::Armed)
    }

    /// Trigger on a vehicle overlapping an armed mine. The owner never
    /// triggers its own mine. Consumes the mine on success.
    pub fn try_trigger(
        &mut self,
        vehicle: PlayerId,
        center: Vec2,
        radius: f32,
    ) -> Option<ExplosionRequest> {
        if !self.is_armed() || vehicle == self.owner {
            return None;
        }
        if !circles_overlap(self.pos, self.size, center, radius) {
            return None;
        }
        self.state = MineState::Detonated;
        Some(ExplosionRequest {
            origin: self.pos,
            radius: self.explosion_radius,
            damage: self.damage,
            knockback: self.knockback,
            owner: Some(self.owner),
        })
    }
}
