use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use kartwar_core::error::SimError;
use kartwar_core::game_trait::PlayerId;

use crate::math::{
    Rect, Vec2, circle_rect_overlap, min_penetration, rects_overlap, segment_intersects_rect,
};

/// Thickness of the generated boundary walls.
pub const BOUNDARY_THICKNESS: f32 = 20.0;
/// Clearance kept free of obstacles around every spawn point.
const SPAWN_CLEARANCE: f32 = 70.0;
/// Placement attempts per generated obstacle before giving up on it.
const PLACEMENT_ATTEMPTS: usize = 40;
/// Nominal health of indestructible obstacles (never reduced).
const PILLAR_HEALTH: f32 = 1000.0;

/// Wall classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallKind {
    Boundary,
    Inner,
}

/// An indestructible axis-aligned wall.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wall {
    pub rect: Rect,
    pub kind: WallKind,
}

/// Blast carried by an explosive obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplosivePayload {
    pub radius: f32,
    pub damage: f32,
    pub knockback: f32,
}

/// A rectangular obstacle, optionally destructible and explosive.
///
/// A destroyed obstacle keeps its slot until [`Arena::cleanup`] compacts it
/// away, but stops taking part in collision queries immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    /// Stable identity; slots shift when destroyed obstacles are compacted.
    #[serde(default)]
    pub id: u32,
    pub rect: Rect,
    pub destructible: bool,
    pub health: f32,
    pub max_health: f32,
    pub explosive: Option<ExplosivePayload>,
    pub destroyed: bool,
    /// Visual grace left before removal, counted down once destroyed.
    pub removal_timer: f32,
}

impl Obstacle {
    pub fn pillar(rect: Rect) -> Self {
        Self {
            id: 0,
            rect,
            destructible: false,
            health: PILLAR_HEALTH,
            max_health: PILLAR_HEALTH,
            explosive: None,
            destroyed: false,
            removal_timer: 0.0,
        }
    }

    pub fn crate_box(rect: Rect, health: f32) -> Self {
        Self {
            id: 0,
            rect,
            destructible: true,
            health,
            max_health: health,
            explosive: None,
            destroyed: false,
            removal_timer: 0.0,
        }
    }

    pub fn barrel(rect: Rect, health: f32, payload: ExplosivePayload) -> Self {
        Self {
            explosive: Some(payload),
            ..Self::crate_box(rect, health)
        }
    }

    pub fn is_live(&self) -> bool {
        !self.destroyed
    }
}

/// A spawn location with an initial heading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
}

impl SpawnPoint {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Arena size preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArenaSize {
    Small,
    Default,
    Large,
}

impl ArenaSize {
    pub fn from_name(name: &str) -> Self {
        match name {
            "small" => ArenaSize::Small,
            "large" => ArenaSize::Large,
            _ => ArenaSize::Default,
        }
    }

    fn file_stem(self) -> &'static str {
        match self {
            ArenaSize::Small => "small",
            ArenaSize::Default => "default",
            ArenaSize::Large => "large",
        }
    }
}

/// An explosion the arena wants spawned, e.g. from a destroyed barrel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExplosionRequest {
    pub origin: Vec2,
    pub radius: f32,
    pub damage: f32,
    pub knockback: f32,
    /// Credited with any damage the blast deals.
    pub owner: Option<PlayerId>,
}

/// Receiver for explosions requested by arena geometry.
pub trait ExplosionSink {
    fn request_explosion(&mut self, request: ExplosionRequest);
}

impl ExplosionSink for Vec<ExplosionRequest> {
    fn request_explosion(&mut self, request: ExplosionRequest) {
        self.push(request);
    }
}

/// Outcome of damaging an obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleHit {
    /// Indestructible, already destroyed, or out of range index.
    Absorbed,
    Damaged,
    /// This call destroyed the obstacle.
    Destroyed,
}

/// Static play-area geometry plus spawn tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena {
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub walls: Vec<Wall>,
    pub obstacles: Vec<Obstacle>,
    pub vehicle_spawns: Vec<SpawnPoint>,
    pub weapon_spawns: Vec<Vec2>,
    pub powerup_spawns: Vec<Vec2>,
}

impl Arena {
    /// Full arena rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    /// Clamp a point so it stays `margin` inside the arena.
    pub fn clamp_inside(&self, p: Vec2, margin: f32) -> Vec2 {
        Vec2::new(
            p.x.clamp(margin, (self.width - margin).max(margin)),
            p.y.clamp(margin, (self.height - margin).max(margin)),
        )
    }

    /// Index of the first wall overlapping the entity's bounding box.
    pub fn wall_overlap(&self, center: Vec2, radius: f32) -> Option<usize> {
        let bb = Rect::around(center, radius);
        self.walls.iter().position(|w| rects_overlap(&bb, &w.rect))
    }

    /// Index of the first live obstacle overlapping the entity's circle.
    pub fn obstacle_overlap(&self, center: Vec2, radius: f32) -> Option<usize> {
        self.obstacles
            .iter()
            .position(|o| o.is_live() && circle_rect_overlap(center, radius, &o.rect))
    }

    /// Indices of every live obstacle overlapping the entity's circle.
    pub fn obstacles_overlapping(
        &self,
        center: Vec2,
        radius: f32,
    ) -> impl Iterator<Item = usize> + '_ {
        self.obstacles
            .iter()
            .enumerate()
            .filter(move |(_, o)| o.is_live() && circle_rect_overlap(center, radius, &o.rect))
            .map(|(i, _)| i)
    }

    /// Push an entity out of every wall it overlaps. Each push halves and
    /// inverts the velocity component along the push axis.
    pub fn resolve_wall_collisions(&self, pos: &mut Vec2, vel: &mut Vec2, radius: f32) -> bool {
        let mut hit = false;
        for wall in &self.walls {
            hit |= soft_bounce(pos, vel, radius, &wall.rect);
        }
        hit
    }

    /// Push an entity out of every live obstacle it overlaps.
    pub fn resolve_obstacle_collisions(
        &self,
        pos: &mut Vec2,
        vel: &mut Vec2,
        radius: f32,
    ) -> bool {
        let mut hit = false;
        for obstacle in self.obstacles.iter().filter(|o| o.is_live()) {
            if circle_rect_overlap(*pos, radius, &obstacle.rect) {
                hit |= soft_bounce(pos, vel, radius, &obstacle.rect);
            }
        }
        hit
    }

    /// Damage an obstacle. Destruction (and the explosion of an explosive
    /// obstacle) happens exactly once; later calls are absorbed.
    pub fn damage_obstacle(
        &mut self,
        index: usize,
        amount: f32,
        attacker: Option<PlayerId>,
        grace: f32,
        sink: &mut impl ExplosionSink,
    ) -> ObstacleHit {
        let Some(obstacle) = self.obstacles.get_mut(index) else {
            return ObstacleHit::Absorbed;
        };
        if !obstacle.destructible || obstacle.destroyed {
            return ObstacleHit::Absorbed;
        }

        obstacle.health -= amount;
        if obstacle.health > 0.0 {
            return ObstacleHit::Damaged;
        }

        obstacle.health = 0.0;
        obstacle.destroyed = true;
        obstacle.removal_timer = grace;
        if let Some(payload) = obstacle.explosive {
            sink.request_explosion(ExplosionRequest {
                origin: obstacle.rect.center(),
                radius: payload.radius,
                damage: payload.damage,
                knockback: payload.knockback,
                owner: attacker,
            });
        }
        ObstacleHit::Destroyed
    }

    /// True if no wall or live obstacle blocks the segment `a`-`b`.
    pub fn line_of_sight(&self, a: Vec2, b: Vec2) -> bool {
        let wall_blocks = self
            .walls
            .iter()
            .filter(|w| w.kind == WallKind::Inner)
            .any(|w| segment_intersects_rect(a, b, &w.rect));
        if wall_blocks {
            return false;
        }
        !self
            .obstacles
            .iter()
            .filter(|o| o.is_live())
            .any(|o| segment_intersects_rect(a, b, &o.rect))
    }

    /// Count down destroyed obstacles and compact away those whose grace has
    /// elapsed. Returns the number removed.
    pub fn cleanup(&mut self, dt: f32) -> usize {
        let before = self.obstacles.len();
        for obstacle in self.obstacles.iter_mut().filter(|o| o.destroyed) {
            obstacle.removal_timer -= dt;
        }
        self.obstacles
            .retain(|o| !(o.destroyed && o.removal_timer <= 0.0));
        before - self.obstacles.len()
    }

    /// Reject geometry the simulation cannot run on.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(SimError::InvalidArena(format!(
                "{}: non-positive size {}x{}",
                self.name, self.width, self.height
            )));
        }
        if self.vehicle_spawns.is_empty() {
            return Err(SimError::InvalidArena(format!(
                "{}: no vehicle spawn points",
                self.name
            )));
        }
        let bounds = self.bounds();
        if self
            .vehicle_spawns
            .iter()
            .any(|s| !bounds.contains(s.position()))
        {
            return Err(SimError::InvalidArena(format!(
                "{}: vehicle spawn outside bounds",
                self.name
            )));
        }
        Ok(())
    }
}

/// Push `pos` out of `rect` along the axis of least penetration and bounce
/// the matching velocity component at half strength.
fn soft_bounce(pos: &mut Vec2, vel: &mut Vec2, radius: f32, rect: &Rect) -> bool {
    let Some(push) = min_penetration(&Rect::around(*pos, radius), rect) else {
        return false;
    };
    *pos += push;
    if push.x != 0.0 && vel.x * push.x < 0.0 {
        vel.x = -vel.x * 0.5;
    }
    if push.y != 0.0 && vel.y * push.y < 0.0 {
        vel.y = -vel.y * 0.5;
    }
    true
}

/// Load an arena from a JSON file, returning `None` if the file is missing or invalid.
pub fn load_arena_from_file(path: &str) -> Option<Arena> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Arena>(&content) {
        Ok(mut arena) => match arena.validate() {
            Ok(()) => {
                for (i, obstacle) in arena.obstacles.iter_mut().enumerate() {
                    obstacle.id = i as u32;
                }
                Some(arena)
            },
            Err(e) => {
                tracing::warn!("Rejected {path}: {e}");
                None
            },
        },
        Err(e) => {
            tracing::warn!("Failed to parse {path}: {e}");
            None
        },
    }
}

/// Write an arena as pretty JSON, readable by `load_arena_from_file`.
pub fn save_arena_to_file(arena: &Arena, path: &str) -> Result<(), SimError> {
    let json = serde_json::to_string_pretty(arena)
        .map_err(|e| SimError::InvalidArena(format!("{path}: {e}")))?;
    std::fs::write(path, json).map_err(|e| SimError::InvalidArena(format!("{path}: {e}")))
}

/// Load an arena for the given size, preferring a JSON file from the arenas directory.
///
/// Checks env var `KARTWAR_ARENAS_DIR` (default `config/arenas`) for a file named
/// `{size}.json`. Falls back to `generate_arena(size, seed)`.
pub fn load_arena(size: ArenaSize, seed: u64) -> Arena {
    let dir = std::env::var("KARTWAR_ARENAS_DIR").unwrap_or_else(|_| "config/arenas".to_string());
    let path = format!("{dir}/{}.json", size.file_stem());
    load_arena_from_file(&path).unwrap_or_else(|| generate_arena(size, seed))
}

/// Generate a deterministic arena from a size preset and seed.
pub fn generate_arena(size: ArenaSize, seed: u64) -> Arena {
    let (width, height) = match size {
        ArenaSize::Small => (1200.0, 900.0),
        ArenaSize::Default => (1600.0, 1200.0),
        ArenaSize::Large => (2000.0, 1500.0),
    };
    let t = BOUNDARY_THICKNESS;
    let cx = width / 2.0;
    let cy = height / 2.0;

    let mut walls = vec![
        Wall {
            rect: Rect::new(0.0, 0.0, width, t),
            kind: WallKind::Boundary,
        },
        Wall {
            rect: Rect::new(0.0, height - t, width, t),
            kind: WallKind::Boundary,
        },
        Wall {
            rect: Rect::new(0.0, 0.0, t, height),
            kind: WallKind::Boundary,
        },
        Wall {
            rect: Rect::new(width - t, 0.0, t, height),
            kind: WallKind::Boundary,
        },
    ];

    // Four bars around the center, leaving lanes through the middle
    let bar_len = width * 0.18;
    let bar_off = width * 0.2;
    for (x, y, w, h) in [
        (cx - bar_off - bar_len / 2.0, cy - 10.0, bar_len, 20.0),
        (cx + bar_off - bar_len / 2.0, cy - 10.0, bar_len, 20.0),
        (cx - 10.0, cy - bar_off * 0.75 - bar_len / 2.0, 20.0, bar_len),
        (cx - 10.0, cy + bar_off * 0.75 - bar_len / 2.0, 20.0, bar_len),
    ] {
        walls.push(Wall {
            rect: Rect::new(x, y, w, h),
            kind: WallKind::Inner,
        });
    }

    let inset = 80.0;
    let vehicle_spawns = vec![
        SpawnPoint {
            x: inset,
            y: inset,
            angle: 0.785,
        },
        SpawnPoint {
            x: width - inset,
            y: inset,
            angle: 2.356,
        },
        SpawnPoint {
            x: width - inset,
            y: height - inset,
            angle: -2.356,
        },
        SpawnPoint {
            x: inset,
            y: height - inset,
            angle: -0.785,
        },
        SpawnPoint {
            x: cx,
            y: inset,
            angle: std::f32::consts::FRAC_PI_2,
        },
        SpawnPoint {
            x: cx,
            y: height - inset,
            angle: -std::f32::consts::FRAC_PI_2,
        },
        SpawnPoint {
            x: inset,
            y: cy,
            angle: 0.0,
        },
        SpawnPoint {
            x: width - inset,
            y: cy,
            angle: std::f32::consts::PI,
        },
    ];

    let weapon_spawns = vec![
        Vec2::new(width * 0.25, height * 0.25),
        Vec2::new(width * 0.75, height * 0.25),
        Vec2::new(width * 0.25, height * 0.75),
        Vec2::new(width * 0.75, height * 0.75),
        Vec2::new(cx, cy),
    ];
    let powerup_spawns = vec![
        Vec2::new(cx, height * 0.15),
        Vec2::new(cx, height * 0.85),
        Vec2::new(width * 0.12, cy - 120.0),
        Vec2::new(width * 0.88, cy + 120.0),
        Vec2::new(width * 0.4, height * 0.4),
        Vec2::new(width * 0.6, height * 0.6),
    ];

    let mut arena = Arena {
        name: match size {
            ArenaSize::Small => "Small Arena".to_string(),
            ArenaSize::Default => "Default Arena".to_string(),
            ArenaSize::Large => "Large Arena".to_string(),
        },
        width,
        height,
        walls,
        obstacles: Vec::new(),
        vehicle_spawns,
        weapon_spawns,
        powerup_spawns,
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let scale = width / 1600.0;
    let pillars = (4.0 * scale).round() as usize;
    let crates = (10.0 * scale).round() as usize;
    let barrels = (5.0 * scale).round() as usize;

    for _ in 0..pillars {
        place_obstacle(&mut arena, &mut rng, 50.0, Obstacle::pillar);
    }
    for _ in 0..crates {
        place_obstacle(&mut arena, &mut rng, 40.0, |rect| {
            Obstacle::crate_box(rect, 60.0)
        });
    }
    for _ in 0..barrels {
        place_obstacle(&mut arena, &mut rng, 30.0, |rect| {
            Obstacle::barrel(
                rect,
                30.0,
                ExplosivePayload {
                    radius: 100.0,
                    damage: 40.0,
                    knockback: 160.0,
                },
            )
        });
    }

    arena
}

/// Try random positions until one is clear of walls, obstacles and spawns.
fn place_obstacle(
    arena: &mut Arena,
    rng: &mut StdRng,
    size: f32,
    make: impl Fn(Rect) -> Obstacle,
) {
    let margin = BOUNDARY_THICKNESS + SPAWN_CLEARANCE;
    for _ in 0..PLACEMENT_ATTEMPTS {
        let x = rng.random_range(margin..arena.width - margin - size);
        let y = rng.random_range(margin..arena.height - margin - size);
        let rect = Rect::new(x, y, size, size);
        let padded = Rect::new(x - 20.0, y - 20.0, size + 40.0, size + 40.0);

        let hits_wall = arena.walls.iter().any(|w| rects_overlap(&padded, &w.rect));
        let hits_obstacle = arena
            .obstacles
            .iter()
            .any(|o| rects_overlap(&padded, &o.rect));
        let near_spawn = arena
            .vehicle_spawns
            .iter()
            .map(SpawnPoint::position)
            .chain(arena.weapon_spawns.iter().copied())
            .chain(arena.powerup_spawns.iter().copied())
            .any(|p| circle_rect_overlap(p, SPAWN_CLEARANCE, &rect));

        if !hits_wall && !hits_obstacle && !near_spawn {
            let mut obstacle = make(rect);
            obstacle.id = arena.obstacles.len() as u32;
            arena.obstacles.push(obstacle);
            return;
        }
    }
}
