//! Headless model of the farm: where the player stands, where the camera looks and which
//! props are close enough to use. Renderers read `WorldState`; nothing here draws.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::PropSpec;
use crate::config::WorldConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit step on the ground plane. Forward walks toward the house (-z).
    pub fn step(self) -> Vec3 {
        match self {
            Direction::Forward => Vec3::NEG_Z,
            Direction::Backward => Vec3::Z,
            Direction::Left => Vec3::NEG_X,
            Direction::Right => Vec3::X,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
        })
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" | "f" => Ok(Direction::Forward),
            "backward" | "back" | "b" => Ok(Direction::Backward),
            "left" | "l" => Ok(Direction::Left),
            "right" | "r" => Ok(Direction::Right),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraRig {
    pub position: Vec3,
    pub look_at: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub player: Vec3,
    pub camera: CameraRig,
    /// Indices (into the current stage's props) within interaction range.
    pub highlighted: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldModel {
    config: WorldConfig,
}

impl WorldModel {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn spawn(&self) -> WorldState {
        let player = self.config.player_spawn;
        WorldState {
            player,
            camera: self.camera_for(player),
            highlighted: Vec::new(),
        }
    }

    /// Moves one step of `player_speed`, keeping the player inside the fence.
    pub fn move_player(&self, world: &mut WorldState, direction: Direction) {
        let limit = self.config.half_extent;
        let mut next = world.player + direction.step() * self.config.player_speed;
        next.x = next.x.clamp(-limit, limit);
        next.z = next.z.clamp(-limit, limit);
        world.player = next;
        world.camera = self.camera_for(next);
        debug!(%direction, x = next.x, z = next.z, "player moved");
    }

    pub fn camera_for(&self, player: Vec3) -> CameraRig {
        let offset = self.config.camera_offset;
        CameraRig {
            position: Vec3::new(player.x, offset.y, player.z + offset.z),
            look_at: player,
        }
    }

    /// Indices of props strictly closer than the interaction distance.
    pub fn props_in_range(&self, world: &WorldState, props: &[PropSpec]) -> Vec<usize> {
        props
            .iter()
            .enumerate()
            .filter(|(_, prop)| world.player.distance(prop.position) < self.config.interaction_distance)
            .map(|(i, _)| i)
            .collect()
    }

    /// The nearest prop in range, if any.
    pub fn closest_prop_in_range<'p>(
        &self,
        world: &WorldState,
        props: &'p [PropSpec],
    ) -> Option<(usize, &'p PropSpec)> {
        let mut best: Option<(usize, &'p PropSpec)> = None;
        let mut best_distance = self.config.interaction_distance;
        for (i, prop) in props.iter().enumerate() {
            let distance = world.player.distance(prop.position);
            if distance < best_distance {
                best_distance = distance;
                best = Some((i, prop));
            }
        }
        best
    }

    pub fn refresh(&self, world: &mut WorldState, props: &[PropSpec]) {
        world.highlighted = self.props_in_range(world, props);
        world.camera = self.camera_for(world.player);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub position: Vec3,
    pub size: Vec3,
    pub wall_rgb: u32,
    pub roof_rgb: u32,
}

/// Static scenery shared by every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmLayout {
    pub ground_size: f32,
    pub house: Building,
    pub fence_posts: Vec<Vec3>,
}

impl FarmLayout {
    pub fn standard() -> Self {
        Self {
            ground_size: 100.0,
            house: Building {
                position: Vec3::new(0.0, 2.0, -15.0),
                size: Vec3::new(8.0, 4.0, 6.0),
                wall_rgb: 0x8B4513,
                roof_rgb: 0xFFD700,
            },
            fence_posts: (-10..=10)
                .map(|i| Vec3::new(i as f32 * 2.0, 1.0, 20.0))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PropKind;

    fn model() -> WorldModel {
        WorldModel::new(WorldConfig::default())
    }

    fn apple_at(x: f32, z: f32) -> PropSpec {
        PropSpec::new(PropKind::InfectedApple, Vec3::new(x, 0.75, z))
    }

    #[test]
    fn spawn_places_player_and_camera_behind_it() {
        let world = model().spawn();
        assert_eq!(world.player, Vec3::new(0.0, 0.75, 10.0));
        assert_eq!(world.camera.position, Vec3::new(0.0, 5.0, 20.0));
        assert_eq!(world.camera.look_at, world.player);
    }

    #[test]
    fn movement_steps_by_speed_and_clamps_to_fence() {
        let model = model();
        let mut world = model.spawn();
        model.move_player(&mut world, Direction::Forward);
        assert!((world.player.z - 9.9).abs() < 1e-5);
        model.move_player(&mut world, Direction::Right);
        assert!((world.player.x - 0.1).abs() < 1e-5);

        world.player = Vec3::new(39.95, 0.75, -39.95);
        model.move_player(&mut world, Direction::Right);
        model.move_player(&mut world, Direction::Forward);
        assert_eq!(world.player.x, 40.0);
        assert_eq!(world.player.z, -40.0);
        assert_eq!(world.camera.position.z, -30.0);
    }

    #[test]
    fn closest_prop_prefers_nearest_within_radius() {
        let model = model();
        let mut world = model.spawn();
        world.player = Vec3::new(0.0, 0.75, 0.0);
        let props = [apple_at(2.5, 0.0), apple_at(1.0, 0.0), apple_at(10.0, 0.0)];

        let (index, _) = model.closest_prop_in_range(&world, &props).expect("prop in range");
        assert_eq!(index, 1);
        assert_eq!(model.props_in_range(&world, &props), vec![0, 1]);
    }

    #[test]
    fn radius_is_exclusive() {
        let model = model();
        let mut world = model.spawn();
        world.player = Vec3::new(0.0, 0.75, 0.0);
        let props = [apple_at(3.0, 0.0)];
        assert!(model.closest_prop_in_range(&world, &props).is_none());
    }

    #[test]
    fn direction_parses_long_and_short_names() {
        assert_eq!("Forward".parse::<Direction>(), Ok(Direction::Forward));
        assert_eq!("b".parse::<Direction>(), Ok(Direction::Backward));
        assert!("up".parse::<Direction>().is_err());
    }

    #[test]
    fn farm_layout_has_fence_posts_every_two_units() {
        let layout = FarmLayout::standard();
        assert_eq!(layout.fence_posts.len(), 21);
        assert_eq!(layout.fence_posts[0], Vec3::new(-20.0, 1.0, 20.0));
        assert_eq!(layout.fence_posts[20], Vec3::new(20.0, 1.0, 20.0));
    }
}
