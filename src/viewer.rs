use reef_geom::Vec3;
use reef_world::{ColumnCoord, World};

/// Headless stand-in for the player: moves along a heading through open water.
#[derive(Clone, Debug)]
pub struct Viewer {
    position: Vec3,
    column: ColumnCoord,
    chunk_size: Vec3,
    /// Horizontal unit heading.
    pub heading: Vec3,
    /// World units per second.
    pub speed: f32,
    pub blocked_moves: u64,
}

impl Viewer {
    pub fn new(position: Vec3, chunk_size: Vec3, heading_deg: f32, speed: f32) -> Self {
        let rad = heading_deg.to_radians();
        Self {
            position,
            column: ColumnCoord::from_world(position.x, position.z, chunk_size),
            chunk_size,
            heading: Vec3::new(rad.cos(), 0.0, rad.sin()),
            speed,
            blocked_moves: 0,
        }
    }

    /// Spawns a little above the seabed at the center of column `(0, 0)`.
    pub fn spawn(world: &World, heading_deg: f32, speed: f32) -> Self {
        let size = world.chunk_size;
        let (x, z) = (0.5 * size.x, 0.5 * size.z);
        let ceiling = world.surface_height() - 0.5;
        let y = (world.seabed_height(x, z) + 0.25 * size.y).min(ceiling);
        Self::new(Vec3::new(x, y, z), size, heading_deg, speed)
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    #[inline]
    pub fn column(&self) -> ColumnCoord {
        self.column
    }

    /// Moves the viewer. Returns the new column when a column boundary was crossed.
    pub fn set_position(&mut self, p: Vec3) -> Option<ColumnCoord> {
        self.position = p;
        let col = ColumnCoord::from_world(p.x, p.z, self.chunk_size);
        if col != self.column {
            self.column = col;
            Some(col)
        } else {
            None
        }
    }

    /// Steps along the heading. Rock ahead turns the viewer a quarter turn instead.
    pub fn advance(&mut self, dt: f32, world: &World) -> Option<ColumnCoord> {
        if self.speed <= 0.0 || dt <= 0.0 {
            return None;
        }
        let mut next = self.position + self.heading * (self.speed * dt);
        next.y = next.y.min(world.surface_height() - 0.5);
        let here_open = world.can_occupy(self.position);
        if here_open && !world.can_occupy(next) {
            self.blocked_moves += 1;
            self.heading = Vec3::new(-self.heading.z, 0.0, self.heading.x);
            return None;
        }
        self.set_position(next)
    }
}
