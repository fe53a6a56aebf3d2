//! Ready-made controls for common movement and lifetime behaviors.

mod circular;
mod expire;
mod projectile;

pub use circular::CircularMovementControl;
pub use expire::ExpireCleanControl;
pub use projectile::ProjectileControl;
