mod aabb;
mod packet;
mod ray;
mod triangle;

pub use aabb::Aabb;
pub use packet::{ImageLocation, RayGroup, RayPacket, RAYS_PER_GROUP};
pub use ray::{HitPoint, HitPoint8, Ray, Ray8, INVALID_OBJECT, LIGHT_OBJECT};
pub use triangle::{intersect_triangle, intersect_triangle8, ProcessedTriangle, Triangle8};
