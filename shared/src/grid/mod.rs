mod occupancy;
mod slot;

pub use occupancy::GridOccupancyIndex;
pub use slot::Slot;
