pub mod attributes;
pub mod classify;
pub mod delta;
pub mod events;
pub mod graph;
pub mod lifting;
pub mod mapping;
pub mod propagate;
pub mod state;
pub mod types;
