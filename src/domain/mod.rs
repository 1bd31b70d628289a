//! Protocol-independent cube model: notation, state simulation, move
//! counter tracking and orientation.

pub mod cube_state;
pub mod events;
pub mod moves;
pub mod orientation;
pub mod search;
pub mod settings;
pub mod tracker;
