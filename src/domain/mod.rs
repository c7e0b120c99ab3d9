pub mod darkness;
pub mod entity;
pub mod room;
pub mod rules;
pub mod tile;
