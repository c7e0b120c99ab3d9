pub mod bomb;
pub mod door;
pub mod event;
pub mod level;
pub mod obstacle;
pub mod spring;
pub mod step;
pub mod world;
