pub mod actions;
pub mod assets;
pub mod shout;
