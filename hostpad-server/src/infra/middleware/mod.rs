pub mod access_gate;

pub use access_gate::access_gate;
