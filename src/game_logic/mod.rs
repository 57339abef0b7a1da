pub mod damage;
pub mod errors;
pub mod movement;

pub use damage::*;
pub use movement::*;
