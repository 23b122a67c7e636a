pub mod loaders;
pub mod preprocessing;
pub mod splits;

pub use loaders::*;
pub use preprocessing::*;
pub use splits::*;
