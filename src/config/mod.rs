mod loader;

pub use loader::{Config, SynthesisConfig};
