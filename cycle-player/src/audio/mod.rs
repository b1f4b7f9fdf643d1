//! Audio output handle, object URL lifetime, and the simulated device

pub mod object_url;
pub mod output;
pub mod resources;
pub mod simulated;

pub use object_url::{MemoryObjectUrls, ObjectUrlFactory};
pub use output::{AudioOutput, OutputEvent};
pub use resources::{AudioResourceManager, PreparedSource};
pub use simulated::{SimBehavior, SimulatedOutput};
