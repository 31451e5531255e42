//! Startup sequencing: states, the host seam and the sequencer.

mod host;
mod sequencer;
mod state;

pub use host::{StartupHost, TracingHost, TypesetRequest};
pub use sequencer::{ReadySignal, StartupSequencer};
pub use state::StartupState;
