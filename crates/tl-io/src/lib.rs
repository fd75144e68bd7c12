//! Output sinks for tickline.

mod log;
mod message;
mod recording;
mod ring;

pub use log::LogOutput;
pub use message::{Message, Stamped};
pub use recording::{Recording, RecordingOutput};
pub use ring::{RingOutput, RingReceiver};
