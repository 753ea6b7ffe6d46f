//! Multiplexed framing used for every byte after the session seed.

mod frame;
mod io;
mod reader;

pub use frame::MessageFrame;
pub use io::{recv_msg, send_msg};
pub use reader::MplexReader;
