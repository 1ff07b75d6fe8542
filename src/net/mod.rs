//! Frame transport: the strand data wire format, the frame decoder, and the
//! UDP tasks that receive and send it.

pub mod decoder;
pub mod pattern;
pub mod protocol;
pub mod receiver;
pub mod stats;

pub use decoder::{DecoderStats, Frame};
pub use receiver::start_receiver;
