//! Real-time surveillance link: media encoding, frame capture, audio
//! playback scheduling and the bidirectional session controller.

pub mod capture;
pub mod classify;
pub mod codec;
pub mod playback;
pub mod session;
pub mod transport;

pub use capture::SyntheticFeed;
pub use session::{LiveSessionController, SessionState};
