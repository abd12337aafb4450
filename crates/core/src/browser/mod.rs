//! Browser driving for interactive login.

mod cdp;
mod launch;

pub use cdp::CdpConnection;
pub use launch::{Browser, default_profile_dir};
