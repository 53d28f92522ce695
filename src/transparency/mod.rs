//! Transparency module.
//!
//! Exposes what the tracker processed and discarded so users can see that
//! only derived labels are kept.

pub mod log;

pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
