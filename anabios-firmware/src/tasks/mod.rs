//! Embassy async tasks
//!
//! The lifecycle task owns the orchestrator; the others feed it events
//! through the channels module.

pub mod button;
pub mod debounce;
pub mod lifecycle;
pub mod link;
pub mod radio;

pub use button::button_task;
pub use debounce::debounce_task;
pub use lifecycle::lifecycle_task;
pub use link::link_task;
pub use radio::{net_task, wifi_task};
