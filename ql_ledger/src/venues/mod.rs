//! Per-venue quota presets
//!
//! Factory functions describing the limits and usage-header conventions of
//! the venues this client talks to, used to seed the registry when the
//! venue offers no discovery call and to name headers when it does.

pub mod binance;
