//! Settings store access

use crate::config::AxisSettings;

/// Read access to the machine settings a driver needs
///
/// Values are read on demand, so a driver always sees the current settings
/// when it re-applies them.
pub trait AxisConfigProvider {
    /// Current settings of axis `axis` (0..MAX_AXES)
    fn axis_settings(&self, axis: usize) -> AxisSettings;

    /// Homing feed rate in units/min
    fn homing_feed_rate(&self) -> f32;
}
