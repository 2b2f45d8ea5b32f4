//! Motion pipeline status

/// Live status from the step generator
pub trait MotionStatusProvider {
    /// Current realtime feed rate in units/min
    fn realtime_rate(&self) -> f32;
}
