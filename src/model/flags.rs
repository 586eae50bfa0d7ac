use bitflags::bitflags;

bitflags! {
    /// Playback modifiers of [`ModelInstance::set_animation`](crate::model::ModelInstance::set_animation).
    ///
    /// `PERIOD` carries a start percentage in bits 16 and up; build it with
    /// [`AnimationFlags::period`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AnimationFlags: u32 {
        /// Play once, then hold the given frame.
        const STAY = 0x01;
        /// Play once, then hold the last frame.
        const ONE_TIME = 0x02;
        /// Start from the percentage stored in the high bits.
        const PERIOD = 0x04;
        /// Switch without cross-fading.
        const NO_SMOOTH = 0x08;
        /// Reset to the default layer state and the first clip.
        const INIT = 0x10;
        /// Keep the current facing; direction changes apply when the flag clears.
        const NO_ROTATE = 0x40;
    }
}

impl AnimationFlags {
    /// `PERIOD` flag starting playback at `percent` of the clip.
    #[must_use]
    pub fn period(percent: u32) -> Self {
        Self::from_bits_retain(Self::PERIOD.bits() | (percent << 16))
    }

    /// Start percentage packed by [`period`](Self::period).
    #[must_use]
    pub fn period_percent(self) -> Option<f32> {
        self.contains(Self::PERIOD).then(|| (self.bits() >> 16) as f32)
    }
}
