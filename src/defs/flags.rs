use bitflags::bitflags;

bitflags! {
    /// How a screen item's `scaleX`/`scaleY` are interpreted.
    ///
    /// Only the low two bits of the `scaleSignal` property are meaningful;
    /// anything above is masked off when the object is read.
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ScaleSignals: u8 {
        // scaleX / scaleY are used as-is (128 = 100 %).
        const MANUAL          = 0x01;
        // Scale derived from the plane's vanishing point and `maxScale`.
        const VANISHING_POINT = 0x02;
    }
}

impl ScaleSignals {
    /// Decode a raw property value, keeping the two meaningful bits.
    pub fn from_property(value: i32) -> Self {
        Self::from_bits_truncate((value & 3) as u8)
    }
}
