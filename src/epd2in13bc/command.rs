//! SPI Commands for the Waveshare 2.13" (B/C) E-Ink Display
use crate::traits;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Command {
    PanelSetting = 0x00,

    PowerOff = 0x02,
    PowerOn = 0x04,
    BoosterSoftStart = 0x06,
    DeepSleep = 0x07,
    /// black plane
    DataStartTransmission1 = 0x10,
    DisplayRefresh = 0x12,
    /// red plane
    DataStartTransmission2 = 0x13,

    VcomAndDataIntervalSetting = 0x50,
    ResolutionSetting = 0x61,
    DataStop = 0x92,
}

impl traits::Command for Command {
    /// Returns the address of the command
    fn address(self) -> u8 {
        self as u8
    }
}
