//! GATT profile of the recording device.
//!
//! The device exposes one primary service with two characteristics. Audio
//! packets arrive as notifications on [`AUDIO_DATA_CHARACTERISTIC_UUID`].

use serde::Serialize;
use uuid::Uuid;

/// Primary audio service.
pub const AUDIO_SERVICE_UUID: Uuid = Uuid::from_u128(0x19b10000_e8f2_537e_4f6c_d104768a1214);
/// Notify characteristic carrying audio packets.
pub const AUDIO_DATA_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x19b10001_e8f2_537e_4f6c_d104768a1214);
/// Characteristic describing the codec in use.
pub const AUDIO_CODEC_CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x19b10002_e8f2_537e_4f6c_d104768a1214);

/// Sample rate of the device microphone.
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;
/// Channel count of the device microphone.
pub const DEFAULT_CHANNELS: u16 = 1;

/// Prefix of recording file names, followed by a timestamp.
pub const RECORDING_PREFIX: &str = "recording_";

/// The profile as a serializable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceProfile {
    pub service: Uuid,
    pub audio_data: Uuid,
    pub audio_codec: Uuid,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DeviceProfile {
    /// Returns the profile of the recording device.
    pub const fn recorder() -> Self {
        Self {
            service: AUDIO_SERVICE_UUID,
            audio_data: AUDIO_DATA_CHARACTERISTIC_UUID,
            audio_codec: AUDIO_CODEC_CHARACTERISTIC_UUID,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_text() {
        assert_eq!(AUDIO_SERVICE_UUID.to_string(), "19b10000-e8f2-537e-4f6c-d104768a1214");
        assert_eq!(
            AUDIO_DATA_CHARACTERISTIC_UUID.to_string(),
            "19b10001-e8f2-537e-4f6c-d104768a1214"
        );
        assert_eq!(
            AUDIO_CODEC_CHARACTERISTIC_UUID.to_string(),
            "19b10002-e8f2-537e-4f6c-d104768a1214"
        );
    }

    #[test]
    fn test_profile_serializes() {
        let json = serde_json::to_value(DeviceProfile::recorder()).unwrap();
        assert_eq!(json["service"], "19b10000-e8f2-537e-4f6c-d104768a1214");
        assert_eq!(json["sample_rate"], 16000);
        assert_eq!(json["channels"], 1);
    }
}
