use uuid::Uuid;

use crate::{config, utils};

/// Device identity presented to the mobile API. Built once and injected into
/// the client; nothing mutates it after construction.
///
/// The hardware constants describe a OnePlus 6T running the app version this
/// client speaks. `client_session_id` is minted fresh per process, the
/// android id stays stable per account so the platform keeps seeing the same
/// device.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub app_version: String,
    pub android_version: u32,
    pub android_release: String,
    pub dpi: String,
    pub resolution: String,
    pub manufacturer: String,
    pub device: String,
    pub model: String,
    pub cpu: String,
    pub version_code: String,
    pub locale: String,
    pub phone_id: String,
    pub device_uuid: String,
    pub client_session_id: String,
    pub android_id: String,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        let device_uuid = "8aa373c6-f316-44d7-b49e-d74563f4a8f3".to_string();
        let android_id = utils::android_device_id(&device_uuid);
        DeviceProfile {
            app_version: "269.0.0.18.75".to_string(),
            android_version: 26,
            android_release: "8.0.0".to_string(),
            dpi: "480dpi".to_string(),
            resolution: "1080x1920".to_string(),
            manufacturer: "OnePlus".to_string(),
            device: "OnePlus6T".to_string(),
            model: "ONEPLUS A6013".to_string(),
            cpu: "qcom".to_string(),
            version_code: "314665256".to_string(),
            locale: "en_US".to_string(),
            phone_id: "57d64c41-a916-3fa5-bd7a-3796c1dab122".to_string(),
            device_uuid,
            client_session_id: Uuid::new_v4().to_string(),
            android_id,
        }
    }
}

impl DeviceProfile {
    /// Default hardware with the android id taken from the environment
    /// override when configured.
    pub fn new() -> Self {
        let mut profile = DeviceProfile::default();
        if let Some(id) = config::android_id_override() {
            profile.android_id = id;
        }
        profile
    }

    /// Ties the android id to an account seed (username or account id), so
    /// re-auth and later runs present the same device. The environment
    /// override still wins.
    pub fn with_seed(mut self, seed: &str) -> Self {
        if config::android_id_override().is_none() {
            self.android_id = utils::android_device_id(seed);
        }
        self
    }

    /// Mobile app user agent string matching the hardware constants.
    pub fn user_agent(&self) -> String {
        format!(
            "Instagram {} Android ({}/{}; {}; {}; {}; {}; {}; {}; {}; {})",
            self.app_version,
            self.android_version,
            self.android_release,
            self.dpi,
            self.resolution,
            self.manufacturer,
            self.model,
            self.device,
            self.cpu,
            self.locale,
            self.version_code
        )
    }
}
