//! Device services for the terminal: permissions come from `--grant`, the
//! position and picked files come from chat commands.

use std::cell::RefCell;
use std::path::Path;

use chatronix_core::actions::{Coordinates, Device, Permission, PermissionStatus, PickedAsset};
use chatronix_core::session::Notifier;

/// Prints notices to stdout.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        println!("* {message}");
    }
}

pub struct TerminalDevice {
    granted: Vec<Permission>,
    position: RefCell<Option<Coordinates>>,
    asset: RefCell<Option<PickedAsset>>,
}

impl TerminalDevice {
    pub fn new(granted: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
            position: RefCell::new(None),
            asset: RefCell::new(None),
        }
    }

    /// Position reported by the next location request.
    pub fn set_position(&self, coordinates: Coordinates) {
        self.position.replace(Some(coordinates));
    }

    /// File returned by the next library pick or camera capture.
    pub fn set_asset(&self, path: &Path) {
        self.asset
            .replace(Some(PickedAsset::new(path.to_string_lossy())));
    }
}

impl Notifier for TerminalDevice {
    fn notify(&self, message: &str) {
        TerminalNotifier.notify(message);
    }
}

impl Device for TerminalDevice {
    async fn request_permission(&self, permission: Permission) -> PermissionStatus {
        if self.granted.contains(&permission) {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    async fn current_position(&self) -> chatronix_core::Result<Option<Coordinates>> {
        Ok(self.position.take())
    }

    async fn pick_from_library(&self) -> chatronix_core::Result<Option<PickedAsset>> {
        Ok(self.asset.take())
    }

    async fn capture_photo(&self) -> chatronix_core::Result<Option<PickedAsset>> {
        Ok(self.asset.take())
    }

    async fn read_asset(&self, asset: &PickedAsset) -> chatronix_core::Result<Vec<u8>> {
        Ok(tokio::fs::read(&asset.uri).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn grants_control_permissions() {
        let device = TerminalDevice::new([Permission::Camera]);
        assert_eq!(
            device.request_permission(Permission::Camera).await,
            PermissionStatus::Granted
        );
        assert_eq!(
            device.request_permission(Permission::Location).await,
            PermissionStatus::Denied
        );
    }

    #[tokio::test]
    async fn staged_asset_is_consumed_once() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("photo.png");
        std::fs::write(&path, b"png").unwrap();
        let device = TerminalDevice::new([]);

        device.set_asset(&path);
        let asset = device.pick_from_library().await.unwrap().unwrap();
        assert_eq!(device.read_asset(&asset).await.unwrap(), b"png".to_vec());
        assert!(device.capture_photo().await.unwrap().is_none());
    }
}
