//! Attachment flows: share the current location, or send a picked or
//! captured image.

use std::path::Path;

use chrono::Utc;
use thiserror::Error;

use crate::models::{Attachment, Author, Message};
use crate::session::Notifier;
use crate::storage::{attachment_object_path, ObjectStore};
use crate::store::MessageStore;
use crate::sync::{Outbox, SendError};

pub const PERMISSION_DENIED_NOTICE: &str = "Permissions haven't been granted.";
pub const LOCATION_FAILED_NOTICE: &str = "Error occurred while fetching location.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Location,
    MediaLibrary,
    Camera,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// An image chosen from the library or captured by the camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedAsset {
    pub uri: String,
    pub content_type: Option<String>,
}

impl PickedAsset {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            content_type: None,
        }
    }

    /// Lowercased file extension of the asset URI, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.uri)
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
    }

    fn resolved_content_type(&self) -> Option<String> {
        if let Some(content_type) = &self.content_type {
            return Some(content_type.clone());
        }
        let content_type = match self.extension()?.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            _ => return None,
        };
        Some(content_type.to_string())
    }
}

/// Device services used by the attachment flows (async)
#[allow(async_fn_in_trait)]
pub trait Device: Notifier {
    async fn request_permission(&self, permission: Permission) -> PermissionStatus;

    /// Current position. `Ok(None)` when the device has no fix.
    async fn current_position(&self) -> crate::Result<Option<Coordinates>>;

    /// `Ok(None)` when the user cancels the picker.
    async fn pick_from_library(&self) -> crate::Result<Option<PickedAsset>>;

    /// `Ok(None)` when the user dismisses the camera.
    async fn capture_photo(&self) -> crate::Result<Option<PickedAsset>>;

    async fn read_asset(&self, asset: &PickedAsset) -> crate::Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Sent,
    Cancelled,
    PermissionDenied,
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Send(#[from] SendError),
    #[error("Image upload failed: {0}")]
    Upload(#[source] crate::Error),
    #[error("Failed to read picked image: {0}")]
    Asset(#[source] crate::Error),
    #[error("Failed to fetch location: {0}")]
    Location(#[source] crate::Error),
}

pub type ActionResult = Result<ActionOutcome, ActionError>;

pub struct AttachmentActions<S: MessageStore, O: ObjectStore, D: Device> {
    outbox: Outbox<S>,
    objects: Option<O>,
    device: D,
    author: Author,
}

impl<S: MessageStore, O: ObjectStore, D: Device> AttachmentActions<S, O, D> {
    /// `objects` is `None` when no object storage is configured; image flows
    /// then fail at the upload step.
    pub const fn new(outbox: Outbox<S>, objects: Option<O>, device: D, author: Author) -> Self {
        Self {
            outbox,
            objects,
            device,
            author,
        }
    }

    pub const fn device(&self) -> &D {
        &self.device
    }

    pub const fn outbox(&self) -> &Outbox<S> {
        &self.outbox
    }

    pub async fn send_location(&self) -> ActionResult {
        if !self.permitted(Permission::Location).await {
            return Ok(ActionOutcome::PermissionDenied);
        }

        let position = match self.device.current_position().await {
            Ok(position) => position,
            Err(error) => {
                tracing::error!("Failed to fetch location: {}", error);
                self.device.notify(LOCATION_FAILED_NOTICE);
                return Err(ActionError::Location(error));
            }
        };
        let Some(Coordinates {
            latitude,
            longitude,
        }) = position
        else {
            tracing::warn!("No location fix available");
            self.device.notify(LOCATION_FAILED_NOTICE);
            return Ok(ActionOutcome::Cancelled);
        };

        let message = Message::with_attachment(
            self.author.clone(),
            Attachment::Location {
                latitude,
                longitude,
            },
        );
        self.outbox.send(message).await?;
        Ok(ActionOutcome::Sent)
    }

    pub async fn pick_image(&self) -> ActionResult {
        if !self.permitted(Permission::MediaLibrary).await {
            return Ok(ActionOutcome::PermissionDenied);
        }
        let picked = self
            .device
            .pick_from_library()
            .await
            .map_err(ActionError::Asset)?;
        self.send_asset(picked).await
    }

    pub async fn take_photo(&self) -> ActionResult {
        if !self.permitted(Permission::Camera).await {
            return Ok(ActionOutcome::PermissionDenied);
        }
        let captured = self
            .device
            .capture_photo()
            .await
            .map_err(ActionError::Asset)?;
        self.send_asset(captured).await
    }

    async fn permitted(&self, permission: Permission) -> bool {
        match self.device.request_permission(permission).await {
            PermissionStatus::Granted => true,
            PermissionStatus::Denied => {
                tracing::info!("{:?} permission denied", permission);
                self.device.notify(PERMISSION_DENIED_NOTICE);
                false
            }
        }
    }

    async fn send_asset(&self, asset: Option<PickedAsset>) -> ActionResult {
        let Some(asset) = asset else {
            return Ok(ActionOutcome::Cancelled);
        };
        let bytes = self
            .device
            .read_asset(&asset)
            .await
            .map_err(ActionError::Asset)?;

        let url = self.upload(&asset, &bytes).await.map_err(|error| {
            tracing::error!("Failed to upload {}: {}", asset.uri, error);
            ActionError::Upload(error)
        })?;

        let message = Message::with_attachment(self.author.clone(), Attachment::Image { url });
        self.outbox.send(message).await?;
        Ok(ActionOutcome::Sent)
    }

    async fn upload(&self, asset: &PickedAsset, bytes: &[u8]) -> crate::Result<String> {
        let objects = self.objects.as_ref().ok_or_else(|| {
            crate::Error::Storage("Object storage is not configured".to_string())
        })?;
        let extension = asset.extension();
        let path = attachment_object_path(
            &self.author.id,
            Utc::now().timestamp_millis(),
            extension.as_deref(),
        );
        let content_type = asset.resolved_content_type();
        let object = objects
            .upload(&path, bytes, content_type.as_deref())
            .await?;
        objects.download_url(&object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::error::Result;
    use crate::storage::{MemoryObjectStore, ObjectRef};
    use crate::store::MemoryMessageStore;
    use crate::sync::SyncController;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct FakeDevice {
        granted: Vec<Permission>,
        position: Option<Coordinates>,
        fail_position: bool,
        asset: Option<PickedAsset>,
        notices: Arc<Mutex<Vec<String>>>,
    }

    impl FakeDevice {
        fn notices(&self) -> Vec<String> {
            self.notices.lock().unwrap().clone()
        }
    }

    impl Notifier for FakeDevice {
        fn notify(&self, message: &str) {
            self.notices.lock().unwrap().push(message.to_string());
        }
    }

    impl Device for FakeDevice {
        async fn request_permission(&self, permission: Permission) -> PermissionStatus {
            if self.granted.contains(&permission) {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            }
        }

        async fn current_position(&self) -> Result<Option<Coordinates>> {
            if self.fail_position {
                return Err(crate::Error::InvalidInput("gps unavailable".to_string()));
            }
            Ok(self.position)
        }

        async fn pick_from_library(&self) -> Result<Option<PickedAsset>> {
            Ok(self.asset.clone())
        }

        async fn capture_photo(&self) -> Result<Option<PickedAsset>> {
            Ok(self.asset.clone())
        }

        async fn read_asset(&self, _asset: &PickedAsset) -> Result<Vec<u8>> {
            Ok(vec![0x89, b'P', b'N', b'G'])
        }
    }

    /// Accepts every upload and serves it from one fixed URL.
    #[derive(Default)]
    struct FixedUrlStore {
        uploads: AtomicUsize,
        paths: Mutex<Vec<String>>,
    }

    impl ObjectStore for FixedUrlStore {
        async fn upload(
            &self,
            path: &str,
            _bytes: &[u8],
            _content_type: Option<&str>,
        ) -> Result<ObjectRef> {
            self.uploads.fetch_add(1, Ordering::SeqCst);
            self.paths.lock().unwrap().push(path.to_string());
            Ok(ObjectRef {
                key: path.to_string(),
            })
        }

        fn download_url(&self, _object: &ObjectRef) -> Result<String> {
            Ok("https://x/y.png".to_string())
        }
    }

    async fn connected_outbox() -> (
        SyncController<MemoryMessageStore, MemoryCache>,
        MemoryMessageStore,
    ) {
        let store = MemoryMessageStore::new();
        let mut controller = SyncController::new(Some(store.clone()), MemoryCache::new());
        controller.apply_connectivity(true).await;
        (controller, store)
    }

    fn author() -> Author {
        Author::new("user-42", "Ada")
    }

    #[tokio::test]
    async fn location_denied_sends_nothing() {
        let (controller, store) = connected_outbox().await;
        let device = FakeDevice::default();
        let actions = AttachmentActions::new(
            controller.outbox(),
            None::<MemoryObjectStore>,
            device.clone(),
            author(),
        );

        let outcome = actions.send_location().await.unwrap();

        assert_eq!(outcome, ActionOutcome::PermissionDenied);
        assert!(store.appended().is_empty());
        assert!(controller.current_messages().is_empty());
        assert_eq!(device.notices(), vec![PERMISSION_DENIED_NOTICE]);
    }

    #[tokio::test]
    async fn location_granted_sends_coordinates() {
        let (controller, store) = connected_outbox().await;
        let device = FakeDevice {
            granted: vec![Permission::Location],
            position: Some(Coordinates {
                latitude: 48.85,
                longitude: 2.35,
            }),
            ..FakeDevice::default()
        };
        let actions =
            AttachmentActions::new(controller.outbox(), None::<MemoryObjectStore>, device, author());

        assert_eq!(actions.send_location().await.unwrap(), ActionOutcome::Sent);

        let appended = store.appended();
        assert_eq!(appended.len(), 1);
        let record = &appended[0].1;
        assert_eq!(record.text, "");
        assert_eq!(record.location.map(|l| l.latitude), Some(48.85));
        assert!(record
            .client_id
            .as_deref()
            .is_some_and(|id| id.chars().all(|c| c.is_ascii_digit())));
    }

    #[tokio::test]
    async fn location_failure_notifies_and_sends_nothing() {
        let (controller, store) = connected_outbox().await;
        let device = FakeDevice {
            granted: vec![Permission::Location],
            fail_position: true,
            ..FakeDevice::default()
        };
        let actions = AttachmentActions::new(
            controller.outbox(),
            None::<MemoryObjectStore>,
            device.clone(),
            author(),
        );

        assert!(matches!(
            actions.send_location().await,
            Err(ActionError::Location(_))
        ));
        assert!(store.appended().is_empty());
        assert_eq!(device.notices(), vec![LOCATION_FAILED_NOTICE]);
    }

    #[tokio::test]
    async fn picked_image_is_uploaded_then_sent_once() {
        let (controller, store) = connected_outbox().await;
        let device = FakeDevice {
            granted: vec![Permission::MediaLibrary],
            asset: Some(PickedAsset::new("/photos/IMG_0001.PNG")),
            ..FakeDevice::default()
        };
        let objects = FixedUrlStore::default();
        let actions = AttachmentActions::new(controller.outbox(), Some(objects), device, author());

        assert_eq!(actions.pick_image().await.unwrap(), ActionOutcome::Sent);

        let appended = store.appended();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].1.text, "");
        assert_eq!(appended[0].1.image.as_deref(), Some("https://x/y.png"));
        assert!(appended[0].1.location.is_none());

        let objects = actions.objects.as_ref().unwrap();
        assert_eq!(objects.uploads.load(Ordering::SeqCst), 1);
        let path = objects.paths.lock().unwrap()[0].clone();
        assert!(path.ends_with("-user-42.png"), "unexpected path {path}");
    }

    #[tokio::test]
    async fn camera_denied_skips_upload() {
        let (controller, store) = connected_outbox().await;
        let device = FakeDevice {
            granted: vec![Permission::MediaLibrary],
            asset: Some(PickedAsset::new("shot.jpg")),
            ..FakeDevice::default()
        };
        let objects = MemoryObjectStore::new("https://cdn.example");
        let actions =
            AttachmentActions::new(controller.outbox(), Some(objects.clone()), device, author());

        assert_eq!(
            actions.take_photo().await.unwrap(),
            ActionOutcome::PermissionDenied
        );
        assert_eq!(objects.upload_count(), 0);
        assert!(store.appended().is_empty());
    }

    #[tokio::test]
    async fn cancelled_pick_sends_nothing() {
        let (controller, store) = connected_outbox().await;
        let device = FakeDevice {
            granted: vec![Permission::MediaLibrary],
            ..FakeDevice::default()
        };
        let actions = AttachmentActions::new(
            controller.outbox(),
            Some(MemoryObjectStore::new("https://cdn.example")),
            device,
            author(),
        );

        assert_eq!(actions.pick_image().await.unwrap(), ActionOutcome::Cancelled);
        assert!(store.appended().is_empty());
    }

    #[tokio::test]
    async fn upload_failure_aborts_send() {
        let (controller, store) = connected_outbox().await;
        let device = FakeDevice {
            granted: vec![Permission::Camera],
            asset: Some(PickedAsset::new("shot.jpg")),
            ..FakeDevice::default()
        };
        let objects = MemoryObjectStore::new("https://cdn.example");
        objects.fail_uploads(true);
        let actions =
            AttachmentActions::new(controller.outbox(), Some(objects), device, author());

        assert!(matches!(
            actions.take_photo().await,
            Err(ActionError::Upload(_))
        ));
        assert!(store.appended().is_empty());
    }

    #[test]
    fn content_type_follows_extension() {
        let asset = PickedAsset::new("a/b/photo.JPEG");
        assert_eq!(asset.extension().as_deref(), Some("jpeg"));
        assert_eq!(asset.resolved_content_type().as_deref(), Some("image/jpeg"));
        assert_eq!(PickedAsset::new("blob").resolved_content_type(), None);
    }
}
