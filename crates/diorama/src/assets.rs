//! Background asset loading with a completion channel.

use picking::PickWorld;
use renderer::{AssetError, ImageData, ModelData};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

/// What a finished load is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKey {
    HouseModel,
    InteractiveModel,
    GroundTexture,
    SmokeTexture,
}

#[derive(Debug)]
pub enum AssetPayload {
    /// `pick` is built on the loader thread when the request asked for it.
    Model {
        data: ModelData,
        pick: Option<PickWorld>,
    },
    Texture(ImageData),
}

/// A successfully loaded asset.
#[derive(Debug)]
pub struct AssetEvent {
    pub key: AssetKey,
    pub path: PathBuf,
    pub payload: AssetPayload,
}

/// Loads files on worker threads and hands results back on the render thread.
///
/// Failures are logged by the worker and produce no event.
pub struct AssetLoader {
    tx: mpsc::Sender<AssetEvent>,
    rx: mpsc::Receiver<AssetEvent>,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// Import a glTF model; with `pickable` its primitives also become colliders.
    pub fn request_model(&self, key: AssetKey, path: impl AsRef<Path>, pickable: bool) {
        self.spawn(key, path.as_ref().to_path_buf(), move |path| {
            let data = ModelData::load(path)?;
            let pick = pickable.then(|| {
                let meshes = data.pick_meshes();
                PickWorld::from_meshes(meshes.iter().map(|(v, t)| (v.as_slice(), t.as_slice())))
            });
            Ok(AssetPayload::Model { data, pick })
        });
    }

    pub fn request_texture(&self, key: AssetKey, path: impl AsRef<Path>) {
        self.spawn(key, path.as_ref().to_path_buf(), |path| {
            Ok(AssetPayload::Texture(ImageData::load(path)?))
        });
    }

    /// Everything that finished since the last call. Never blocks.
    pub fn drain(&self) -> Vec<AssetEvent> {
        self.rx.try_iter().collect()
    }

    fn spawn<F>(&self, key: AssetKey, path: PathBuf, load: F)
    where
        F: FnOnce(&Path) -> Result<AssetPayload, AssetError> + Send + 'static,
    {
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name(format!("load-{:?}", key))
            .spawn(move || match load(&path) {
                Ok(payload) => {
                    log::info!("Loaded {:?} from {}", key, path.display());
                    // Receiver gone means the app is shutting down.
                    let _ = tx.send(AssetEvent { key, path, payload });
                }
                Err(e) => log::warn!("Failed to load {:?}: {}", key, e),
            });
        if let Err(e) = spawned {
            log::warn!("Could not start loader for {:?}: {}", key, e);
        }
    }

    #[cfg(test)]
    pub(crate) fn wait(&self, timeout: std::time::Duration) -> Option<AssetEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}
