//! Format dispatcher
//!
//! Classifies each input file by extension, reads it through an ephemeral
//! byte handle, decodes it on a local cooperative executor and applies the
//! completion policy to the scene graph:
//!
//! - textures replace the color map of every non-helper mesh
//! - everything else is inserted as a new top-level node
//!
//! Decodes are fire-and-forget. [`Dispatcher::pump`] is called once per frame;
//! it drives in-flight tasks until they stall and applies completed ones in
//! delivery order.

use std::any::Any;
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use tracing::{error, info, warn};

use crate::asset::{AnimationClip, DecodedAsset};
use crate::decode::DecoderSet;
use crate::error::{DecodeError, SourceError, ViewerError};
use crate::format::{classify, SupportedFormat};
use crate::scene::{NodeId, SceneGraph};
use crate::source::{ByteHandle, InputFile, Progress};

/// Identifier of one dispatched file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchId(u64);

impl fmt::Display for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dispatch-{}", self.0)
    }
}

/// Message from a decode task back to the dispatcher
#[derive(Debug)]
enum DispatchEvent {
    Progress {
        id: DispatchId,
        progress: Progress,
    },
    Finished {
        id: DispatchId,
        outcome: Result<DecodedAsset, ViewerError>,
    },
}

/// Result of a finished dispatch, after the completion policy ran
#[derive(Debug)]
pub enum Completion {
    /// A model was added as a new top-level node
    Inserted {
        id: DispatchId,
        file_name: String,
        format: SupportedFormat,
        node: NodeId,
        animations: usize,
    },
    /// A texture was applied to existing meshes
    TextureApplied {
        id: DispatchId,
        file_name: String,
        format: SupportedFormat,
        materials: usize,
    },
    /// Reading or decoding failed; the scene is unchanged
    Failed {
        id: DispatchId,
        file_name: String,
        format: SupportedFormat,
        error: ViewerError,
    },
}

impl Completion {
    pub fn id(&self) -> DispatchId {
        match self {
            Completion::Inserted { id, .. }
            | Completion::TextureApplied { id, .. }
            | Completion::Failed { id, .. } => *id,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            Completion::Inserted { file_name, .. }
            | Completion::TextureApplied { file_name, .. }
            | Completion::Failed { file_name, .. } => file_name,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Completion::Failed { .. })
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Inserted {
                file_name,
                format,
                animations,
                ..
            } => {
                write!(f, "Loaded {} file {}", format.display_name(), file_name)?;
                if *animations > 0 {
                    write!(f, " ({} animations)", animations)?;
                }
                Ok(())
            }
            Completion::TextureApplied {
                file_name,
                materials,
                ..
            } => write!(f, "Applied {} to {} materials", file_name, materials),
            // Read errors don't name the format on their own
            Completion::Failed {
                error: error @ ViewerError::Source(_),
                file_name,
                format,
                ..
            } => write!(
                f,
                "{} ({} file {})",
                error,
                format.display_name(),
                file_name
            ),
            Completion::Failed { error, .. } => write!(f, "{}", error),
        }
    }
}

/// A decode that has been started but not yet applied
#[derive(Debug, Clone)]
pub struct InFlight {
    pub file_name: String,
    pub format: SupportedFormat,
    /// Latest progress report, if any
    pub progress: Option<Progress>,
}

/// Byte handle wrapper that keeps the live-handle count
struct TrackedHandle {
    inner: Box<dyn ByteHandle>,
    live: Rc<Cell<usize>>,
}

impl TrackedHandle {
    fn new(inner: Box<dyn ByteHandle>, live: Rc<Cell<usize>>) -> Self {
        live.set(live.get() + 1);
        Self { inner, live }
    }
}

impl ByteHandle for TrackedHandle {
    fn read<'a>(
        &'a mut self,
        on_progress: &'a mut dyn FnMut(Progress),
    ) -> LocalBoxFuture<'a, Result<Vec<u8>, SourceError>> {
        self.inner.read(on_progress)
    }
}

impl Drop for TrackedHandle {
    fn drop(&mut self) {
        self.live.set(self.live.get().saturating_sub(1));
    }
}

pub struct Dispatcher {
    decoders: DecoderSet,
    pool: LocalPool,
    spawner: LocalSpawner,
    events_tx: UnboundedSender<DispatchEvent>,
    events_rx: UnboundedReceiver<DispatchEvent>,
    next_id: u64,
    in_flight: BTreeMap<DispatchId, InFlight>,
    animations: HashMap<NodeId, Vec<AnimationClip>>,
    live_handles: Rc<Cell<usize>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(DecoderSet::standard())
    }
}

impl Dispatcher {
    pub fn new(decoders: DecoderSet) -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        let (events_tx, events_rx) = mpsc::unbounded();
        Self {
            decoders,
            pool,
            spawner,
            events_tx,
            events_rx,
            next_id: 0,
            in_flight: BTreeMap::new(),
            animations: HashMap::new(),
            live_handles: Rc::new(Cell::new(0)),
        }
    }

    /// Start decoding `file`. Returns once the decode has been scheduled;
    /// the outcome arrives through [`Dispatcher::pump`].
    pub fn dispatch(&mut self, file: InputFile) -> Result<DispatchId, ViewerError> {
        let InputFile { name, source } = file;

        let Some(format) = classify(&name) else {
            error!(file = %name, "Unsupported file type");
            return Err(ViewerError::UnrecognizedFormat { file_name: name });
        };

        let handle = match source.open() {
            Ok(handle) => TrackedHandle::new(handle, Rc::clone(&self.live_handles)),
            Err(e) => {
                error!(file = %name, format = %format, "Failed to open file: {}", e);
                return Err(e.into());
            }
        };

        let id = DispatchId(self.next_id);
        self.next_id += 1;

        let task = decode_task(
            id,
            format,
            name.clone(),
            handle,
            self.decoders.clone(),
            self.events_tx.clone(),
        );
        self.spawner.spawn_local(task)?;

        info!(file = %name, format = %format, %id, "Loading");
        self.in_flight.insert(
            id,
            InFlight {
                file_name: name,
                format,
                progress: None,
            },
        );
        Ok(id)
    }

    /// Drive in-flight decodes and apply every completion received so far
    pub fn pump(&mut self, scene: &mut SceneGraph) -> Vec<Completion> {
        self.pool.run_until_stalled();

        let mut completions = Vec::new();
        while let Ok(Some(event)) = self.events_rx.try_next() {
            match event {
                DispatchEvent::Progress { id, progress } => self.record_progress(id, progress),
                DispatchEvent::Finished { id, outcome } => {
                    if let Some(completion) = self.complete(id, outcome, scene) {
                        completions.push(completion);
                    }
                }
            }
        }
        completions
    }

    /// Number of decodes started but not yet applied
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Pending decodes in dispatch order
    pub fn pending(&self) -> impl Iterator<Item = (DispatchId, &InFlight)> {
        self.in_flight.iter().map(|(id, entry)| (*id, entry))
    }

    /// Number of byte handles not yet released
    pub fn live_handles(&self) -> usize {
        self.live_handles.get()
    }

    /// Animation clips decoded alongside a node
    pub fn animations(&self, node: NodeId) -> &[AnimationClip] {
        self.animations.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn decoders(&self) -> &DecoderSet {
        &self.decoders
    }

    fn record_progress(&mut self, id: DispatchId, progress: Progress) {
        let Some(entry) = self.in_flight.get_mut(&id) else {
            return;
        };
        entry.progress = Some(progress);
        match progress.percent() {
            Some(percent) => info!(file = %entry.file_name, "{:.0}% loaded", percent),
            None => info!(file = %entry.file_name, loaded = progress.loaded, "?% loaded"),
        }
    }

    fn complete(
        &mut self,
        id: DispatchId,
        outcome: Result<DecodedAsset, ViewerError>,
        scene: &mut SceneGraph,
    ) -> Option<Completion> {
        let Some(InFlight {
            file_name, format, ..
        }) = self.in_flight.remove(&id)
        else {
            warn!(%id, "Completion for unknown dispatch");
            return None;
        };

        let outcome = match outcome {
            Ok(DecodedAsset::Texture(texture)) if format.is_texture() => {
                let materials = scene.apply_texture(&texture);
                info!(
                    file = %file_name,
                    width = texture.width,
                    height = texture.height,
                    materials,
                    "Texture applied"
                );
                Ok(Completion::TextureApplied {
                    id,
                    file_name,
                    format,
                    materials,
                })
            }
            Ok(DecodedAsset::Node { node, animations }) if !format.is_texture() => {
                let meshes = node.mesh_count();
                let node = scene.add_top_level_child(node, Some(file_name.clone()));
                info!(file = %file_name, format = %format, %node, meshes, "Model added to scene");

                let count = animations.len();
                if count > 0 {
                    for clip in &animations {
                        info!(
                            %node,
                            name = clip.name.as_deref().unwrap_or("<unnamed>"),
                            duration_secs = clip.duration_secs,
                            channels = clip.channel_count,
                            "Animation clip"
                        );
                    }
                    self.animations.insert(node, animations);
                }
                Ok(Completion::Inserted {
                    id,
                    file_name,
                    format,
                    node,
                    animations: count,
                })
            }
            Ok(_) => Err((file_name, ViewerError::UnexpectedAsset { format })),
            Err(e) => Err((file_name, e)),
        };

        Some(outcome.unwrap_or_else(|(file_name, error)| {
            error!(file = %file_name, format = %format, "{}", error);
            Completion::Failed {
                id,
                file_name,
                format,
                error,
            }
        }))
    }
}

/// Read, release the handle, decode, report
async fn decode_task(
    id: DispatchId,
    format: SupportedFormat,
    file_name: String,
    mut handle: TrackedHandle,
    decoders: DecoderSet,
    events: UnboundedSender<DispatchEvent>,
) {
    let progress_events = events.clone();
    let mut on_progress = |progress: Progress| {
        let _ = progress_events.unbounded_send(DispatchEvent::Progress { id, progress });
    };
    let read = handle.read(&mut on_progress).await;
    drop(handle);

    let outcome = match read {
        Ok(bytes) => decode_guarded(&decoders, format, &file_name, &bytes)
            .map_err(|source| ViewerError::Decode { format, source }),
        Err(e) => Err(ViewerError::Source(e)),
    };

    // The receiver lives as long as the pool that polls this task
    let _ = events.unbounded_send(DispatchEvent::Finished { id, outcome });
}

/// Run a decoder, turning a panic inside it into a decode error so the
/// executor (and the frame loop polling it) keeps running
fn decode_guarded(
    decoders: &DecoderSet,
    format: SupportedFormat,
    file_name: &str,
    bytes: &[u8],
) -> Result<DecodedAsset, DecodeError> {
    panic::catch_unwind(AssertUnwindSafe(|| decoders.decode(format, file_name, bytes)))
        .unwrap_or_else(|payload| Err(DecodeError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
