//! Input surface: drag-and-drop and the Browse dialog
//!
//! Both hand files to [`PendingInputs`]; the loader drains it once per frame.
//! Browser drops and picks arrive from DOM callbacks, native drops from the
//! window's `FileDragAndDrop` messages.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use bevy::prelude::*;
#[cfg(not(target_arch = "wasm32"))]
use bevy::window::FileDragAndDrop;
use dropview_core::InputFile;

/// Files waiting to be dispatched. Shared with DOM callbacks, so it lives on
/// the main thread as a non-send resource.
#[derive(Clone, Default)]
pub struct PendingInputs {
    files: Rc<RefCell<VecDeque<InputFile>>>,
    cancelled: Rc<Cell<usize>>,
}

impl PendingInputs {
    pub fn push(&self, file: InputFile) {
        self.files.borrow_mut().push_back(file);
    }

    /// Record a picker closed without a file
    pub fn cancel(&self) {
        self.cancelled.set(self.cancelled.get() + 1);
    }

    pub fn drain(&self) -> Vec<InputFile> {
        self.files.borrow_mut().drain(..).collect()
    }

    /// Number of empty selections since the last call
    pub fn take_cancelled(&self) -> usize {
        self.cancelled.replace(0)
    }

    pub fn len(&self) -> usize {
        self.files.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.borrow().is_empty()
    }
}

/// Plugin for file input
pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.init_non_send_resource::<PendingInputs>()
            .init_non_send_resource::<BrowseDialog>();

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, web::attach_drop_listeners);

        #[cfg(not(target_arch = "wasm32"))]
        app.add_systems(Update, receive_dropped_files);
    }
}

/// The platform file dialog for the supported extensions. The browser
/// picker is created on first use and reused for every later Browse.
#[derive(Default)]
pub struct BrowseDialog {
    #[cfg(target_arch = "wasm32")]
    picker: Option<web::FilePicker>,
}

impl BrowseDialog {
    pub fn open(&mut self, pending: &PendingInputs) {
        #[cfg(target_arch = "wasm32")]
        {
            if self.picker.is_none() {
                self.picker = web::FilePicker::new(pending);
            }
            if let Some(picker) = &self.picker {
                picker.open();
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = pending;
            tracing::warn!(
                "Browse dialog is only available in the browser; drop a file onto the window"
            );
        }
    }
}

/// Queue dropped paths. A multi-file drop arrives as one message per file in
/// the same frame; only the first per window is used.
#[cfg(not(target_arch = "wasm32"))]
fn receive_dropped_files(
    mut drops: MessageReader<FileDragAndDrop>,
    pending: NonSend<PendingInputs>,
) {
    use dropview_core::PathSource;
    use std::collections::HashSet;

    let mut accepted = HashSet::new();
    for event in drops.read() {
        let FileDragAndDrop::DroppedFile { window, path_buf } = event else {
            continue;
        };
        if !accepted.insert(*window) {
            tracing::debug!(path = %path_buf.display(), "Ignoring extra file in drop");
            continue;
        }
        let name = path_buf
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path_buf.display().to_string());
        tracing::debug!(path = %path_buf.display(), "File dropped");
        pending.push(InputFile::new(name, PathSource::new(path_buf.clone())));
    }
}

#[cfg(target_arch = "wasm32")]
mod web {
    use bevy::prelude::*;
    use dropview_core::{accept_string, InputFile};
    use tracing::{debug, error, info};
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::HtmlInputElement;

    use super::PendingInputs;
    use crate::web_source::BlobSource;

    const CANVAS_ID: &str = "dropview-canvas";

    fn push_file(pending: &PendingInputs, file: web_sys::File) {
        let name = file.name();
        pending.push(InputFile::new(name, BlobSource::new(file)));
    }

    /// Listen for files dropped onto the canvas. Only the first file of a
    /// drop is used.
    pub(super) fn attach_drop_listeners(pending: NonSend<PendingInputs>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            error!("attach_drop_listeners: no document");
            return;
        };
        let Some(canvas) = document.get_element_by_id(CANVAS_ID) else {
            error!("attach_drop_listeners: no #{} element", CANVAS_ID);
            return;
        };

        // The browser only fires `drop` if `dragover` is cancelled
        let dragover = Closure::wrap(Box::new(move |event: web_sys::DragEvent| {
            event.prevent_default();
        }) as Box<dyn FnMut(_)>);

        let pending = (*pending).clone();
        let on_drop = Closure::wrap(Box::new(move |event: web_sys::DragEvent| {
            event.prevent_default();
            let file = event
                .data_transfer()
                .and_then(|transfer| transfer.files())
                .and_then(|files| files.get(0));
            match file {
                Some(file) => {
                    debug!(file = %file.name(), "File dropped");
                    push_file(&pending, file);
                }
                None => debug!("Drop without files ignored"),
            }
        }) as Box<dyn FnMut(_)>);

        let attached = canvas
            .add_event_listener_with_callback("dragover", dragover.as_ref().unchecked_ref())
            .and_then(|_| {
                canvas.add_event_listener_with_callback("drop", on_drop.as_ref().unchecked_ref())
            });
        if let Err(e) = attached {
            error!("attach_drop_listeners: {:?}", e);
            return;
        }
        dragover.forget();
        on_drop.forget();
    }

    /// Hidden `<input type=file>` limited to the supported extensions. The
    /// element and its handlers live as long as the picker.
    pub(super) struct FilePicker {
        input: HtmlInputElement,
        _on_change: Closure<dyn FnMut(web_sys::Event)>,
        _on_cancel: Closure<dyn FnMut(web_sys::Event)>,
    }

    impl FilePicker {
        pub(super) fn new(pending: &PendingInputs) -> Option<Self> {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                error!("FilePicker: no document");
                return None;
            };

            let input: HtmlInputElement = match document.create_element("input") {
                Ok(el) => match el.dyn_into() {
                    Ok(input) => input,
                    Err(_) => {
                        error!("FilePicker: failed to cast to HtmlInputElement");
                        return None;
                    }
                },
                Err(e) => {
                    error!("FilePicker: failed to create input element: {:?}", e);
                    return None;
                }
            };

            input.set_type("file");
            input.set_accept(&accept_string());
            let _ = input.style().set_property("display", "none");

            // Must be in the DOM for click() to work in some browsers
            let Some(body) = document.body() else {
                error!("FilePicker: no document body");
                return None;
            };
            if let Err(e) = body.append_child(&input) {
                error!("FilePicker: failed to append: {:?}", e);
                return None;
            }

            let on_change = {
                let pending = pending.clone();
                let input = input.clone();
                Closure::wrap(Box::new(move |_event: web_sys::Event| {
                    match input.files().and_then(|files| files.get(0)) {
                        Some(file) => {
                            info!(file = %file.name(), "File selected");
                            push_file(&pending, file);
                        }
                        None => pending.cancel(),
                    }
                }) as Box<dyn FnMut(_)>)
            };

            let on_cancel = {
                let pending = pending.clone();
                Closure::wrap(Box::new(move |_event: web_sys::Event| {
                    pending.cancel();
                }) as Box<dyn FnMut(_)>)
            };

            input.set_onchange(Some(on_change.as_ref().unchecked_ref()));
            if let Err(e) =
                input.add_event_listener_with_callback("cancel", on_cancel.as_ref().unchecked_ref())
            {
                debug!("FilePicker: no cancel listener: {:?}", e);
            }

            Some(Self {
                input,
                _on_change: on_change,
                _on_cancel: on_cancel,
            })
        }

        pub(super) fn open(&self) {
            // Picking the same file twice still fires `change`
            self.input.set_value("");
            debug!("Opening file picker dialog");
            self.input.click();
        }
    }

    impl Drop for FilePicker {
        fn drop(&mut self) {
            self.input.set_onchange(None);
            self.input.remove();
        }
    }
}
