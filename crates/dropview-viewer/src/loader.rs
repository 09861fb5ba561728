//! Per-frame dispatch of queued files
//!
//! Drains [`PendingInputs`] into the [`Dispatcher`], pumps it against the
//! live scene graph and keeps a short log of outcomes for the UI panel.

use std::collections::VecDeque;

use bevy::prelude::*;
use dropview_core::{Dispatcher, ViewerError};
use dropview_scene::{LiveScene, SceneSyncSet};
use tracing::warn;

use crate::input::PendingInputs;

/// Number of load messages kept for display
const MAX_MESSAGES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadLevel {
    Success,
    Warning,
    Failure,
}

#[derive(Debug, Clone)]
pub struct LoadMessage {
    pub level: LoadLevel,
    pub text: String,
}

/// Most recent load outcomes, newest last
#[derive(Resource, Default)]
pub struct LoadLog {
    entries: VecDeque<LoadMessage>,
}

impl LoadLog {
    pub fn push(&mut self, level: LoadLevel, text: impl Into<String>) {
        if self.entries.len() == MAX_MESSAGES {
            self.entries.pop_front();
        }
        self.entries.push_back(LoadMessage {
            level,
            text: text.into(),
        });
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LoadMessage> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LoadMessage> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Plugin for the dispatcher loop
pub struct LoaderPlugin;

impl Plugin for LoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_non_send_resource::<Dispatcher>()
            .init_non_send_resource::<PendingInputs>()
            .init_resource::<LoadLog>()
            .add_systems(Update, dispatch_pending.before(SceneSyncSet));
    }
}

fn dispatch_pending(
    pending: NonSend<PendingInputs>,
    mut dispatcher: NonSendMut<Dispatcher>,
    mut live: ResMut<LiveScene>,
    mut log: ResMut<LoadLog>,
) {
    for _ in 0..pending.take_cancelled() {
        let error = ViewerError::EmptySelection;
        warn!("{}", error);
        log.push(LoadLevel::Warning, error.to_string());
    }

    // Errors are already logged by the dispatcher
    for file in pending.drain() {
        if let Err(e) = dispatcher.dispatch(file) {
            log.push(LoadLevel::Failure, e.to_string());
        }
    }

    for completion in dispatcher.pump(&mut live.0) {
        let level = if completion.is_failure() {
            LoadLevel::Failure
        } else {
            LoadLevel::Success
        };
        log.push(level, completion.to_string());
    }
}
