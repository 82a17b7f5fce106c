use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{ActivitySnapshot, ActivitySource, SourceKind};
use crate::activity::EXCERPT_CHARS;
use crate::error::FocusResult;
use crate::utils::text::tail_chars;

/// Writer side of a [`ManualTextSource`]; cheap to clone into UI or tool handlers.
#[derive(Clone, Default)]
pub struct ManualTextHandle {
    text: Arc<Mutex<String>>,
}

impl ManualTextHandle {
    pub fn set(&self, text: impl Into<String>) {
        let mut guard = match self.text.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = text.into();
    }

    pub fn current(&self) -> String {
        match self.text.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Activity typed or pasted by the user instead of observed on disk.
pub struct ManualTextSource {
    handle: ManualTextHandle,
    last_captured: String,
    closed: bool,
}

impl ManualTextSource {
    pub fn new() -> (Self, ManualTextHandle) {
        let handle = ManualTextHandle::default();
        (Self::from_handle(handle.clone()), handle)
    }

    pub fn from_handle(handle: ManualTextHandle) -> Self {
        Self {
            handle,
            last_captured: String::new(),
            closed: false,
        }
    }
}

#[async_trait]
impl ActivitySource for ManualTextSource {
    fn kind(&self) -> SourceKind {
        SourceKind::TextSnapshot
    }

    async fn capture(&mut self) -> FocusResult<Option<ActivitySnapshot>> {
        if self.closed {
            return Ok(None);
        }
        let text = self.handle.current();
        if text == self.last_captured {
            return Ok(None);
        }
        let snapshot = ActivitySnapshot::text(tail_chars(&text, EXCERPT_CHARS));
        self.last_captured = text;
        Ok(Some(snapshot))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
