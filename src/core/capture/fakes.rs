//! Scripted collaborators for driving the capture loop in tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::collaborators::{
    AbortFlag, ArtifactId, ArtifactSink, CaptureError, Collaborators, InputError, InputInjector,
    PersistError, RegionCapturer, ScrollDirection, VisibilityController,
};
use crate::api::models::Rect;
use crate::core::stitch::StitchedImage;

/// Returns the scripted captures in order; `None` entries and anything past
/// the end of the script fail.
pub struct ScriptedCapturer {
    script: Vec<Option<Vec<u8>>>,
    calls: Arc<AtomicUsize>,
    abort_after: Option<(usize, AbortFlag)>,
}

impl ScriptedCapturer {
    pub fn new(script: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            script,
            calls: Arc::new(AtomicUsize::new(0)),
            abort_after: None,
        }
    }

    /// Requests an abort once `captures` captures have been taken.
    pub fn abort_after(mut self, captures: usize, flag: AbortFlag) -> Self {
        self.abort_after = Some((captures, flag));
        self
    }
}

impl RegionCapturer for ScriptedCapturer {
    fn capture_region(&mut self, _region: &Rect) -> Result<Vec<u8>, CaptureError> {
        let idx = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some((after, flag)) = &self.abort_after {
            if idx + 1 >= *after {
                flag.request();
            }
        }

        match self.script.get(idx) {
            Some(Some(bytes)) => Ok(bytes.clone()),
            _ => Err(CaptureError::NoOutput),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCall {
    Click(i32, i32),
    Scroll(u32),
}

#[derive(Clone, Default)]
pub struct RecordingInput {
    calls: Arc<Mutex<Vec<InputCall>>>,
    fail_scroll: bool,
}

impl RecordingInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_scroll() -> Self {
        Self {
            fail_scroll: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<InputCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn scroll_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, InputCall::Scroll(_)))
            .count()
    }
}

impl InputInjector for RecordingInput {
    fn click(&mut self, x: i32, y: i32) -> Result<(), InputError> {
        self.calls.lock().unwrap().push(InputCall::Click(x, y));
        Ok(())
    }

    fn inject_scroll(&mut self, repeats: u32, direction: ScrollDirection) -> Result<(), InputError> {
        assert_eq!(direction, ScrollDirection::Down);
        self.calls.lock().unwrap().push(InputCall::Scroll(repeats));
        if self.fail_scroll {
            return Err(InputError::Failed("keypress helper exited".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingVisibility {
    history: Arc<Mutex<Vec<bool>>>,
}

impl RecordingVisibility {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<bool> {
        self.history.lock().unwrap().clone()
    }
}

impl VisibilityController for RecordingVisibility {
    fn set_app_visibility(&mut self, hidden: bool) {
        self.history.lock().unwrap().push(hidden);
    }
}

#[derive(Clone, Default)]
pub struct MemorySink {
    stored: Arc<Mutex<Vec<(StitchedImage, String)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(&self) -> Vec<(StitchedImage, String)> {
        self.stored.lock().unwrap().clone()
    }
}

impl ArtifactSink for MemorySink {
    fn persist_artifact(
        &mut self,
        image: &StitchedImage,
        title: &str,
    ) -> Result<ArtifactId, PersistError> {
        let mut stored = self.stored.lock().unwrap();
        stored.push((image.clone(), title.to_string()));
        Ok(ArtifactId(format!("artifact-{}", stored.len())))
    }
}

pub struct Handles {
    pub input: RecordingInput,
    pub visibility: RecordingVisibility,
}

pub fn collaborators(capturer: ScriptedCapturer, abort: AbortFlag) -> (Collaborators, Handles) {
    let input = RecordingInput::new();
    let visibility = RecordingVisibility::new();

    let collaborators = Collaborators {
        capturer: Box::new(capturer),
        input: Box::new(input.clone()),
        visibility: Box::new(visibility.clone()),
        abort: Arc::new(abort),
    };

    (collaborators, Handles { input, visibility })
}
