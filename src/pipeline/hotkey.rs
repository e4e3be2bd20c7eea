//! Hotkey Path (C10): a global hotkey chord that captures the screen and
//! prompts for a typed instruction, independent of the always-on voice
//! pipeline (C1-C9). A triggered chord that's cancelled mid-prompt
//! discards both the screenshot and the instruction — nothing is handed
//! to the sink unless the user actually confirms.

use std::fmt;
use std::path::PathBuf;

/// A chord of modifier keys plus a trigger key. `Default` matches the
/// platform convention of meta (super/cmd) + shift + a letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyChord {
    pub meta: bool,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub key: char,
}

impl Default for HotkeyChord {
    fn default() -> Self {
        Self {
            meta: true,
            shift: true,
            ctrl: false,
            alt: false,
            key: 'g',
        }
    }
}

impl fmt::Display for HotkeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.meta {
            write!(f, "meta+")?;
        }
        if self.ctrl {
            write!(f, "ctrl+")?;
        }
        if self.alt {
            write!(f, "alt+")?;
        }
        if self.shift {
            write!(f, "shift+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// Captures the current screen contents to a file and returns its path.
/// Implemented per-platform (portal/X11/Wayland specifics); kept as a
/// capability trait so the hotkey controller's branching logic is
/// testable without an actual display server.
pub trait ScreenCapturer: Send + Sync {
    fn capture(&self, destination: &std::path::Path) -> crate::error::Result<()>;
}

/// Shows a cancellable modal asking the user what they want done with
/// the screenshot just taken. Returns `None` if the user cancels.
pub trait InstructionPrompt: Send + Sync {
    fn prompt(&self) -> Option<String>;
}

/// Where a dispatched utterance originated. Voice-path utterances always
/// come from the session controller; `Screen` utterances come from this
/// module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceOrigin {
    Voice,
    Screen,
}

pub struct HotkeyConfig {
    pub chord: HotkeyChord,
    pub screenshot_dir: PathBuf,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            chord: HotkeyChord::default(),
            screenshot_dir: std::env::temp_dir(),
        }
    }
}

/// Outcome of one hotkey trigger, independent of how the screenshot and
/// prompt were actually obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotkeyOutcome {
    /// User confirmed an instruction; ready to hand to the sink.
    Confirmed {
        screenshot_path: PathBuf,
        instruction: String,
    },
    /// User cancelled the prompt; screenshot and instruction are both
    /// discarded (the screenshot file is removed from disk).
    Cancelled,
}

/// Drives one hotkey activation: capture, prompt, and decide whether to
/// keep or discard the result. Does not itself listen for the key chord
/// (see `spawn_listener` for that); this is the deterministic, testable
/// core.
pub struct HotkeyController<S: ScreenCapturer, P: InstructionPrompt> {
    config: HotkeyConfig,
    capturer: S,
    prompt: P,
}

impl<S: ScreenCapturer, P: InstructionPrompt> HotkeyController<S, P> {
    pub fn new(config: HotkeyConfig, capturer: S, prompt: P) -> Self {
        Self {
            config,
            capturer,
            prompt,
        }
    }

    /// Runs one full trigger cycle: capture, prompt, confirm-or-discard.
    pub fn trigger(&self, timestamp_slug: &str) -> crate::error::Result<HotkeyOutcome> {
        std::fs::create_dir_all(&self.config.screenshot_dir)?;
        let screenshot_path = self
            .config
            .screenshot_dir
            .join(format!("screen_{timestamp_slug}.png"));
        self.capturer.capture(&screenshot_path)?;

        match self.prompt.prompt() {
            Some(instruction) if !instruction.trim().is_empty() => Ok(HotkeyOutcome::Confirmed {
                screenshot_path,
                instruction,
            }),
            _ => {
                let _ = std::fs::remove_file(&screenshot_path);
                Ok(HotkeyOutcome::Cancelled)
            }
        }
    }
}

#[cfg(feature = "hotkey")]
pub mod listener {
    //! Thin glue around `rdev`'s global key-event stream: watches for the
    //! configured chord and calls back into the controller. Not unit
    //! tested (it blocks on the platform's event loop); the controller
    //! above carries all the logic that can be tested without a display
    //! server.
    use super::HotkeyChord;
    use rdev::{Event, EventType, Key};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn key_matches(key: Key, target: char) -> bool {
        let expected = match target.to_ascii_lowercase() {
            'a' => Key::KeyA,
            'b' => Key::KeyB,
            'c' => Key::KeyC,
            'd' => Key::KeyD,
            'e' => Key::KeyE,
            'f' => Key::KeyF,
            'g' => Key::KeyG,
            'h' => Key::KeyH,
            _ => return false,
        };
        key == expected
    }

    /// Blocks the calling thread listening for the configured chord,
    /// invoking `on_trigger` each time it fires. Intended to run on its
    /// own dedicated thread, independent of the voice pipeline's threads.
    pub fn listen(chord: HotkeyChord, on_trigger: impl Fn() + Send + 'static) {
        let meta = Arc::new(AtomicBool::new(false));
        let shift = Arc::new(AtomicBool::new(false));
        let ctrl = Arc::new(AtomicBool::new(false));
        let alt = Arc::new(AtomicBool::new(false));

        let callback = move |event: Event| {
            let pressed = matches!(event.event_type, EventType::KeyPress(_));
            let key = match event.event_type {
                EventType::KeyPress(k) | EventType::KeyRelease(k) => k,
                _ => return,
            };

            match key {
                Key::MetaLeft | Key::MetaRight => meta.store(pressed, Ordering::SeqCst),
                Key::ShiftLeft | Key::ShiftRight => shift.store(pressed, Ordering::SeqCst),
                Key::ControlLeft | Key::ControlRight => ctrl.store(pressed, Ordering::SeqCst),
                Key::Alt | Key::AltGr => alt.store(pressed, Ordering::SeqCst),
                other if pressed && key_matches(other, chord.key) => {
                    let modifiers_match = meta.load(Ordering::SeqCst) == chord.meta
                        && shift.load(Ordering::SeqCst) == chord.shift
                        && ctrl.load(Ordering::SeqCst) == chord.ctrl
                        && alt.load(Ordering::SeqCst) == chord.alt;
                    if modifiers_match {
                        on_trigger();
                    }
                }
                _ => {}
            }
        };

        let _ = rdev::listen(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    struct FakeCapturer {
        calls: Arc<AtomicUsize>,
    }
    impl ScreenCapturer for FakeCapturer {
        fn capture(&self, destination: &std::path::Path) -> crate::error::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::fs::write(destination, b"fake-png-bytes")?;
            Ok(())
        }
    }

    struct FixedPrompt(Mutex<Option<String>>);
    impl InstructionPrompt for FixedPrompt {
        fn prompt(&self) -> Option<String> {
            self.0.lock().unwrap().clone()
        }
    }

    fn controller(dir: &std::path::Path, answer: Option<&str>) -> (HotkeyController<FakeCapturer, FixedPrompt>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let controller = HotkeyController::new(
            HotkeyConfig {
                chord: HotkeyChord::default(),
                screenshot_dir: dir.to_path_buf(),
            },
            FakeCapturer { calls: calls.clone() },
            FixedPrompt(Mutex::new(answer.map(str::to_string))),
        );
        (controller, calls)
    }

    #[test]
    fn confirmed_instruction_keeps_the_screenshot() {
        let dir = tempdir().unwrap();
        let (controller, calls) = controller(dir.path(), Some("summarize this error"));

        let outcome = controller.trigger("20260101-000000").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match outcome {
            HotkeyOutcome::Confirmed { screenshot_path, instruction } => {
                assert!(screenshot_path.exists());
                assert_eq!(instruction, "summarize this error");
            }
            HotkeyOutcome::Cancelled => panic!("expected confirmation"),
        }
    }

    #[test]
    fn cancelled_prompt_discards_the_screenshot() {
        let dir = tempdir().unwrap();
        let (controller, calls) = controller(dir.path(), None);

        let outcome = controller.trigger("20260101-000001").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome, HotkeyOutcome::Cancelled);

        let screenshot_path = dir.path().join("screen_20260101-000001.png");
        assert!(!screenshot_path.exists());
    }

    #[test]
    fn empty_instruction_is_treated_as_cancelled() {
        let dir = tempdir().unwrap();
        let (controller, _calls) = controller(dir.path(), Some("   "));

        let outcome = controller.trigger("20260101-000002").unwrap();
        assert_eq!(outcome, HotkeyOutcome::Cancelled);
    }

    #[test]
    fn default_chord_matches_platform_convention() {
        let chord = HotkeyChord::default();
        assert!(chord.meta);
        assert!(chord.shift);
        assert!(!chord.ctrl);
        assert_eq!(chord.key, 'g');
        assert_eq!(chord.to_string(), "meta+shift+g");
    }
}
