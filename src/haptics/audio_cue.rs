use anyhow::{anyhow, Result};
use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use super::click::ClickTone;
use super::{HapticPulse, PulsePattern};

enum CueCommand {
    Click(PulsePattern),
    Shutdown,
}

/// Feedback pulse as an audible click on the default output device.
///
/// rodio's output stream is not `Send`, so it lives on a dedicated thread that
/// is spawned on the first pulse and fed through a channel.
pub struct AudioCuePulse {
    tx: Arc<Mutex<Option<Sender<CueCommand>>>>,
}

impl AudioCuePulse {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<CueCommand>> {
        let mut slot = self
            .tx
            .lock()
            .map_err(|e| anyhow!("audio cue lock poisoned: {e}"))?;
        if let Some(tx) = slot.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<CueCommand>();

        thread::Builder::new()
            .name("audio-cue".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        CueCommand::Click(pattern) => {
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                                log::warn!("audio cue unavailable: {err}");
                                continue;
                            }
                            if let Some(ref s) = sink {
                                s.append(ClickTone::new(pattern));
                            }
                        }
                        CueCommand::Shutdown => {
                            if let Some(s_old) = sink.take() {
                                s_old.stop();
                            }
                            break;
                        }
                    }
                }
            })
            .map_err(|e| anyhow!("failed to spawn audio cue thread: {e}"))?;

        *slot = Some(tx.clone());
        Ok(tx)
    }
}

impl Default for AudioCuePulse {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioCuePulse {
    fn drop(&mut self) {
        if let Ok(Some(tx)) = self.tx.lock().map(|mut g| g.take()) {
            let _ = tx.send(CueCommand::Shutdown);
        }
    }
}

impl HapticPulse for AudioCuePulse {
    fn is_supported(&self) -> bool {
        true
    }

    fn pulse(&self, pattern: PulsePattern) -> Result<()> {
        let tx = self.ensure_thread()?;
        tx.send(CueCommand::Click(pattern))
            .map_err(|e| anyhow!("audio cue thread gone: {e}"))
    }
}
