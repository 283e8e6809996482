//! Fire-and-forget audio cues. Playback problems are logged at debug level and otherwise ignored.

use std::path::PathBuf;
use tracing::debug;

pub const DEFAULT_VOLUME: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundName {
    Move,
    Rotate,
    Drop,
    Clear,
    GameOver,
}

// Lookup tables for the rodio backend.
#[cfg_attr(not(feature = "audio"), allow(dead_code))]
impl SoundName {
    pub const ALL: [Self; 5] = [Self::Move, Self::Rotate, Self::Drop, Self::Clear, Self::GameOver];

    /// File stem looked up in the sounds directory (`move.ogg`, ...).
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Rotate => "rotate",
            Self::Drop => "drop",
            Self::Clear => "clear",
            Self::GameOver => "gameover",
        }
    }

    /// Fallback tone: (frequency Hz, duration ms).
    pub fn tone(self) -> (f32, u64) {
        match self {
            Self::Move => (440.0, 30),
            Self::Rotate => (660.0, 40),
            Self::Drop => (220.0, 60),
            Self::Clear => (880.0, 180),
            Self::GameOver => (110.0, 600),
        }
    }
}

/// Where cues end up. `play` must not block the frame loop.
pub trait SoundBackend {
    fn play(&mut self, name: SoundName, volume: f32);
}

/// Used when audio is compiled out or no output device is available.
#[derive(Debug, Default)]
pub struct SilentBackend;

impl SoundBackend for SilentBackend {
    fn play(&mut self, _name: SoundName, _volume: f32) {}
}

pub struct SoundManager {
    backend: Box<dyn SoundBackend>,
    muted: bool,
    volume: f32,
}

impl std::fmt::Debug for SoundManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundManager")
            .field("muted", &self.muted)
            .field("volume", &self.volume)
            .finish_non_exhaustive()
    }
}

impl SoundManager {
    /// Open the best available backend for this session.
    pub fn init(sounds_dir: Option<PathBuf>, muted: bool, volume: f32) -> Self {
        let mut manager = Self::with_backend(open_backend(sounds_dir), volume);
        manager.set_muted(muted);
        manager
    }

    pub fn with_backend(backend: Box<dyn SoundBackend>, volume: f32) -> Self {
        Self {
            backend,
            muted: false,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    pub fn play(&mut self, name: SoundName) {
        if self.muted {
            return;
        }
        self.backend.play(name, self.volume);
    }

    pub fn set_muted(&mut self, value: bool) {
        self.muted = value;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_volume(&mut self, value: f32) {
        self.volume = value.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

#[cfg(feature = "audio")]
fn open_backend(sounds_dir: Option<PathBuf>) -> Box<dyn SoundBackend> {
    match rodio_backend::RodioBackend::open(sounds_dir) {
        Ok(backend) => Box::new(backend),
        Err(err) => {
            debug!("audio output unavailable: {err}");
            Box::new(SilentBackend)
        }
    }
}

#[cfg(not(feature = "audio"))]
fn open_backend(sounds_dir: Option<PathBuf>) -> Box<dyn SoundBackend> {
    if sounds_dir.is_some() {
        debug!("built without the `audio` feature; --sounds ignored");
    }
    Box::new(SilentBackend)
}

#[cfg(feature = "audio")]
mod rodio_backend {
    use super::{SoundBackend, SoundName};
    use rodio::source::{SineWave, Source};
    use rodio::{Decoder, OutputStream, OutputStreamHandle};
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::time::Duration;
    use tracing::debug;

    pub struct RodioBackend {
        // Dropping the stream stops all output.
        _stream: OutputStream,
        handle: OutputStreamHandle,
        /// Encoded clip bytes per cue, loaded once.
        clips: HashMap<SoundName, Vec<u8>>,
    }

    impl RodioBackend {
        pub fn open(sounds_dir: Option<PathBuf>) -> Result<Self, rodio::StreamError> {
            let (stream, handle) = OutputStream::try_default()?;
            let mut clips = HashMap::new();
            if let Some(dir) = sounds_dir {
                for name in SoundName::ALL {
                    let path = dir.join(format!("{}.ogg", name.file_stem()));
                    match std::fs::read(&path) {
                        Ok(bytes) => {
                            clips.insert(name, bytes);
                        }
                        Err(err) => debug!("no clip at {}: {err}", path.display()),
                    }
                }
            }
            Ok(Self {
                _stream: stream,
                handle,
                clips,
            })
        }
    }

    impl SoundBackend for RodioBackend {
        fn play(&mut self, name: SoundName, volume: f32) {
            let result = match self.clips.get(&name) {
                Some(bytes) => match Decoder::new(Cursor::new(bytes.clone())) {
                    Ok(source) => self
                        .handle
                        .play_raw(source.amplify(volume).convert_samples()),
                    Err(err) => {
                        debug!("cannot decode {:?}: {err}", name);
                        return;
                    }
                },
                None => {
                    let (freq, ms) = name.tone();
                    self.handle.play_raw(
                        SineWave::new(freq)
                            .take_duration(Duration::from_millis(ms))
                            .amplify(volume * 0.3),
                    )
                }
            };
            if let Err(err) = result {
                debug!("playback of {:?} failed: {err}", name);
            }
        }
    }
}
