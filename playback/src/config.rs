/*!
    Player tunables and their JSON persistence.
*/

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use media_types::{Error, OutputFormat, Result, Size};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::scale_solver::ScaleLimits;

/**
    How decoded video is laid out in the frame pool.
*/
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoOutputConfig {
    pub format: OutputFormat,
    pub bgr_order: bool,
    /// Rescale every frame to this geometry. `None` delivers frames at
    /// their decoded size.
    pub target: Option<Size>,
}

/**
    Gated audio/video sync. When present it replaces the frame-rate governor.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvSyncConfig {
    /// Video frames further ahead of the shared clock than this wait.
    pub threshold_ms: u64,
}

impl Default for AvSyncConfig {
    fn default() -> Self {
        Self { threshold_ms: 40 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Audio chunks held between extraction and decode before dropping.
    pub audio_queue_capacity: usize,
    pub dequeue_timeout_ms: u64,
    /// Bounded wait for workers to acknowledge a stop request.
    pub stop_timeout_ms: u64,
    /// Frame rate assumed when the container reports none.
    pub default_fps: u32,
    /// Pacing delays above this are treated as bogus and skipped.
    pub governor_ceiling_ms: u64,
    pub pcm_pacing_percent: u32,
    pub decoded_pacing_percent: u32,
    pub pacing_ceiling_ms: u64,
    pub decode_buffer_size: usize,
    pub decode_buffer_headroom: usize,
    pub max_compressed_frame: usize,
    pub video: VideoOutputConfig,
    pub scaler: ScaleLimits,
    pub av_sync: Option<AvSyncConfig>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            audio_queue_capacity: 32,
            dequeue_timeout_ms: 100,
            stop_timeout_ms: 2000,
            default_fps: 30,
            governor_ceiling_ms: 1000,
            pcm_pacing_percent: 60,
            decoded_pacing_percent: 40,
            pacing_ceiling_ms: 50,
            decode_buffer_size: 4096,
            decode_buffer_headroom: 1024,
            max_compressed_frame: 512 * 1024,
            video: VideoOutputConfig::default(),
            scaler: ScaleLimits::default(),
            av_sync: None,
        }
    }
}

impl PlayerConfig {
    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn governor_ceiling(&self) -> Duration {
        Duration::from_millis(self.governor_ceiling_ms)
    }

    pub fn pacing_ceiling(&self) -> Duration {
        Duration::from_millis(self.pacing_ceiling_ms)
    }

    /**
        Reject settings the pipeline cannot run with.
    */
    pub fn validate(&self) -> Result<()> {
        if self.audio_queue_capacity == 0 {
            return Err(Error::invalid_argument("audio queue capacity must be non-zero"));
        }
        if self.dequeue_timeout_ms == 0 {
            return Err(Error::invalid_argument("dequeue timeout must be non-zero"));
        }
        if self.stop_timeout_ms == 0 {
            return Err(Error::invalid_argument("stop timeout must be non-zero"));
        }
        if self.default_fps == 0 {
            return Err(Error::invalid_argument("default fps must be non-zero"));
        }
        if self.pcm_pacing_percent > 100 || self.decoded_pacing_percent > 100 {
            return Err(Error::invalid_argument("pacing percentages must be within 0..=100"));
        }
        if self.decode_buffer_size == 0 {
            return Err(Error::invalid_argument("decode buffer size must be non-zero"));
        }
        if self.scaler.frag == 0 || self.scaler.k_max == 0 {
            return Err(Error::invalid_argument("scaler limits must be non-zero"));
        }
        if let Some(target) = self.video.target {
            if target.is_empty() {
                return Err(Error::invalid_argument(format!("target geometry {target} is empty")));
            }
        }
        Ok(())
    }

    /**
        `<config dir>/playback/player.json`, if the platform has a config dir.
    */
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("playback").join("player.json"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| Error::invalid_argument(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /**
        Like [`load`](Self::load), but a missing file yields the defaults.
    */
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("no player config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /**
        Load from [`default_path`](Self::default_path), falling back to
        defaults when there is no file or no config dir.
    */
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::invalid_argument(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }
}
