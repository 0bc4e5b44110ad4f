/*!
    Codec kind to codec factory mapping.
*/

use std::collections::HashMap;
use std::fmt;

use media_types::{AudioCodecKind, Error, PcmFormat, Result};
use tracing::debug;

use crate::codec::AudioCodec;

/**
    Creates a codec transform for a stream with the given format.
*/
pub type CodecFactory = Box<dyn Fn(PcmFormat) -> Result<Box<dyn AudioCodec>> + Send + Sync>;

/**
    Registered codec factories, keyed by codec kind.

    Uncompressed PCM never needs an entry.
*/
#[derive(Default)]
pub struct CodecRegistry {
    factories: HashMap<AudioCodecKind, CodecFactory>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /**
        Register `factory` for `kind`, replacing any previous entry.
    */
    pub fn register<F>(&mut self, kind: AudioCodecKind, factory: F) -> &mut Self
    where
        F: Fn(PcmFormat) -> Result<Box<dyn AudioCodec>> + Send + Sync + 'static,
    {
        if self.factories.insert(kind, Box::new(factory)).is_some() {
            debug!("replaced codec factory for {kind}");
        }
        self
    }

    pub fn supports(&self, kind: AudioCodecKind) -> bool {
        self.factories.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = AudioCodecKind> + '_ {
        self.factories.keys().copied()
    }

    /**
        Create a codec for `kind`.

        Fails with `UnsupportedCodec` if nothing is registered for it.
    */
    pub fn create(&self, kind: AudioCodecKind, format: PcmFormat) -> Result<Box<dyn AudioCodec>> {
        let factory = self
            .factories
            .get(&kind)
            .ok_or_else(|| Error::UnsupportedCodec(format!("no codec registered for {kind}")))?;
        factory(format)
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}
