/*!
    Audio codec transforms, codec registry and sinks.

    A codec transform is an opaque "feed a compressed chunk, get PCM out"
    unit; the registry maps codec kinds to factories so that the playback
    core can create the right transform lazily. Sinks receive the PCM.

    With the `cpal-output` feature a [`CpalSink`] plays PCM on the default
    output device.
*/

mod codec;
mod registry;
mod sink;

#[cfg(feature = "cpal-output")]
mod output;

pub use codec::{AudioCodec, CodecError, Decoded};
pub use registry::{CodecFactory, CodecRegistry};
pub use sink::AudioSink;

#[cfg(feature = "cpal-output")]
pub use output::CpalSink;
