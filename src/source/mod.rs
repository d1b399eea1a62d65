// In-process source registry: fans a publisher's messages out to zero or
// more player consumers, keyed by vhost/app/stream.

mod consumer;
mod registry;
mod source;

pub use consumer::Consumer;
pub use registry::SourceRegistry;
pub use source::Source;
