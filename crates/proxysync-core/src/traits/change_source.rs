// # Change Source Trait
//
// Source of "file changed" notifications for the configuration directory and
// the proxy config directory.
//
// ## Implementations
//
// - `notify`-based OS watcher: `proxysync-watch-notify` crate
//
// ## Usage
//
// ```rust,ignore
// let mut stream = source.watch();
// while let Some(event) = stream.next().await {
//     println!("changed: {}", event.path.display());
// }
// ```

use std::pin::Pin;
use tokio_stream::Stream;

use crate::watch::FileChangeEvent;

/// Trait for file-change event sources
///
/// The source owns its background listener. Dropping the source stops it;
/// the stream then ends.
pub trait ChangeSource: Send + Sync {
    /// Stream of change notifications
    ///
    /// May only be called once.
    fn watch(&self) -> Pin<Box<dyn Stream<Item = FileChangeEvent> + Send + 'static>>;
}
