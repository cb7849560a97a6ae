//! Tree model of a mirrored work
//!
//! A [`Work`] owns an ordered list of [`Unit`]s, each of which owns an ordered
//! list of [`Item`]s. Sequence numbers (`num`) are the stable identities used
//! to match entities across runs.
//!
//! # Components
//!
//! - `Work`, `Unit`, `Item`: the entities, serializable to the cache format
//! - `WorkId`, `UnitKey`, `ItemKey`: non-owning back-references
//! - `StateError`: a handle did not resolve against the tree it was given

mod handle;
mod item;
mod unit;
mod work;

pub use handle::{ItemKey, StateError, UnitKey, WorkId};
pub use item::{derive_filename, Item, ALLOWED_EXTENSIONS};
pub use unit::Unit;
pub use work::Work;

/// Characters that are replaced with `_` in directory names
const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*', '.'];

/// Turns a title into a name that is safe to use as a single path component
pub fn sanitize_directory_name(title: &str) -> String {
    title
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
