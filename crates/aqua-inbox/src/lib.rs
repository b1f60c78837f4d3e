//! Comparing a received page history against the local one before import.
//!
//! A remote page lands in the inbox under its own title. [`TreeBuilder`]
//! lines its chain up with the local page's chain, and [`fast_forward`]
//! appends the remote tail when the local page has not moved on.

mod error;
mod forward;
mod tree;

pub use error::InboxError;
pub use forward::{fast_forward, FastForward};
pub use tree::{ChangeType, MergeTree, NodeSource, TreeBuilder, TreeNode};
