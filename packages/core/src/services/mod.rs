//! Tree Services
//!
//! Business logic over the page tree, split by concern:
//!
//! - [`TreeMutator`] - structural writes (create, update, move, delete,
//!   publish, repair)
//! - [`TreeReader`] - hierarchy queries (roots, ancestors, descendants,
//!   children, siblings)
//! - [`PathResolver`] - URL resolution by walking ancestor slugs
//! - [`TreeRebuilder`] - in-memory forest reconstruction backing `fix_tree`
//!
//! All services share one `Arc<dyn TreeStore>` and are cheap to construct.

pub mod error;
pub mod events;
pub mod mutator;
pub mod reader;
pub mod rebuilder;
pub mod registry;
pub mod resolver;

pub use error::TreeServiceError;
pub use events::{DeleteVeto, MutationEvent, TreeObserver};
pub use mutator::TreeMutator;
pub use reader::{ReadOpts, TreeReader};
pub use rebuilder::TreeRebuilder;
pub use registry::{ContentTypeRegistry, SpecificStore};
pub use resolver::PathResolver;
