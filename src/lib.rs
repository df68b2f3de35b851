//! In-memory, Unix-like filesystem core: a permission-checked namespace
//! over a fixed-capacity, cached content store, with snapshot persistence.

mod cache;
mod config;
mod disk;
mod filesystem;
mod flusher;
mod identity;
mod mode;
mod node;
mod node_id;
mod nodes;
mod path;
pub mod permission;
mod session;
mod snapshot;
mod store;
mod users;

pub use self::cache::*;
pub use self::config::*;
pub use self::disk::*;
pub use self::filesystem::*;
pub use self::flusher::*;
pub use self::identity::*;
pub use self::mode::*;
pub use self::node::*;
pub use self::node_id::*;
pub use self::nodes::*;
pub use self::path::*;
pub use self::permission::Access;
pub use self::session::*;
pub use self::snapshot::*;
pub use self::store::*;
pub use self::users::*;
