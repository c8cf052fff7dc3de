pub mod fs;
pub mod node;
pub mod path;

pub use fs::{DirEntry, FileKind, FileStat, VirtualFs};
pub use node::{DisplayNode, materialize};
pub use path::{VirtualPath, parent_prefix};
