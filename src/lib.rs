pub mod header;
pub mod io;
pub mod types;

pub mod attr;
pub mod stream;

pub mod block;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod skeleton;

pub mod weld;
pub mod write;

pub const FORMAT_VERSION_MAJOR: u8 = 2;
pub const FORMAT_VERSION_MINOR: u8 = 0;
pub const MAGIC: [u8; 3] = [b'A', b'W', b'D'];

pub type HashMap<K, V> = rapidhash::RapidHashMap<K, V>;

pub use block::{Block, BlockType, RefTarget};
pub use types::{Address, AttrValue, Encoding, Matrix4, Transform};
pub use write::{AddressMode, AwdDocument, AwdSettings, WriteError};
