pub mod image_decode;
pub mod loaders;
pub mod model_cache;
pub mod texture_cache;

pub use image_decode::{DecodedImage, decode_bytes, decode_file};
pub use model_cache::{ModelCache, ModelShape};
pub use texture_cache::TextureCache;
