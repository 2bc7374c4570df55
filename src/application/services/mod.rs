mod prewarmer;

pub use prewarmer::{Prewarmer, collect_image_urls};
