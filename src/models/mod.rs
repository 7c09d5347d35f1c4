pub mod image_record;
pub mod page;
pub mod placement;
pub mod query;

pub use image_record::*;
pub use page::*;
pub use placement::*;
pub use query::*;
