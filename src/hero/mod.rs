pub mod admission;
pub mod manager;
pub mod model;
pub mod rotation;
pub mod selector;

pub use admission::UploadCandidate;
pub use manager::HeroManager;
pub use model::HeroError;
pub use rotation::HeroCarousel;
