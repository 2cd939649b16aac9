pub mod analysis;
pub mod folder;
pub mod product;
pub mod response;
