pub mod chunk;
pub mod links;
pub mod media;
pub mod storage;
pub mod upload;
