mod api;
pub mod dto;
pub mod response;
mod router;
mod storage;

pub use router::{AppState, create_router};
