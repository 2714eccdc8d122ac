pub mod kakomon;

pub use kakomon::{build_kakomon_body, build_kakomon_request, KakomonConfig, KakomonRequest};
