//! Data models shared by the API client, the upload engine and the CLI.

mod upload;
mod video;

pub use upload::*;
pub use video::*;
