//! Item source: where work items come from
//!
//! This module handles:
//! - The `ItemSource` boundary the pipeline consumes
//! - An HTTP media-feed client implementing it
//! - Reusable session tokens (`CredentialProvider`)
//! - Reading and writing work-item list files
//! - Pulling post identifiers out of saved profile pages

mod feed;
mod html;
mod list_file;
mod session;
mod traits;

pub use feed::FeedClient;
pub use html::{extract_shortcodes_from_html, load_shortcodes};
pub use list_file::{load_video_list, save_video_list};
pub use session::{CredentialProvider, SessionFileProvider};
pub use traits::ItemSource;
