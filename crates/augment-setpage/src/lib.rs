//! Eight-page project-library multiplexer.

mod detect;
mod error;
mod poll;
mod state;
mod swap;
mod xattrs;

pub use detect::{find_unique_size_match, looks_like_a_copy, stamp_copy_source};
pub use error::{Result, SetPageError};
pub use poll::{
 force_current_song_index_zero, match_song_index, read_current_song_index, MatchedSet,
};
pub use state::{SetPageState, NUM_PAGES};
pub use swap::{run_swap, SwapHost, SwapPlan};
pub use xattrs::{restore_xattrs, save_xattrs, TRACKED_XATTRS};
