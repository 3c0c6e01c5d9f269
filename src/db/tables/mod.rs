//! Database table operations

mod artist_table;
mod event_table;
mod movie_table;
mod offset_table;
mod person_table;
mod playlist_table;
mod podcast_table;
mod release_table;
mod session_table;
mod station_table;
mod track_table;
mod tv_table;
mod user_table;

pub use artist_table::ArtistTable;
pub use event_table::{EventSource, EventTable};
pub use movie_table::MovieTable;
pub use offset_table::OffsetTable;
pub use person_table::PersonTable;
pub use playlist_table::PlaylistTable;
pub use podcast_table::PodcastTable;
pub use release_table::ReleaseTable;
pub use session_table::{CodeTable, SessionTable};
pub use station_table::StationTable;
pub use track_table::TrackTable;
pub use tv_table::TvTable;
pub use user_table::UserTable;
