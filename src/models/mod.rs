pub mod member;
pub mod stream;
pub mod team;

use serde::Deserialize;

pub use member::{BroadcasterType, Member};
pub use stream::LiveStatusEntry;
pub use team::{BroadcasterTeam, Team, TeamInfo, TeamUser};

/// Envelope every Helix list response is wrapped in.
#[derive(Debug, Deserialize)]
pub struct DataResponse<T> {
    pub data: Vec<T>,
}
