pub mod poll;
pub mod project;
pub mod snapshot;

pub use poll::{
    AlarmStatus, ChannelStatus, PollFailure, PollResult, PollState, ProjectOverview, TickReport,
};
pub use project::{NewProject, Project};
pub use snapshot::{Reading, Snapshot, Timestamp};
