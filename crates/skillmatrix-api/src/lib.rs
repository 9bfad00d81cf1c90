pub mod applications;
pub mod candidates;
pub mod companies;
mod convert;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod matrix;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod profiles;
pub mod routes;
pub mod skills;
pub mod state;
pub mod stats;
pub mod video_calls;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
