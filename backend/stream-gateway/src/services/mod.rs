pub mod backend;
pub mod calendar;
pub mod clock;
pub mod orchestrator;
pub mod origin;
pub mod overrides;
pub mod url_cache;

pub use backend::{Backend, BackendRouter};
pub use clock::{Clock, ManualClock, SystemClock};
pub use orchestrator::{Redirect, RedirectSource, StreamOrchestrator, StreamParams, StreamRequest};
pub use origin::{EmbyClient, MediaPathResolver, OriginError};
pub use overrides::{OverrideResolver, OverrideRule};
pub use url_cache::UrlCache;
