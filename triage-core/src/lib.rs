pub mod clock;
pub mod config;
pub mod desk;
pub mod error;
pub mod health;
pub mod kpi;
pub mod lifecycle;
pub mod model;
pub mod recommend;
pub mod sla;
pub mod store;
pub mod timeline;
pub mod triage;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, SlaBudgets, TriageConfig};
pub use desk::OpsDesk;
pub use error::{StoreError, TriageError};
pub use lifecycle::{IncidentPatch, PatchFields};
pub use model::{EventKind, Incident, Priority, Role, Status, TimelineEvent};
pub use store::{IncidentStore, MemoryStore, SqliteStore};
