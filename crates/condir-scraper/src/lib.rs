//! Browser-driven harvesting of paginated contractor directories.
//!
//! [`Harvester`] owns the loop; everything it touches goes through a
//! [`BrowserSession`], so the same pipeline runs against headless Chrome or
//! against saved HTML snapshots.

pub mod dedup;
pub mod error;
pub mod extract;
pub mod harvest;
pub mod normalize;
pub mod page;
pub mod pagination;
pub mod profile;
pub mod session;

pub use dedup::Deduplicator;
pub use error::{ClickError, ScraperError, SessionError};
pub use extract::extract_listing;
pub use harvest::{HarvestConfig, HarvestOutcome, HarvestState, Harvester, StopReason};
pub use normalize::{clean_phone, clean_rating, normalize_listing};
pub use page::{extract_page, PageReport, ScrollPlan};
pub use pagination::{go_to_page, Advance, NavTiming};
pub use profile::CompiledProfile;
pub use session::{BrowserSession, ChromeOptions, ChromeSession, Control, SnapshotSession};
