//! Provider adapters and the fallback chain.
//!
//! Every upstream implements [`ProviderAdapter`]. Concrete adapters talk to
//! one kind of service ([`HostedChatAdapter`], [`LocalGenerateAdapter`]);
//! decorators add behaviour around any adapter ([`TimeoutAdapter`],
//! [`RetryingAdapter`], [`EnrichingAdapter`]). [`ProviderRegistry`] orders
//! them by priority and walks the chain.

pub mod cancel;
pub mod enrichment;
pub mod hosted;
pub(crate) mod http;
pub mod local;
pub mod registry;
pub mod retry;
pub mod schedule;
pub mod traits;

pub use cancel::{TimeoutAdapter, with_deadline};
pub use enrichment::{EnrichingAdapter, EnrichmentConfig};
pub use hosted::HostedChatAdapter;
pub use local::LocalGenerateAdapter;
pub use registry::ProviderRegistry;
pub use retry::{RetryConfig, RetryDecision, RetryingAdapter};
pub use schedule::{ScheduleClient, ScheduleConfig, ScheduleEvent};
pub use traits::{CallContext, ProviderAdapter};
