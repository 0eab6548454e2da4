mod rate_limiter;
mod request;
mod user_agents;

pub use rate_limiter::RateLimiter;
pub use request::{FetchOptions, RequestFetcher};
pub use user_agents::{classify_response, select_user_agent, BrowserClass};
