#[cfg(feature = "ssr")]
mod relay;
#[cfg(feature = "ssr")]
pub use relay::*;
