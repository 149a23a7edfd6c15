pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

pub fn agg() -> LogCtx<ops::agg::Agg> { LogCtx::new(config::logs_are_json()) }
pub fn feed() -> LogCtx<ops::feed::Feed> { LogCtx::new(config::logs_are_json()) }
pub fn follow() -> LogCtx<ops::follow::Follow> { LogCtx::new(config::logs_are_json()) }
pub fn user() -> LogCtx<ops::user::User> { LogCtx::new(config::logs_are_json()) }
pub fn browse() -> LogCtx<ops::browse::Browse> { LogCtx::new(config::logs_are_json()) }
pub fn init() -> LogCtx<ops::init::Init> { LogCtx::new(config::logs_are_json()) }
