use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Follow;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Resolve, Follow, List, Unfollow }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Resolve => "resolve",
        Phase::Follow => "follow",
        Phase::List => "list",
        Phase::Unfollow => "unfollow",
    }}
    fn span(&self) -> Span { match self {
        Phase::Resolve => info_span!("resolve"),
        Phase::Follow => info_span!("follow"),
        Phase::List => info_span!("list"),
        Phase::Unfollow => info_span!("unfollow"),
    }}
}

impl OpMarker for Follow {
    const NAME: &'static str = "follow";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("follow") }
}
