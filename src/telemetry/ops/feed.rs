use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Feed;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Add, AutoFollow, List }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self { Phase::Add => "add", Phase::AutoFollow => "auto_follow", Phase::List => "list" } }
    fn span(&self) -> Span { match self { Phase::Add => info_span!("add"), Phase::AutoFollow => info_span!("auto_follow"), Phase::List => info_span!("list") } }
}

impl OpMarker for Feed {
    const NAME: &'static str = "feed";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("feed") }
}
