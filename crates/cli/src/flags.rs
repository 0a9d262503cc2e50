use clap::ValueEnum;
use facet_catalog::NodeKind;

#[derive(Copy, Clone, ValueEnum)]
pub(crate) enum KindFlag {
    #[value(alias = "g")]
    Goal,
    #[value(alias = "e")]
    Expectation,
    #[value(alias = "f")]
    Facet,
}

impl KindFlag {
    pub(crate) const fn as_domain(self) -> NodeKind {
        match self {
            KindFlag::Goal => NodeKind::Goal,
            KindFlag::Expectation => NodeKind::Expectation,
            KindFlag::Facet => NodeKind::Facet,
        }
    }
}

#[derive(Copy, Clone, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum FormatFlag {
    #[default]
    Text,
    Json,
}
