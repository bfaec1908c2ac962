pub mod commands;
pub mod render;

use clap::ValueEnum;
use manimatic_app_core::SessionFilter;

/// Keys accepted by `config set`.
#[derive(ValueEnum, Clone, Debug, Copy)]
pub enum ConfigKey {
    ApiBaseUrl,
    GenerationTimeoutMs,
    NoticeTtlMs,
    SessionFilter,
}

#[derive(ValueEnum, Clone, Debug, Copy)]
pub enum CliSessionFilter {
    Pinned,
    Off,
}

impl From<CliSessionFilter> for SessionFilter {
    fn from(f: CliSessionFilter) -> Self {
        match f {
            CliSessionFilter::Pinned => SessionFilter::Pinned,
            CliSessionFilter::Off => SessionFilter::Off,
        }
    }
}
