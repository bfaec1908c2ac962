use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use manimatic_app_core::viewmodel::CompileErrorVm;
use manimatic_app_core::FeatureGate;
use manimatic_core::{FeaturesResponse, ModelsResponse};

pub fn spinner(msg: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn features_table(resp: &FeaturesResponse) -> String {
    let mut out = format!(":: Backend version {}\n", resp.version);
    let width = resp.features.iter().map(|f| f.key.len()).max().unwrap_or(0);
    for f in &resp.features {
        let mark = if f.enabled { "on " } else { "off" };
        out.push_str(&format!(
            "   [{mark}] {:<width$}  {}\n",
            f.key, f.description
        ));
    }
    out
}

pub fn models_list(resp: &ModelsResponse) -> String {
    let preferred = resp.preferred();
    let mut out = String::from(":: Available models\n");
    for m in &resp.models {
        let marker = if Some(m.as_str()) == preferred {
            " (default)"
        } else {
            ""
        };
        out.push_str(&format!("   {m}{marker}\n"));
    }
    out
}

pub fn gate_summary(gate: &FeatureGate) -> String {
    match gate {
        FeatureGate::NotLoaded => "feature flags not loaded".into(),
        FeatureGate::Unavailable => "feature flags unavailable".into(),
        FeatureGate::Loaded { .. } => {
            let keys = gate.enabled_keys();
            if keys.is_empty() {
                "no optional features enabled".into()
            } else {
                format!("enabled features: {}", keys.join(", "))
            }
        }
    }
}

/// Plain-text rendering of the compile diagnostics, one section per tab.
pub fn compile_error(vm: &CompileErrorVm) -> String {
    let mut out = format!("{}\n", vm.title);
    for tab in &vm.tabs {
        out.push_str(&format!("\n--- {} ---\n{}\n", tab.label, tab.content.trim_end()));
    }
    out
}
