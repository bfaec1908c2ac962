use std::time::Duration;

use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use humansize::{format_size, DECIMAL};
use manimatic_app_core::viewmodel::compile_error_vm;
use manimatic_app_core::{
    ClientSettings, HttpBackend, SessionOrchestrator, SessionPhase, SessionState, SettingsStore,
};
use manimatic_core::{FeaturesResponse, ModelsResponse};
use manimatic_infra::net::normalize_base;
use manimatic_infra::{default_http_client, download_artifact, ApiClient};
use tracing::info;

use crate::{render, CliSessionFilter, ConfigKey};

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub prompt: String,
    pub model: Option<String>,
    /// Return as soon as the script arrives instead of waiting for the render.
    pub no_video: bool,
    pub script_out: Option<Utf8PathBuf>,
    pub download: Option<Utf8PathBuf>,
    pub render_timeout: Duration,
}

impl GenerateOptions {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            no_video: false,
            script_out: None,
            download: None,
            render_timeout: Duration::from_secs(manimatic_config::DEFAULT_RENDER_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub download: Option<Utf8PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionOutcome {
    pub script: Option<String>,
    pub video_url: Option<String>,
    pub downloaded_bytes: Option<u64>,
}

fn api(settings: &ClientSettings) -> Result<ApiClient> {
    let client = default_http_client().context("Failed to build HTTP client")?;
    Ok(ApiClient::new(client, &settings.api_base_url)?)
}

async fn open_session(settings: &ClientSettings) -> Result<SessionOrchestrator<HttpBackend>> {
    let backend = HttpBackend::new(&settings.api_base_url)
        .with_context(|| format!("Invalid backend URL {}", settings.api_base_url))?;
    let mut orch = SessionOrchestrator::new(backend, settings.clone());
    orch.mount()
        .await
        .with_context(|| format!("Could not connect to {}", settings.api_base_url))?;
    info!("{}", render::gate_summary(&orch.state().features));
    Ok(orch)
}

/// Turn an errored session into a CLI error, with diagnostics when present.
fn bail_on_error(state: &SessionState) -> Result<()> {
    if let SessionPhase::Errored(_) = state.phase {
        if let Some(diag) = state.compile_diagnostics() {
            bail!("{}", render::compile_error(&compile_error_vm(diag)));
        }
        let msg = state
            .last_error
            .as_ref()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "Request failed".into());
        bail!("{msg}");
    }
    Ok(())
}

fn resolve_video_url(settings: &ClientSettings, url: &str) -> Result<String> {
    let base = normalize_base(&settings.api_base_url)?;
    let resolved = base
        .join(url)
        .with_context(|| format!("Invalid video URL {url}"))?;
    Ok(resolved.to_string())
}

async fn fetch_video(url: &str, target: &Utf8Path) -> Result<u64> {
    let client = default_http_client().context("Failed to build HTTP client")?;
    let pb = render::spinner(format!("Downloading {url}"));
    let written = download_artifact(&client, url, target)
        .await
        .with_context(|| format!("Failed to download {url}"))?;
    pb.finish_with_message(format!(
        "Saved {} to {target}",
        format_size(written, DECIMAL)
    ));
    Ok(written)
}

pub async fn cmd_health(settings: &ClientSettings) -> Result<()> {
    println!(":: Probing {}", settings.api_base_url);
    api(settings)?
        .healthz()
        .await
        .context("Health check failed. Unable to connect to the server.")?;
    println!("   Status: reachable");
    Ok(())
}

pub async fn cmd_features(settings: &ClientSettings) -> Result<FeaturesResponse> {
    let resp = api(settings)?
        .features()
        .await
        .context("Failed to fetch features")?;
    print!("{}", render::features_table(&resp));
    Ok(resp)
}

pub async fn cmd_models(settings: &ClientSettings) -> Result<ModelsResponse> {
    let resp = api(settings)?
        .models()
        .await
        .context("Failed to fetch models")?;
    print!("{}", render::models_list(&resp));
    Ok(resp)
}

pub async fn cmd_generate(settings: &ClientSettings, opts: GenerateOptions) -> Result<SessionOutcome> {
    let mut orch = open_session(settings).await?;

    if let Some(model) = &opts.model {
        orch.select_model(model.as_str())?;
    }
    orch.set_prompt(opts.prompt.as_str());

    println!(":: Generating animation");
    if let Some(model) = orch.state().selected_model {
        println!("   Model: {model}");
    }

    let pb = render::spinner("Writing animation script…");
    orch.generate().await?;
    orch.run_until(|s| !s.script_loading()).await;
    pb.finish_and_clear();

    let state = orch.state();
    bail_on_error(&state)?;
    let script = state.script.clone().unwrap_or_default();

    if let Some(out) = &opts.script_out {
        tokio::fs::write(out.as_std_path(), &script)
            .await
            .with_context(|| format!("Failed to write script to {out}"))?;
        println!("   Script: {out}");
    } else {
        println!("\n{script}\n");
    }

    let mut outcome = SessionOutcome {
        script: Some(script),
        ..SessionOutcome::default()
    };
    if opts.no_video {
        return Ok(outcome);
    }

    let pb = render::spinner("Rendering video…");
    let finished = tokio::time::timeout(
        opts.render_timeout,
        orch.run_until(|s| !s.video_loading()),
    )
    .await;
    pb.finish_and_clear();
    if finished.is_err() {
        bail!("Rendering did not finish in time");
    }

    let state = orch.state();
    bail_on_error(&state)?;
    finish_video(settings, &state, opts.download.as_deref(), &mut outcome).await?;
    Ok(outcome)
}

pub async fn cmd_compile(
    settings: &ClientSettings,
    script_path: &Utf8Path,
    opts: CompileOptions,
) -> Result<SessionOutcome> {
    let script = tokio::fs::read_to_string(script_path.as_std_path())
        .await
        .with_context(|| format!("Failed to read {script_path}"))?;

    let mut orch = open_session(settings).await?;
    orch.edit_script(script.as_str())?;

    println!(":: Compiling {script_path}");
    let pb = render::spinner("Rendering video…");
    orch.compile().await?;
    orch.run_until(|s| !s.compiling).await;
    pb.finish_and_clear();

    let state = orch.state();
    bail_on_error(&state)?;

    let mut outcome = SessionOutcome {
        script: Some(script),
        ..SessionOutcome::default()
    };
    finish_video(settings, &state, opts.download.as_deref(), &mut outcome).await?;
    Ok(outcome)
}

async fn finish_video(
    settings: &ClientSettings,
    state: &SessionState,
    download: Option<&Utf8Path>,
    outcome: &mut SessionOutcome,
) -> Result<()> {
    let Some(url) = &state.video_url else {
        bail!("The backend reported no video");
    };
    let url = resolve_video_url(settings, url)?;
    println!("   Video: {url}");

    if let Some(target) = download {
        outcome.downloaded_bytes = Some(fetch_video(&url, target).await?);
    }
    outcome.video_url = Some(url);
    Ok(())
}

pub fn cmd_config_show(store: &SettingsStore) -> Result<ClientSettings> {
    let settings = store.load()?;
    println!(":: {}", store.settings_path()?.display());
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(settings)
}

pub fn cmd_config_set(store: &SettingsStore, key: ConfigKey, value: &str) -> Result<ClientSettings> {
    let mut settings = store.load()?;
    match key {
        ConfigKey::ApiBaseUrl => {
            normalize_base(value)?;
            settings.api_base_url = value.trim().to_string();
        }
        ConfigKey::GenerationTimeoutMs => {
            let ms: u64 = value
                .parse()
                .with_context(|| format!("Not a number of milliseconds: {value}"))?;
            settings.generation_timeout_ms = manimatic_config::clamp_timeout_ms(ms);
        }
        ConfigKey::NoticeTtlMs => {
            settings.notice_ttl_ms = value
                .parse()
                .with_context(|| format!("Not a number of milliseconds: {value}"))?;
        }
        ConfigKey::SessionFilter => {
            let filter = <CliSessionFilter as clap::ValueEnum>::from_str(value, true)
                .map_err(|e| anyhow::anyhow!("Invalid session filter {value}: {e}"))?;
            settings.session_filter = filter.into();
        }
    }
    store.save(&settings)?;
    println!(":: Saved {}", store.settings_path()?.display());
    Ok(settings)
}
