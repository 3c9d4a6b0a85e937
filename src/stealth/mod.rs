//! Stealth profile (C6): randomised per-context browser fingerprint plus
//! the companion DOM-patching script, injected before any page script runs.

pub mod profile;
pub mod script;

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::browser::GetVersionParams;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use tracing::{debug, warn};

pub use profile::{StealthProfile, Viewport, random_profile};

/// Round-robin selector over a configured list of outbound proxy URLs
/// (spec §4.6: "an optional outbound proxy... chosen round-robin").
#[derive(Default)]
pub struct ProxyRotation {
    proxies: Vec<String>,
    next: AtomicUsize,
}

impl ProxyRotation {
    #[must_use]
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies,
            next: AtomicUsize::new(0),
        }
    }

    /// Returns the next proxy URL in round-robin order, or `None` if no
    /// proxies are configured.
    pub fn next_proxy(&self) -> Option<&str> {
        if self.proxies.is_empty() {
            return None;
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.proxies.len();
        Some(self.proxies[idx].as_str())
    }
}

/// Apply a stealth profile to a freshly created page: viewport/device
/// metrics, UA override, and the pre-navigation DOM-patching script. Must
/// run before any navigation so the script executes ahead of page script in
/// every frame.
pub async fn apply_to_page(page: &Page, profile: &StealthProfile) -> Result<()> {
    let session_seed: Vec<u8> = (0..16).map(|_| rand::random::<u8>()).collect();
    let session_seed_hex = hex::encode(session_seed);

    page.execute(SetDeviceMetricsOverrideParams {
        width: profile.viewport.width as i64,
        height: profile.viewport.height as i64,
        device_scale_factor: profile.device_scale_factor,
        mobile: profile.mobile,
        scale: None,
        screen_width: None,
        screen_height: None,
        position_x: None,
        position_y: None,
        dont_set_visible_size: None,
        screen_orientation: None,
        viewport: None,
        display_feature: None,
        device_posture: None,
    })
    .await
    .context("failed to set device metrics override")?;

    let script = script::build_script(profile, &session_seed_hex);
    page.execute(AddScriptToEvaluateOnNewDocumentParams {
        source: script,
        include_command_line_api: None,
        world_name: None,
        run_immediately: None,
    })
    .await
    .context("failed to inject stealth script")?;

    match page.execute(GetVersionParams {}).await {
        Ok(version) => {
            let ua = if !profile.user_agent.is_empty() {
                profile.user_agent.to_string()
            } else {
                version.user_agent.replace("Headless", "")
            };
            if let Err(err) = page
                .execute(SetUserAgentOverrideParams {
                    user_agent: ua,
                    accept_language: Some(profile.locale.to_string()),
                    platform: Some(profile.platform.to_string()),
                    user_agent_metadata: None,
                })
                .await
            {
                warn!(error = %err, "failed to set user-agent override, continuing anyway");
            }
        }
        Err(err) => warn!(error = %err, "failed to query browser version, skipping UA override"),
    }

    debug!(platform = profile.platform, "stealth profile applied to page");
    Ok(())
}

/// Build the extra HTTP headers a context should send so they agree with
/// the chosen profile's user-agent and Client-Hints (spec §4.6).
#[must_use]
pub fn extra_headers(profile: &StealthProfile) -> Vec<(&'static str, String)> {
    vec![
        ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".to_string()),
        ("Accept-Language", format!("{},en;q=0.8", profile.locale)),
        ("DNT", "1".to_string()),
        ("Upgrade-Insecure-Requests", "1".to_string()),
        ("Sec-CH-UA", profile.sec_ch_ua.to_string()),
        ("Sec-CH-UA-Platform", profile.sec_ch_ua_platform.to_string()),
        ("Sec-CH-UA-Mobile", if profile.mobile { "?1".to_string() } else { "?0".to_string() }),
    ]
}
