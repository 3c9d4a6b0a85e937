//! Stealth profile data model (C6): a randomised, internally consistent
//! browser fingerprint drawn from a small fixed pool.

use rand::seq::IndexedRandom;

#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// `(UA, viewport, locale, timezone, platform, mobile)` plus the derived
/// WebGL vendor/renderer and hardware fingerprints used by the injected
/// script. Every field in a given profile is mutually consistent: a
/// "Windows" platform never pairs with a macOS user-agent string.
#[derive(Debug, Clone, Copy)]
pub struct StealthProfile {
    pub user_agent: &'static str,
    pub viewport: Viewport,
    pub locale: &'static str,
    pub timezone: &'static str,
    pub platform: &'static str,
    pub mobile: bool,
    pub touch: bool,
    pub device_scale_factor: f64,
    pub hardware_concurrency: u32,
    pub device_memory_gb: u32,
    pub webgl_vendor: &'static str,
    pub webgl_renderer: &'static str,
    pub sec_ch_ua: &'static str,
    pub sec_ch_ua_platform: &'static str,
}

/// Small fixed pool; every entry keeps platform, UA family, and Client-Hints
/// in agreement (spec §4.6).
static PROFILE_POOL: &[StealthProfile] = &[
    StealthProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36",
        viewport: Viewport { width: 1920, height: 1080 },
        locale: "en-US",
        timezone: "America/New_York",
        platform: "Win32",
        mobile: false,
        touch: false,
        device_scale_factor: 1.0,
        hardware_concurrency: 8,
        device_memory_gb: 8,
        webgl_vendor: "Google Inc. (Intel)",
        webgl_renderer: "ANGLE (Intel, Intel(R) UHD Graphics Direct3D11 vs_5_0 ps_5_0)",
        sec_ch_ua: "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"132\", \"Google Chrome\";v=\"132\"",
        sec_ch_ua_platform: "\"Windows\"",
    },
    StealthProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36",
        viewport: Viewport { width: 1680, height: 1050 },
        locale: "en-US",
        timezone: "America/Los_Angeles",
        platform: "MacIntel",
        mobile: false,
        touch: false,
        device_scale_factor: 2.0,
        hardware_concurrency: 10,
        device_memory_gb: 16,
        webgl_vendor: "Google Inc. (Apple)",
        webgl_renderer: "ANGLE (Apple, Apple M2, OpenGL 4.1)",
        sec_ch_ua: "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"132\", \"Google Chrome\";v=\"132\"",
        sec_ch_ua_platform: "\"macOS\"",
    },
    StealthProfile {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36",
        viewport: Viewport { width: 1366, height: 768 },
        locale: "en-GB",
        timezone: "Europe/London",
        platform: "Linux x86_64",
        mobile: false,
        touch: false,
        device_scale_factor: 1.0,
        hardware_concurrency: 4,
        device_memory_gb: 4,
        webgl_vendor: "Google Inc. (Intel)",
        webgl_renderer: "ANGLE (Intel, Mesa Intel(R) UHD Graphics (CML GT2), OpenGL 4.6)",
        sec_ch_ua: "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"132\", \"Google Chrome\";v=\"132\"",
        sec_ch_ua_platform: "\"Linux\"",
    },
    StealthProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36",
        viewport: Viewport { width: 2560, height: 1440 },
        locale: "en-US",
        timezone: "America/Chicago",
        platform: "Win32",
        mobile: false,
        touch: false,
        device_scale_factor: 1.0,
        hardware_concurrency: 16,
        device_memory_gb: 16,
        webgl_vendor: "Google Inc. (NVIDIA)",
        webgl_renderer: "ANGLE (NVIDIA, NVIDIA GeForce RTX 3070 Direct3D11 vs_5_0 ps_5_0)",
        sec_ch_ua: "\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"132\", \"Google Chrome\";v=\"132\"",
        sec_ch_ua_platform: "\"Windows\"",
    },
];

/// Pick one profile uniformly at random from the fixed pool.
#[must_use]
pub fn random_profile() -> &'static StealthProfile {
    // `PROFILE_POOL` is non-empty by construction, so `choose` cannot fail.
    PROFILE_POOL
        .choose(&mut rand::rng())
        .expect("profile pool is non-empty")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_profile_is_internally_consistent() {
        for profile in PROFILE_POOL {
            if profile.platform == "MacIntel" {
                assert!(profile.user_agent.contains("Macintosh"));
                assert_eq!(profile.sec_ch_ua_platform, "\"macOS\"");
            }
            if profile.platform == "Win32" {
                assert!(profile.user_agent.contains("Windows"));
                assert_eq!(profile.sec_ch_ua_platform, "\"Windows\"");
            }
            if profile.platform.starts_with("Linux") {
                assert!(profile.user_agent.contains("Linux"));
                assert_eq!(profile.sec_ch_ua_platform, "\"Linux\"");
            }
            assert!((4..=16).contains(&profile.hardware_concurrency));
            assert!(matches!(profile.device_memory_gb, 4 | 8 | 16));
        }
    }

    #[test]
    fn random_profile_always_returns_a_pool_member() {
        for _ in 0..20 {
            let profile = random_profile();
            assert!(PROFILE_POOL.iter().any(|p| p.user_agent == profile.user_agent));
        }
    }
}
