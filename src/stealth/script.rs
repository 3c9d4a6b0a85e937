//! The DOM-patching script (C6) injected before any page script runs.
//!
//! Kept as a JavaScript text template per spec §9's design note — this is
//! the one place where the core legitimately emits another language, since
//! the patch must execute inside the browser's JS engine. Parameterised by
//! the chosen `StealthProfile` via a small config object, the way the
//! teacher's `kromekover::inject` parameterises via `window.grokConfig`.

use super::profile::StealthProfile;

/// Build the pre-navigation script for `profile`, keyed by `session_seed_hex`
/// so canvas-adjacent noise (not implemented here, but left as a stable
/// per-session value for any downstream evasion) is consistent across calls
/// within one page context.
#[must_use]
pub fn build_script(profile: &StealthProfile, session_seed_hex: &str) -> String {
    let languages_json = serde_json::to_string(&locale_language_list(profile.locale))
        .unwrap_or_else(|_| "[\"en-US\",\"en\"]".to_string());

    format!(
        r#"
(function() {{
    window.__stealthConfig = {{
        platform: "{platform}",
        languages: {languages_json},
        hardwareConcurrency: {hardware_concurrency},
        deviceMemory: {device_memory_gb},
        webglVendor: "{webgl_vendor}",
        webglRenderer: "{webgl_renderer}",
        sessionSeed: "{session_seed_hex}"
    }};

    function safeDefine(obj, prop, getter) {{
        try {{
            var desc = Object.getOwnPropertyDescriptor(obj, prop);
            if (desc && desc.configurable === false) return;
            Object.defineProperty(obj, prop, {{ get: getter, configurable: true }});
        }} catch (e) {{ /* ignore, patch is best-effort */ }}
    }}

    // navigator.webdriver -> undefined
    safeDefine(Navigator.prototype, 'webdriver', function() {{ return undefined; }});

    // navigator.platform matches the profile
    safeDefine(Navigator.prototype, 'platform', function() {{ return window.__stealthConfig.platform; }});

    // navigator.hardwareConcurrency in [4, 16]
    safeDefine(Navigator.prototype, 'hardwareConcurrency', function() {{ return window.__stealthConfig.hardwareConcurrency; }});

    // navigator.deviceMemory in {{4, 8, 16}}
    safeDefine(Navigator.prototype, 'deviceMemory', function() {{ return window.__stealthConfig.deviceMemory; }});

    // navigator.languages reflects the profile locale
    safeDefine(Navigator.prototype, 'languages', function() {{ return window.__stealthConfig.languages; }});

    // A plausible window.chrome object, installed only if missing.
    if (!window.chrome) {{
        window.chrome = {{
            runtime: {{
                connect: function() {{
                    return {{
                        onMessage: {{ addListener: function() {{}}, removeListener: function() {{}} }},
                        postMessage: function() {{}}
                    }};
                }},
                sendMessage: function() {{}}
            }},
            loadTimes: function() {{ return {{}}; }},
            csi: function() {{ return {{}}; }}
        }};
    }}

    // navigator.plugins / navigator.mimeTypes: non-empty, iterable shims.
    try {{
        var pluginData = [
            {{ name: 'PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' }},
            {{ name: 'Chrome PDF Viewer', filename: 'internal-pdf-viewer', description: 'Portable Document Format' }},
            {{ name: 'Native Client', filename: 'internal-nacl-plugin', description: '' }}
        ];
        var mimeTypeData = [
            {{ type: 'application/pdf', description: 'Portable Document Format', suffixes: 'pdf' }}
        ];

        function makeArrayLike(items) {{
            var arr = items.slice();
            arr.item = function(i) {{ return arr[i] || null; }};
            arr.namedItem = function(name) {{
                for (var i = 0; i < arr.length; i++) {{
                    if (arr[i] && arr[i].name === name) return arr[i];
                }}
                return null;
            }};
            return arr;
        }}

        safeDefine(Navigator.prototype, 'plugins', function() {{ return makeArrayLike(pluginData); }});
        safeDefine(Navigator.prototype, 'mimeTypes', function() {{ return makeArrayLike(mimeTypeData); }});
    }} catch (e) {{ /* ignore */ }}

    // WebGL getParameter(37445|37446) -> vendor/renderer from the profile.
    try {{
        var patchGl = function(proto) {{
            if (!proto || !proto.getParameter) return;
            var original = proto.getParameter;
            proto.getParameter = function(param) {{
                if (param === 37445) return window.__stealthConfig.webglVendor;
                if (param === 37446) return window.__stealthConfig.webglRenderer;
                return original.apply(this, arguments);
            }};
        }};
        if (window.WebGLRenderingContext) patchGl(WebGLRenderingContext.prototype);
        if (window.WebGL2RenderingContext) patchGl(WebGL2RenderingContext.prototype);
    }} catch (e) {{ /* ignore */ }}

    // navigator.permissions.query({{name:'notifications'}}) mirrors
    // Notification.permission instead of prompting.
    try {{
        if (window.navigator.permissions && window.navigator.permissions.query) {{
            var originalQuery = window.navigator.permissions.query.bind(window.navigator.permissions);
            window.navigator.permissions.query = function(params) {{
                if (params && params.name === 'notifications') {{
                    return Promise.resolve({{ state: window.Notification ? Notification.permission : 'default' }});
                }}
                return originalQuery(params);
            }};
        }}
    }} catch (e) {{ /* ignore */ }}

    // iframe.contentWindow inherits the fake window.chrome.
    try {{
        var attachToFrame = function(frame) {{
            try {{
                if (frame.contentWindow && !frame.contentWindow.chrome) {{
                    frame.contentWindow.chrome = window.chrome;
                }}
            }} catch (e) {{ /* cross-origin, ignore */ }}
        }};
        var origCreateElement = document.createElement.bind(document);
        document.createElement = function(tagName) {{
            var el = origCreateElement(tagName);
            if (String(tagName).toLowerCase() === 'iframe') {{
                el.addEventListener('load', function() {{ attachToFrame(el); }});
            }}
            return el;
        }};
        document.querySelectorAll('iframe').forEach(attachToFrame);
    }} catch (e) {{ /* ignore */ }}
}})();
"#,
        platform = profile.platform,
        languages_json = languages_json,
        hardware_concurrency = profile.hardware_concurrency,
        device_memory_gb = profile.device_memory_gb,
        webgl_vendor = profile.webgl_vendor,
        webgl_renderer = profile.webgl_renderer,
        session_seed_hex = session_seed_hex,
    )
}

fn locale_language_list(locale: &str) -> Vec<String> {
    let base = locale.split('-').next().unwrap_or(locale).to_string();
    if base == locale {
        vec![locale.to_string()]
    } else {
        vec![locale.to_string(), base]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stealth::profile::random_profile;

    #[test]
    fn script_contains_every_required_patch() {
        let profile = random_profile();
        let script = build_script(profile, "deadbeef");
        for needle in [
            "webdriver",
            "hardwareConcurrency",
            "deviceMemory",
            "navigator.languages",
            "window.chrome",
            "plugins",
            "mimeTypes",
            "getParameter",
            "permissions.query",
            "contentWindow",
        ] {
            assert!(script.contains(needle), "script missing `{needle}`");
        }
    }

    #[test]
    fn script_is_valid_utf8_and_non_empty() {
        let profile = random_profile();
        let script = build_script(profile, "abc123");
        assert!(!script.is_empty());
    }

    #[test]
    fn locale_language_list_splits_region() {
        assert_eq!(locale_language_list("en-US"), vec!["en-US", "en"]);
        assert_eq!(locale_language_list("fr"), vec!["fr"]);
    }
}
