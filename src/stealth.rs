//! Fingerprint masking injected into every page.
//!
//! Best effort only: nothing downstream depends on it succeeding.

/// Which parts of the automation fingerprint to mask
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub spoof_webgl: bool,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
    pub spoof_navigator: bool,
    pub languages: Vec<String>,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            spoof_webgl: true,
            webgl_vendor: "Intel Inc.".to_string(),
            webgl_renderer: "Intel Iris OpenGL Engine".to_string(),
            spoof_navigator: true,
            languages: vec!["en-US".to_string(), "en".to_string()],
        }
    }
}

/// Build the masking script for the given configuration
pub fn fingerprint_script(config: &FingerprintConfig) -> String {
    let mut scripts = Vec::new();

    if config.spoof_webgl {
        // 37445 / 37446 are UNMASKED_VENDOR_WEBGL / UNMASKED_RENDERER_WEBGL
        scripts.push(format!(
            r#"
            (function() {{
                const patch = function(proto) {{
                    if (!proto || proto.__maskedParameter) return;
                    const getParameter = proto.getParameter;
                    proto.getParameter = function(parameter) {{
                        if (parameter === 37445) return {vendor};
                        if (parameter === 37446) return {renderer};
                        return getParameter.call(this, parameter);
                    }};
                    proto.__maskedParameter = true;
                }};
                if (window.WebGLRenderingContext) patch(WebGLRenderingContext.prototype);
                if (window.WebGL2RenderingContext) patch(WebGL2RenderingContext.prototype);
            }})();
            "#,
            vendor = js_string(&config.webgl_vendor),
            renderer = js_string(&config.webgl_renderer),
        ));
    }

    if config.spoof_navigator {
        let languages = config
            .languages
            .iter()
            .map(|l| js_string(l))
            .collect::<Vec<_>>()
            .join(", ");
        scripts.push(format!(
            r#"
            Object.defineProperty(navigator, 'webdriver', {{ get: () => undefined }});
            Object.defineProperty(navigator, 'plugins', {{ get: () => [1, 2, 3, 4, 5] }});
            Object.defineProperty(navigator, 'languages', {{ get: () => [{languages}] }});
            window.chrome = window.chrome || {{ runtime: {{}} }};
            "#,
        ));
    }

    scripts.join("\n")
}

/// Quote a value as a JavaScript string literal
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
