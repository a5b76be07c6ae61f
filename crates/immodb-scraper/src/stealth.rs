//! Fingerprint shaping for automated Chromium sessions.
//!
//! Italian portals run client-side automation checks. These constants mirror
//! the fingerprint of a desktop Chrome session located in Italy: launch
//! flags that disable the automation banner machinery, a script evaluated on
//! every new document that masks the common automation probes, and a header
//! set matching what the claimed browser would send.

use serde_json::json;

/// Chromium launch flags applied to every browser instance.
pub const LAUNCH_ARGS: [&str; 6] = [
    "--disable-blink-features=AutomationControlled",
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-web-security",
    "--disable-features=IsolateOrigins,site-per-process",
    "--disable-site-isolation-trials",
];

/// Evaluated on every new document before any page script runs.
///
/// Masks the probes portals check first: `navigator.webdriver`, a missing
/// `window.chrome`, an empty plugin list, a bare language list, and the
/// notification-permission quirk of headless Chrome.
pub const MASKING_SCRIPT: &str = r"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
window.chrome = window.chrome || { runtime: {} };
Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3, 4, 5] });
Object.defineProperty(navigator, 'languages', { get: () => ['it-IT', 'it', 'en-US', 'en'] });
const originalQuery = window.navigator.permissions.query;
window.navigator.permissions.query = (parameters) =>
  parameters.name === 'notifications'
    ? Promise.resolve({ state: Notification.permission })
    : originalQuery(parameters);
";

/// Locale claimed by every page.
pub const LOCALE: &str = "it-IT";

/// Timezone override applied to every page.
pub const TIMEZONE: &str = "Europe/Rome";

/// Default viewport when no stored session dictates one.
pub const VIEWPORT_WIDTH: i64 = 1920;

/// Default viewport when no stored session dictates one.
pub const VIEWPORT_HEIGHT: i64 = 1080;

/// Header set matching the claimed desktop Chrome profile.
#[must_use]
pub fn extra_headers() -> serde_json::Value {
    json!({
        "Accept": "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        "Accept-Language": "it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7",
        "Accept-Encoding": "gzip, deflate, br",
        "DNT": "1",
        "Connection": "keep-alive",
        "Upgrade-Insecure-Requests": "1",
    })
}
