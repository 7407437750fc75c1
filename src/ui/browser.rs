use crate::sync::Navigator;
use crate::util::resolve_action_url;
use url::Url;

type Opener = fn(&str) -> std::io::Result<()>;

fn open_in_browser(url: &str) -> std::io::Result<()> {
    open::that(url)
}

/// Navigates by opening the notification's link in the system browser.
///
/// Relative `actionUrl`s resolve against the site root. Targets that fail
/// validation are logged and dropped.
pub struct BrowserNavigator {
    site_root: Option<Url>,
    opener: Opener,
}

impl BrowserNavigator {
    pub fn new(site_root: Option<Url>) -> Self {
        Self::with_opener(site_root, open_in_browser)
    }

    fn with_opener(site_root: Option<Url>, opener: Opener) -> Self {
        Self { site_root, opener }
    }
}

impl Navigator for BrowserNavigator {
    fn navigate(&mut self, target: &str) {
        let url = match resolve_action_url(target, self.site_root.as_ref()) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(action_url = target, error = %e, "Refusing to open notification link");
                return;
            }
        };
        if let Err(e) = (self.opener)(url.as_str()) {
            tracing::warn!(url = %url, error = %e, "Failed to open browser");
        }
    }
}
