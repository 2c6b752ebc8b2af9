use std::io::Write;

use serde::Serialize;

/// Where user-visible signals end up. The poll loop and the command router
/// only talk to this trait; rendering belongs to the embedding UI.
pub trait NotificationSink: Send + Sync {
    /// Transient popup message
    fn notify(&self, title: &str, text: &str);

    /// Queue-size indicator; `None` and 0 both render blank
    fn set_badge(&self, count: Option<usize>);

    /// Ask the user for a job name before sending a link
    fn prompt_name(&self, link: &str, category: Option<&str>, basename: &str);

    /// The remote category list changed; menus built from it are stale
    fn categories_changed(&self, categories: &[String]);
}

/// Badge display value: blank for an empty or unknown queue
pub fn badge_text(count: Option<usize>) -> String {
    match count {
        None | Some(0) => String::new(),
        Some(n) => n.to_string(),
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
enum WireEvent<'a> {
    #[serde(rename_all = "camelCase")]
    Notification {
        title: &'a str,
        text: &'a str,
        hide_after_ms: u64,
    },
    Badge {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    NamePrompt {
        link: &'a str,
        category: Option<&'a str>,
        basename: &'a str,
    },
    Categories {
        categories: &'a [String],
    },
}

/// Writes agent events as JSON lines on stdout for the embedding UI.
///
/// `hide_after_ms` tells the UI how long to keep a popup visible; a value of
/// zero suppresses popups entirely. Badge and prompt events are never
/// suppressed.
pub struct StdoutSink {
    hide_after_ms: u64,
}

impl StdoutSink {
    pub fn new(hide_after_ms: u64) -> Self {
        Self { hide_after_ms }
    }

    fn write(&self, event: &WireEvent<'_>) {
        match serde_json::to_string(event) {
            Ok(line) => {
                let mut stdout = std::io::stdout().lock();
                let _ = writeln!(stdout, "{}", line);
            }
            Err(e) => tracing::debug!("could not encode event: {}", e),
        }
    }
}

impl NotificationSink for StdoutSink {
    fn notify(&self, title: &str, text: &str) {
        if self.hide_after_ms == 0 {
            return;
        }
        self.write(&WireEvent::Notification {
            title,
            text,
            hide_after_ms: self.hide_after_ms,
        });
    }

    fn set_badge(&self, count: Option<usize>) {
        self.write(&WireEvent::Badge {
            text: badge_text(count),
        });
    }

    fn prompt_name(&self, link: &str, category: Option<&str>, basename: &str) {
        self.write(&WireEvent::NamePrompt {
            link,
            category,
            basename,
        });
    }

    fn categories_changed(&self, categories: &[String]) {
        self.write(&WireEvent::Categories { categories });
    }
}
