//! Location entry of the navigation bar.
//!
//! The bar shows the current location until the user starts editing it. Text
//! arrives from the on-screen keyboard as committed strings, so editing only
//! needs a caret, insertion and backward deletion.
//!
//! ```text
//! Showing ──begin_edit──▶ Selected ──commit_text──▶ Editing
//!    ▲                       │                        │
//!    └──── end_edit/submit ──┴────────────────────────┘
//! ```

use url::Url;

/// Characters that render as nothing and could hide part of an address.
const HIDDEN_CHARS: [char; 8] = [
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{034F}', '\u{2028}', '\u{2029}',
];

/// Text shown for `url` while the bar is not being edited.
///
/// IDN hosts stay in their ASCII form and get a marker, so a homograph
/// cannot pass for the domain it imitates.
fn display_form(url: &Url) -> String {
    let visible: String = url
        .as_str()
        .chars()
        .filter(|c| !HIDDEN_CHARS.contains(c))
        .collect();

    let punycode = url
        .host_str()
        .is_some_and(|host| host.split('.').any(|label| label.starts_with("xn--")));
    if punycode {
        format!("{visible} ⚠ punycode")
    } else {
        visible
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// Displays the location; keys go to the page.
    Showing,
    /// Entry just opened, the whole text is selected.
    Selected,
    Editing,
}

/// Page indicators drawn next to the entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Indicators {
    pub loading: bool,
    pub insecure: bool,
    pub private: bool,
}

#[derive(Debug, Clone)]
pub struct UrlBar {
    text: String,
    /// In characters.
    caret: usize,
    mode: EntryMode,
    location: Option<Url>,
    search_engine_url: String,
    indicators: Indicators,
}

impl UrlBar {
    pub fn new(search_engine_url: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            caret: 0,
            mode: EntryMode::Showing,
            location: None,
            search_engine_url: search_engine_url.into(),
            indicators: Indicators::default(),
        }
    }

    /// Records the page location. The text follows unless an edit is open.
    pub fn show_location(&mut self, url: &Url) {
        self.location = Some(url.clone());
        if self.mode == EntryMode::Showing {
            self.reset_text();
        }
    }

    /// Switches to another page's location, closing any open edit.
    pub fn replace_location(&mut self, url: Option<&Url>) {
        self.location = url.cloned();
        self.mode = EntryMode::Showing;
        self.reset_text();
    }

    pub fn location(&self) -> Option<&Url> {
        self.location.as_ref()
    }

    pub fn indicators(&self) -> Indicators {
        self.indicators
    }

    pub fn indicators_mut(&mut self) -> &mut Indicators {
        &mut self.indicators
    }

    fn reset_text(&mut self) {
        self.text = self.location.as_ref().map(display_form).unwrap_or_default();
        self.caret = self.text.chars().count();
    }

    // ── Editing ────────────────────────────────────────────────────────

    pub fn begin_edit(&mut self) {
        if self.mode == EntryMode::Showing {
            self.mode = EntryMode::Selected;
            self.caret = self.text.chars().count();
        }
    }

    /// Closes the entry without loading; the location comes back.
    pub fn end_edit(&mut self) {
        self.mode = EntryMode::Showing;
        self.reset_text();
    }

    pub fn is_editing(&self) -> bool {
        self.mode != EntryMode::Showing
    }

    pub fn mode(&self) -> EntryMode {
        self.mode
    }

    /// Inserts keyboard text at the caret. A selected entry is replaced.
    pub fn commit_text(&mut self, input: &str) {
        match self.mode {
            EntryMode::Showing => return,
            EntryMode::Selected => self.clear_selection(),
            EntryMode::Editing => {}
        }
        let at = self.byte_offset(self.caret);
        self.text.insert_str(at, input);
        self.caret += input.chars().count();
    }

    /// Deletes the character before the caret, or the selection.
    pub fn delete_backward(&mut self) {
        match self.mode {
            EntryMode::Showing => {}
            EntryMode::Selected => self.clear_selection(),
            EntryMode::Editing if self.caret > 0 => {
                let start = self.byte_offset(self.caret - 1);
                let end = self.byte_offset(self.caret);
                self.text.replace_range(start..end, "");
                self.caret -= 1;
            }
            EntryMode::Editing => {}
        }
    }

    fn clear_selection(&mut self) {
        self.text.clear();
        self.caret = 0;
        self.mode = EntryMode::Editing;
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map_or(self.text.len(), |(offset, _)| offset)
    }

    /// Resolves the entry and closes it. `None` if there is nothing to load.
    pub fn submit(&mut self) -> Option<Url> {
        if !self.is_editing() {
            return None;
        }
        let input = self.text.trim();
        let url = if input.is_empty() {
            None
        } else {
            resolve_input(input, &self.search_engine_url)
        };
        self.mode = EntryMode::Showing;
        if url.is_none() {
            self.reset_text();
        }
        url
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Caret position in characters.
    pub fn caret(&self) -> usize {
        self.caret
    }
}

/// Web URLs load as typed, host-like input gets `https://`, anything else is
/// a search.
fn resolve_input(input: &str, search_engine_url: &str) -> Option<Url> {
    match Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => return Some(url),
        _ => {}
    }

    let host_like = input.contains('.') && !input.chars().any(char::is_whitespace);
    if host_like && let Ok(url) = Url::parse(&format!("https://{input}")) {
        return Some(url);
    }

    let query: String = url::form_urlencoded::byte_serialize(input.as_bytes()).collect();
    Url::parse(&format!("{search_engine_url}{query}")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &str = "https://duckduckgo.com/?q=";

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_punycode_label_is_flagged() {
        let shown = display_form(&url("https://xn--e1afmkfd.xn--80akhbyknj4f/path"));
        assert!(shown.starts_with("https://xn--e1afmkfd.xn--80akhbyknj4f/path"), "{shown}");
        assert!(shown.ends_with("⚠ punycode"), "{shown}");
    }

    #[test]
    fn test_plain_host_shown_as_is() {
        assert_eq!(
            display_form(&url("https://example.org/a?b=c")),
            "https://example.org/a?b=c"
        );
    }

    #[test]
    fn test_location_kept_while_editing() {
        let mut bar = UrlBar::new(SEARCH);
        bar.show_location(&url("https://a.example/"));
        bar.begin_edit();
        bar.commit_text("wiki");
        bar.show_location(&url("https://b.example/"));

        assert_eq!(bar.text(), "wiki");
        assert_eq!(bar.caret(), 4);
        bar.end_edit();
        assert_eq!(bar.text(), "https://b.example/");
        assert_eq!(bar.location(), Some(&url("https://b.example/")));
    }

    #[test]
    fn test_first_input_replaces_selection() {
        let mut bar = UrlBar::new(SEARCH);
        bar.show_location(&url("https://a.example/"));
        bar.begin_edit();
        assert_eq!(bar.mode(), EntryMode::Selected);
        bar.commit_text("x");
        assert_eq!(bar.text(), "x");

        bar.begin_edit();
        bar.commit_text("y");
        assert_eq!(bar.text(), "xy");
    }

    #[test]
    fn test_delete_backward_handles_multibyte() {
        let mut bar = UrlBar::new(SEARCH);
        bar.begin_edit();
        bar.commit_text("café");
        bar.delete_backward();
        assert_eq!(bar.text(), "caf");
        assert_eq!(bar.caret(), 3);

        bar.end_edit();
        bar.begin_edit();
        bar.delete_backward();
        assert_eq!(bar.text(), "");
        assert_eq!(bar.mode(), EntryMode::Editing);
    }

    #[test]
    fn test_input_ignored_when_not_editing() {
        let mut bar = UrlBar::new(SEARCH);
        bar.show_location(&url("https://a.example/"));
        bar.commit_text("zzz");
        bar.delete_backward();
        assert_eq!(bar.text(), "https://a.example/");
        assert_eq!(bar.submit(), None);
    }

    #[test]
    fn test_submit_adds_scheme_and_closes() {
        let mut bar = UrlBar::new(SEARCH);
        bar.begin_edit();
        bar.commit_text("mozilla.org");
        assert_eq!(bar.submit(), Some(url("https://mozilla.org/")));
        assert!(!bar.is_editing());
    }

    #[test]
    fn test_blank_submit_loads_nothing() {
        let mut bar = UrlBar::new(SEARCH);
        bar.show_location(&url("https://a.example/"));
        bar.begin_edit();
        bar.commit_text("   ");
        assert!(bar.submit().is_none());
        assert!(!bar.is_editing());
        assert_eq!(bar.text(), "https://a.example/");
    }

    #[test]
    fn test_replace_location_closes_edit() {
        let mut bar = UrlBar::new(SEARCH);
        bar.show_location(&url("https://a.example/"));
        bar.begin_edit();
        bar.commit_text("draft");

        bar.replace_location(Some(&url("https://b.example/")));
        assert_eq!(bar.mode(), EntryMode::Showing);
        assert_eq!(bar.text(), "https://b.example/");

        bar.replace_location(None);
        assert_eq!(bar.text(), "");
        assert_eq!(bar.location(), None);
    }

    #[test]
    fn test_free_text_becomes_search() {
        let result = resolve_input("hello world", SEARCH).unwrap();
        assert_eq!(result.as_str(), "https://duckduckgo.com/?q=hello+world");

        let custom = resolve_input("rust", "https://search.example/?s=").unwrap();
        assert_eq!(custom.as_str(), "https://search.example/?s=rust");
    }

    #[test]
    fn test_non_web_schemes_are_searched() {
        assert_eq!(resolve_input("http://example.com/a", SEARCH).unwrap().scheme(), "http");
        let searched = resolve_input("javascript:alert(1)", SEARCH).unwrap();
        assert!(searched.as_str().starts_with(SEARCH), "{searched}");
    }

    #[test]
    fn test_indicators() {
        let mut bar = UrlBar::new(SEARCH);
        let indicators = bar.indicators_mut();
        indicators.loading = true;
        indicators.private = true;
        assert_eq!(
            bar.indicators(),
            Indicators {
                loading: true,
                insecure: false,
                private: true
            }
        );
    }
}
