use std::path::PathBuf;
use std::sync::Arc;

use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use nutrition_core::provider::UnavailableProvider;
use nutrition_core::config::env_var;
use nutrition_core::{build_provider_with, ChatSession, Config, ProviderKind, ResponseProvider};

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,

    // Conversation
    pub session: ChatSession,

    // Input box
    pub input: String,
    pub input_cursor: usize, // cursor position in chars

    // Chat view. Scroll values are in wrapped lines and are refreshed during render.
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_total_lines: u16,
    pub follow_latest: bool,
    pub chat_area: Option<Rect>,

    // Typing indicator
    pub animation_frame: u8,

    // Provider picker
    pub config: Config,
    /// Where the picked provider is saved; None disables saving
    pub config_path: Option<PathBuf>,
    pub env_lookup: fn(&str) -> Option<String>,
    pub current_provider: ProviderKind,
    pub show_provider_picker: bool,
    pub provider_picker_state: ListState,
}

impl App {
    pub fn new(config: Config, current_provider: ProviderKind, provider: Arc<dyn ResponseProvider>) -> Self {
        let session = ChatSession::new(provider, config.response_timeout());

        Self {
            should_quit: false,
            session,
            input: String::new(),
            input_cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_total_lines: 0,
            follow_latest: true,
            chat_area: None,
            animation_frame: 0,
            config,
            config_path: None,
            env_lookup: env_var,
            current_provider,
            show_provider_picker: false,
            provider_picker_state: ListState::default(),
        }
    }

    /// Submission is disabled while a reply is pending or the input is blank.
    pub fn can_submit(&self) -> bool {
        !self.session.is_pending() && !self.input.trim().is_empty()
    }

    pub fn submit_input(&mut self) -> bool {
        if !self.can_submit() {
            return false;
        }
        if !self.session.submit(&self.input) {
            return false;
        }
        self.input.clear();
        self.input_cursor = 0;
        // New user message and typing indicator: jump to the bottom
        self.follow_latest = true;
        true
    }

    /// Called on every tick: settle a finished reply and advance the animation.
    pub async fn tick(&mut self) {
        if self.session.poll().await {
            self.follow_latest = true;
        }
        if self.session.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        } else {
            self.animation_frame = 0;
        }
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn delete_char_before_cursor(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete_char_at_cursor(&mut self) {
        if self.input_cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.input.chars().count();
    }

    // Chat scrolling
    fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_latest = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_latest = self.chat_scroll >= self.max_scroll();
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }

    // Provider picker
    pub fn open_provider_picker(&mut self) {
        let current = ProviderKind::all()
            .iter()
            .position(|kind| *kind == self.current_provider);
        self.provider_picker_state.select(current.or(Some(0)));
        self.show_provider_picker = true;
    }

    pub fn provider_picker_nav_down(&mut self) {
        let len = ProviderKind::all().len();
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn provider_picker_nav_up(&mut self) {
        let i = self.provider_picker_state.selected().unwrap_or(0);
        self.provider_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Switch to the highlighted provider and remember it in the config file.
    pub fn select_provider(&mut self) {
        let Some(kind) = self
            .provider_picker_state
            .selected()
            .and_then(|i| ProviderKind::all().get(i).copied())
        else {
            return;
        };
        self.show_provider_picker = false;
        if kind == self.current_provider {
            return;
        }

        // The stored model was for the previous provider
        self.config.default_model = None;
        self.config.provider = Some(kind.as_str().to_string());

        let provider: Arc<dyn ResponseProvider> =
            match build_provider_with(&self.config, kind, self.env_lookup) {
                Ok(provider) => provider,
                Err(err) => {
                    tracing::warn!(provider = %kind, error = %err, "provider unavailable");
                    Arc::new(UnavailableProvider::new(kind, err.to_string()))
                }
            };
        self.session.set_provider(provider);
        self.current_provider = kind;

        if let Some(path) = &self.config_path {
            if let Err(err) = Config::save_provider_to(path, kind) {
                tracing::warn!(error = %err, "could not save provider choice");
            }
        }
    }
}
