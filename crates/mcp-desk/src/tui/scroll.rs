//! Scrolling for the focused surface. Offsets count lines from the bottom.

use super::app::{App, Surface};

impl App {
    fn focused_scroll(&mut self) -> (&mut usize, usize) {
        match self.focus {
            Surface::Chat => (&mut self.chat_scroll, self.chat.len()),
            Surface::Tools => (&mut self.tools_scroll, self.tools.len()),
        }
    }

    /// Switch which surface receives scroll keys.
    pub fn toggle_focus(&mut self) {
        self.focus = self.focus.toggled();
    }

    /// Scroll up by one line.
    pub fn scroll_up(&mut self) {
        let (offset, len) = self.focused_scroll();
        if *offset < len.saturating_sub(1) {
            *offset += 1;
        }
    }

    /// Scroll down by one line.
    pub fn scroll_down(&mut self) {
        let (offset, _) = self.focused_scroll();
        *offset = offset.saturating_sub(1);
    }

    /// Scroll up by a page.
    pub fn scroll_page_up(&mut self, page_size: usize) {
        let (offset, len) = self.focused_scroll();
        *offset = offset.saturating_add(page_size).min(len.saturating_sub(1));
    }

    /// Scroll down by a page.
    pub fn scroll_page_down(&mut self, page_size: usize) {
        let (offset, _) = self.focused_scroll();
        *offset = offset.saturating_sub(page_size);
    }
}
