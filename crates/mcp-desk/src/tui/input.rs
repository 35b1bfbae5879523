//! Input handling for the console.
//!
//! `cursor_pos` counts characters, not bytes.

use super::app::App;
use super::commands::is_command;

impl App {
    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn input_chars(&self) -> usize {
        self.input.chars().count()
    }

    /// Handle character input.
    pub fn enter_char(&mut self, c: char) {
        let idx = self.byte_index();
        self.input.insert(idx, c);
        self.cursor_pos += 1;
    }

    /// Delete character before cursor.
    pub fn delete_char(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let idx = self.byte_index();
            self.input.remove(idx);
        }
    }

    /// Move cursor left.
    pub fn move_cursor_left(&mut self) {
        self.cursor_pos = self.cursor_pos.saturating_sub(1);
    }

    /// Move cursor right.
    pub fn move_cursor_right(&mut self) {
        if self.cursor_pos < self.input_chars() {
            self.cursor_pos += 1;
        }
    }

    pub fn move_cursor_home(&mut self) {
        self.cursor_pos = 0;
    }

    pub fn move_cursor_end(&mut self) {
        self.cursor_pos = self.input_chars();
    }

    /// Clear the input.
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_pos = 0;
    }

    /// Submit the current input.
    ///
    /// `/name` runs a console command when `name` is one; `//` sends the rest
    /// as a prompt starting with `/`. Everything else is a prompt.
    pub fn submit(&mut self) {
        let input = std::mem::take(&mut self.input);
        self.cursor_pos = 0;
        let trimmed = input.trim();

        if let Some(rest) = trimmed.strip_prefix("//") {
            self.run_prompt(&format!("/{}", rest));
        } else if let Some(cmd) = trimmed.strip_prefix('/').filter(|c| is_command(c)) {
            self.handle_command(cmd);
        } else {
            self.run_prompt(&input);
        }
    }
}
