#[cfg(test)]
#[path = "scroll_test.rs"]
mod tests;

use ratatui::widgets::ScrollbarState;

const PAGE_LENGTH: u16 = 10;

/// Vertical position in the chat. While pinned to the bottom, new lines keep
/// the latest message in view; scrolling up unpins it until the bottom is
/// reached again.
#[derive(Default)]
pub struct Scroll {
    list_length: u16,
    viewport_length: u16,
    pinned: bool,
    pub position: u16,
    pub scrollbar_state: ScrollbarState,
}

impl Scroll {
    fn max_position(&self) -> u16 {
        return self.list_length.saturating_sub(self.viewport_length);
    }

    fn sync_scrollbar(&mut self) {
        self.scrollbar_state = self.scrollbar_state.position(self.position);
    }

    pub fn is_pinned(&self) -> bool {
        return self.pinned;
    }

    pub fn up(&mut self) {
        self.position = self.position.saturating_sub(1);
        self.pinned = false;
        self.sync_scrollbar();
    }

    pub fn up_page(&mut self) {
        for _ in 0..PAGE_LENGTH {
            self.up();
        }
    }

    pub fn down(&mut self) {
        self.position = self.position.saturating_add(1).min(self.max_position());
        self.pinned = self.position == self.max_position();
        self.sync_scrollbar();
    }

    pub fn down_page(&mut self) {
        for _ in 0..PAGE_LENGTH {
            self.down();
        }
    }

    pub fn last(&mut self) {
        self.position = self.max_position();
        self.pinned = true;
        self.sync_scrollbar();
    }

    pub fn set_state(&mut self, list_length: u16, viewport_length: u16) {
        self.list_length = list_length;
        self.viewport_length = viewport_length;
        self.scrollbar_state = self
            .scrollbar_state
            .content_length(list_length)
            .viewport_content_length(viewport_length);

        if self.pinned || self.position > self.max_position() {
            self.last();
        }
    }
}
