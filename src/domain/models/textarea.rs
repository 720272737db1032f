use ratatui::widgets::Block;
use ratatui::widgets::BorderType;
use ratatui::widgets::Borders;
use ratatui::widgets::Padding;

pub struct TextArea {}

impl<'a> TextArea {
    pub fn default() -> tui_textarea::TextArea<'a> {
        let mut textarea = tui_textarea::TextArea::default();
        textarea.set_block(TextArea::block(0));

        return textarea;
    }

    /// Input border, titled with the number of sessions still running.
    pub fn block(running_sessions: usize) -> Block<'a> {
        let title = match running_sessions {
            0 => "Describe a program to write and run".to_string(),
            1 => "Describe a program to write and run (1 session running)".to_string(),
            n => format!("Describe a program to write and run ({n} sessions running)"),
        };

        return Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .title(title)
            .padding(Padding::new(1, 1, 0, 0));
    }
}
