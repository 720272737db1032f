#[cfg(test)]
#[path = "bubble_test.rs"]
mod tests;

use std::mem;

use ratatui::style::Color;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;

use crate::domain::models::Author;
use crate::domain::models::Message;
use crate::domain::models::MessageType;

// "│ " + " │"
const BORDER_ELEMENTS_LENGTH: usize = 4;
const SCROLLBAR_WIDTH: usize = 1;
const OUTER_PADDING_PERCENTAGE: f32 = 0.04;

pub const SYSTEM_COLOR: Color = Color::Rgb(138, 85, 63);
pub const CODE_COLOR: Color = Color::Rgb(152, 195, 121);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BubbleAlignment {
    Left,
    Center,
    Right,
}

impl BubbleAlignment {
    pub fn for_author(author: Author) -> BubbleAlignment {
        return match author {
            Author::User => BubbleAlignment::Right,
            Author::System => BubbleAlignment::Center,
            Author::Assistant => BubbleAlignment::Left,
        };
    }
}

/// A single message drawn as a bordered box titled with its sender.
pub struct Bubble<'a> {
    alignment: BubbleAlignment,
    message: &'a Message,
    window_max_width: usize,
}

fn char_len(text: &str) -> usize {
    return text.chars().count();
}

/// Greedy word wrap. Words longer than `width` are split across lines and
/// leading indentation is kept.
fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut res: Vec<String> = vec![];
    let mut current = "".to_string();
    let mut open = false;

    for word in line.split(' ') {
        let mut word = word.to_string();
        loop {
            let needed = if open {
                char_len(&current) + 1 + char_len(&word)
            } else {
                char_len(&word)
            };

            if needed <= width {
                if open {
                    current.push(' ');
                }
                current.push_str(&word);
                open = true;
                break;
            }

            if open {
                res.push(mem::take(&mut current));
                open = false;
                continue;
            }

            let head: String = word.chars().take(width).collect();
            word = word.chars().skip(width).collect();
            res.push(head);
            if word.is_empty() {
                break;
            }
        }
    }

    if open || res.is_empty() {
        res.push(current);
    }

    return res;
}

impl<'a> Bubble<'a> {
    pub fn new(
        message: &'a Message,
        alignment: BubbleAlignment,
        window_max_width: usize,
    ) -> Bubble<'a> {
        return Bubble {
            alignment,
            message,
            window_max_width,
        };
    }

    fn max_text_width(&self) -> usize {
        let min_outer_padding =
            (self.window_max_width as f32 * OUTER_PADDING_PERCENTAGE).ceil() as usize;

        return self
            .window_max_width
            .saturating_sub(BORDER_ELEMENTS_LENGTH + min_outer_padding + SCROLLBAR_WIDTH)
            .max(1);
    }

    pub fn as_lines(&self) -> Vec<Line<'a>> {
        let max_text_width = self.max_text_width();
        let fenced = self.message.fenced_lines();

        let mut rows: Vec<(String, bool)> = self
            .message
            .text
            .lines()
            .zip(fenced)
            .flat_map(|(line, in_codeblock)| {
                return wrap(line, max_text_width)
                    .into_iter()
                    .map(move |segment| return (segment, in_codeblock));
            })
            .collect();

        if rows.is_empty() {
            rows.push(("".to_string(), false));
        }

        let label = self.message.label().to_string();
        let inner_width = rows
            .iter()
            .map(|(text, _)| return char_len(text))
            .max()
            .unwrap_or_default()
            .max(char_len(&label));

        let bar_length = inner_width + 2;
        let top_bar = format!(
            "╭{label}{}╮",
            "─".repeat(bar_length.saturating_sub(char_len(&label)))
        );
        let bottom_bar = format!("╰{}╯", "─".repeat(bar_length));

        let mut lines = vec![self.pad(vec![self.border_span(top_bar)], inner_width)];
        for (text, in_codeblock) in rows {
            let fill = " ".repeat(inner_width - char_len(&text));
            lines.push(self.pad(
                vec![
                    self.border_span("│ ".to_string()),
                    self.text_span(text, in_codeblock),
                    self.border_span(format!("{fill} │")),
                ],
                inner_width,
            ));
        }
        lines.push(self.pad(vec![self.border_span(bottom_bar)], inner_width));

        return lines;
    }

    fn pad(&self, spans: Vec<Span<'a>>, inner_width: usize) -> Line<'a> {
        let outer = self
            .window_max_width
            .saturating_sub(inner_width + BORDER_ELEMENTS_LENGTH + SCROLLBAR_WIDTH);

        let (left, right) = match self.alignment {
            BubbleAlignment::Left => (0, outer),
            BubbleAlignment::Center => (outer / 2, outer - outer / 2),
            BubbleAlignment::Right => (outer, 0),
        };

        let mut res = vec![];
        if left > 0 {
            res.push(Span::from(" ".repeat(left)));
        }
        res.extend(spans);
        if right > 0 {
            res.push(Span::from(" ".repeat(right)));
        }

        return Line::from(res);
    }

    fn border_style(&self) -> Style {
        if self.message.message_type() == MessageType::Error {
            return Style::default().fg(Color::Red);
        }

        if self.message.author == Author::System {
            return Style::default().fg(SYSTEM_COLOR);
        }

        return Style::default();
    }

    fn border_span(&self, text: String) -> Span<'a> {
        return Span::styled(text, self.border_style());
    }

    fn text_span(&self, text: String, in_codeblock: bool) -> Span<'a> {
        if self.message.message_type() == MessageType::Error {
            return Span::styled(text, Style::default().fg(Color::Red));
        }

        if in_codeblock {
            return Span::styled(text, Style::default().fg(CODE_COLOR));
        }

        return Span::from(text);
    }
}
