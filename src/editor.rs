/// Single-line text field used for the new-task name and inline renames.
/// The cursor counts characters, not bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineInput {
    content: String,
    cursor: usize,
}

impl LineInput {
    pub fn new(content: &str) -> Self {
        LineInput {
            content: content.to_string(),
            cursor: content.chars().count(),
        }
    }

    pub fn value(&self) -> &str {
        &self.content
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    fn byte_offset(&self, char_index: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_index)
            .map_or(self.content.len(), |(i, _)| i)
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.content.insert(at, c);
        self.cursor += 1;
    }

    /// Backspace.
    pub fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_offset(self.cursor);
        self.content.remove(at);
    }

    pub fn delete_forward(&mut self) {
        if self.cursor < self.content.chars().count() {
            let at = self.byte_offset(self.cursor);
            self.content.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.content.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn move_to_start_of_line(&mut self) {
        self.cursor = 0;
    }

    pub fn move_to_end_of_line(&mut self) {
        self.cursor = self.content.chars().count();
    }

    /// Splits around the cursor for rendering: before, under, after.
    pub fn split_at_cursor(&self) -> (String, String, String) {
        let before: String = self.content.chars().take(self.cursor).collect();
        let under: String = self
            .content
            .chars()
            .nth(self.cursor)
            .map_or_else(|| " ".to_string(), |c| c.to_string());
        let after: String = self.content.chars().skip(self.cursor + 1).collect();
        (before, under, after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_multibyte_text_by_character() {
        let mut input = LineInput::new("Mdia");
        input.move_to_start_of_line();
        input.move_cursor_right();
        input.insert_char('é');
        assert_eq!(input.value(), "Média");
        assert_eq!(input.split_at_cursor().0, "Mé");

        input.delete_char();
        assert_eq!(input.value(), "Mdia");
        input.move_to_end_of_line();
        input.delete_char();
        assert_eq!(input.value(), "Mdi");
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut input = LineInput::default();
        input.delete_char();
        input.move_cursor_left();
        input.delete_forward();
        assert_eq!(input.split_at_cursor().0, "");

        input.insert_char('a');
        input.move_cursor_right();
        assert_eq!(
            input.split_at_cursor(),
            ("a".to_string(), " ".to_string(), String::new())
        );
        input.move_to_start_of_line();
        input.delete_forward();
        assert_eq!(input.value(), "");
    }

    #[test]
    fn split_marks_the_cursor_cell() {
        let mut input = LineInput::new("abc");
        assert_eq!(
            input.split_at_cursor(),
            ("abc".to_string(), " ".to_string(), String::new())
        );
        input.move_cursor_left();
        assert_eq!(
            input.split_at_cursor(),
            ("ab".to_string(), "c".to_string(), String::new())
        );
        input.clear();
        assert_eq!(input.value(), "");
    }
}
