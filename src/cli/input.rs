/// Single-line text input with a cursor.
#[derive(Default, Clone)]
pub struct LineEdit {
    pub value: String,
    pub cursor: usize,
}

impl LineEdit {
    pub fn push(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some(ch) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= ch.len_utf8();
            self.value.remove(self.cursor);
        }
    }

    pub fn left(&mut self) {
        if let Some(ch) = self.value[..self.cursor].chars().next_back() {
            self.cursor -= ch.len_utf8();
        }
    }

    pub fn right(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_at_the_cursor() {
        let mut e = LineEdit::default();
        for ch in "ana@x.io".chars() {
            e.push(ch);
        }
        e.left();
        e.left();
        e.backspace();
        assert_eq!(e.value, "ana@xio");
        e.right();
        e.push('!');
        assert_eq!(e.value, "ana@xi!o");
        e.clear();
        assert!(e.value.is_empty());
        e.backspace();
        assert_eq!(e.cursor, 0);
    }
}
