/// Typewriter reveal of turn text.

/// Reveals text one unit at a time. A unit is a single character, or a
/// whole `<...>` markup tag so a tag is never shown half-written.
#[derive(Debug, Clone)]
pub struct TextReveal {
    text: String,
    /// Byte offset just past each unit.
    ends: Vec<usize>,
    shown: usize,
    ticks_per_unit: u32,
    timer: u32,
}

impl TextReveal {
    pub fn new(text: &str, ticks_per_unit: u32) -> Self {
        Self {
            ends: unit_ends(text),
            text: text.to_string(),
            shown: 0,
            ticks_per_unit: ticks_per_unit.max(1),
            timer: 0,
        }
    }

    /// Advance one tick. Returns the visible character count when it grew.
    pub fn tick(&mut self) -> Option<usize> {
        if self.is_complete() {
            return None;
        }
        self.timer += 1;
        if self.timer < self.ticks_per_unit {
            return None;
        }
        self.timer = 0;
        self.shown += 1;
        Some(self.visible_chars())
    }

    /// Show everything at once.
    pub fn complete(&mut self) {
        self.shown = self.ends.len();
        self.timer = 0;
    }

    pub fn is_complete(&self) -> bool {
        self.shown >= self.ends.len()
    }

    pub fn visible_text(&self) -> &str {
        match self.shown {
            0 => "",
            n => &self.text[..self.ends[n - 1]],
        }
    }

    pub fn visible_chars(&self) -> usize {
        self.visible_text().chars().count()
    }

    pub fn full_text(&self) -> &str {
        &self.text
    }

    pub fn total_units(&self) -> usize {
        self.ends.len()
    }
}

fn unit_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        let mut end = start + c.len_utf8();
        if c == '<' {
            if let Some(close) = text[start..].find('>') {
                end = start + close + 1;
                while chars.peek().is_some_and(|(i, _)| *i < end) {
                    chars.next();
                }
            }
        }
        ends.push(end);
    }
    ends
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_to_end(reveal: &mut TextReveal) -> Vec<String> {
        let mut frames = Vec::new();
        for _ in 0..10_000 {
            if reveal.tick().is_some() {
                frames.push(reveal.visible_text().to_string());
            }
            if reveal.is_complete() {
                break;
            }
        }
        frames
    }

    #[test]
    fn one_unit_every_other_tick() {
        let mut r = TextReveal::new("abc", 2);
        assert_eq!(r.tick(), None);
        assert_eq!(r.tick(), Some(1));
        assert_eq!(r.visible_text(), "a");
        r.tick();
        r.tick();
        r.tick();
        assert_eq!(r.tick(), Some(3));
        assert!(r.is_complete());
        assert_eq!(r.tick(), None);
    }

    #[test]
    fn markup_is_atomic() {
        let mut r = TextReveal::new("ok<alert>no</alert>!", 1);
        assert_eq!(r.total_units(), 2 + 1 + 2 + 1 + 1);
        let frames = run_to_end(&mut r);
        for frame in &frames {
            let opens = frame.matches('<').count();
            let closes = frame.matches('>').count();
            assert_eq!(opens, closes, "split tag in {:?}", frame);
        }
        assert_eq!(frames[2], "ok<alert>");
        assert_eq!(r.visible_text(), "ok<alert>no</alert>!");
    }

    #[test]
    fn unclosed_angle_is_a_plain_char() {
        let r = TextReveal::new("a < b", 1);
        assert_eq!(r.total_units(), 5);
    }

    #[test]
    fn multibyte_text_reveals_by_char() {
        let mut r = TextReveal::new("héllo…", 1);
        assert_eq!(r.total_units(), 6);
        r.tick();
        r.tick();
        assert_eq!(r.visible_text(), "hé");
        assert_eq!(r.visible_chars(), 2);
    }

    #[test]
    fn complete_shows_everything() {
        let mut r = TextReveal::new("[Clerk] Next.", 2);
        r.tick();
        r.complete();
        assert!(r.is_complete());
        assert_eq!(r.visible_text(), r.full_text());
    }

    #[test]
    fn empty_text_is_already_complete() {
        let mut r = TextReveal::new("", 2);
        assert!(r.is_complete());
        assert_eq!(r.tick(), None);
        assert_eq!(r.visible_text(), "");
    }
}
