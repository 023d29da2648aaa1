use shared::domain::Category;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewKey {
    Digit(u8),
    Left,
    Right,
}

impl ReviewKey {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "left" | "arrowleft" | "p" | "prev" => Some(ReviewKey::Left),
            "right" | "arrowright" | "n" | "next" => Some(ReviewKey::Right),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c.to_digit(10).map(|d| ReviewKey::Digit(d as u8)),
                    _ => None,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Categorize(Category),
    Previous,
    Next,
}

/// Maps a key to its action; digits past the category list are unbound.
pub fn action_for_key(key: ReviewKey) -> Option<ReviewAction> {
    match key {
        ReviewKey::Left => Some(ReviewAction::Previous),
        ReviewKey::Right => Some(ReviewAction::Next),
        ReviewKey::Digit(0) => None,
        ReviewKey::Digit(digit) => {
            Category::from_position(usize::from(digit) - 1).map(ReviewAction::Categorize)
        }
    }
}
